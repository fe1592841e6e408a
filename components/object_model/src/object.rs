//! JavaScript object representation
//!
//! Provides the [`JsObject`] type with shape-based property storage. Objects
//! accumulating too many ad hoc properties switch to a flat dictionary
//! representation instead.

use crate::property::PropertyFlags;
use crate::shape::{ObjectClass, Shape};
use core_types::{ObjectId, PropertyKey, Value};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::sync::Arc;

/// Getter/setter pair of an accessor property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accessor {
    /// Getter function, if any
    pub getter: Option<ObjectId>,
    /// Setter function, if any
    pub setter: Option<ObjectId>,
}

/// Contents of one property storage location.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Data property value
    Data(Value),
    /// Accessor property pair
    Accessor(Accessor),
}

impl Slot {
    /// Returns the value of a data slot.
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Slot::Data(value) => Some(value),
            Slot::Accessor(_) => None,
        }
    }
}

/// Property storage of an object.
#[derive(Debug)]
pub enum ObjectStorage {
    /// Layout described by a shape
    Shaped {
        /// Current shape (may lag behind if the shape became obsolete)
        shape: Arc<Shape>,
        /// Inline slots, indexed by `Location::Inline`
        slots: Vec<Slot>,
        /// Values of properties with `Location::Dynamic`
        dynamic: FxHashMap<PropertyKey, Slot>,
    },
    /// Flat, insertion-ordered map of own properties
    Dictionary {
        /// Prototype object
        prototype: Option<ObjectId>,
        /// Whether new properties may be added
        extensible: bool,
        /// Own properties
        properties: IndexMap<PropertyKey, (PropertyFlags, Slot), FxBuildHasher>,
    },
}

/// Internal slots of exotic objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalSlots {
    /// Ordinary and namespace objects
    None,
    /// Proxy target and handler
    Proxy {
        /// Proxy target
        target: ObjectId,
        /// Proxy handler
        handler: ObjectId,
    },
    /// Adaptee whose trap functions resolve the adapter's properties
    Adapter {
        /// Adaptee object
        adaptee: ObjectId,
    },
}

/// JavaScript object with shape-based property storage
#[derive(Debug)]
pub struct JsObject {
    /// Behavioral class
    pub class: ObjectClass,
    /// Property storage
    pub storage: ObjectStorage,
    /// Internal slots for exotic classes
    pub internal: InternalSlots,
}

impl JsObject {
    /// Creates an object with the given shape and no property values yet.
    pub fn with_shape(shape: Arc<Shape>, internal: InternalSlots) -> Self {
        JsObject {
            class: shape.class(),
            storage: ObjectStorage::Shaped {
                slots: Vec::with_capacity(shape.inline_slot_count() as usize),
                shape,
                dynamic: FxHashMap::default(),
            },
            internal,
        }
    }

    /// Creates an ordinary object in dictionary mode.
    pub fn dictionary(prototype: Option<ObjectId>) -> Self {
        JsObject {
            class: ObjectClass::Ordinary,
            storage: ObjectStorage::Dictionary {
                prototype,
                extensible: true,
                properties: IndexMap::default(),
            },
            internal: InternalSlots::None,
        }
    }

    /// Returns true if the object is in dictionary mode.
    pub fn is_dictionary(&self) -> bool {
        matches!(self.storage, ObjectStorage::Dictionary { .. })
    }

    /// Stored shape; `None` in dictionary mode.
    pub fn stored_shape(&self) -> Option<&Arc<Shape>> {
        match &self.storage {
            ObjectStorage::Shaped { shape, .. } => Some(shape),
            ObjectStorage::Dictionary { .. } => None,
        }
    }
}
