//! Property descriptors.
//!
//! A [`PropertyDescriptor`] is one entry of a [`Shape`](crate::Shape): the
//! key, where the value lives in the object's storage, which runtime
//! representation the location was specialized for, and the attribute bits.

use crate::object::Slot;
use core_types::{PropertyKey, Value};

bitflags::bitflags! {
    /// Property attributes.
    ///
    /// `ACCESSOR` distinguishes accessor properties (getter/setter pair) from
    /// data properties; `WRITABLE` is meaningless for accessors.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyFlags: u8 {
        /// Value can be changed by assignment.
        const WRITABLE = 1 << 0;
        /// Property is visited by enumeration.
        const ENUMERABLE = 1 << 1;
        /// Property can be deleted or reconfigured.
        const CONFIGURABLE = 1 << 2;
        /// Property is an accessor rather than a data property.
        const ACCESSOR = 1 << 3;
    }
}

impl Default for PropertyFlags {
    /// Attributes of a property created by assignment or a literal.
    fn default() -> Self {
        Self::WRITABLE | Self::ENUMERABLE | Self::CONFIGURABLE
    }
}

impl PropertyFlags {
    /// Default data attributes without `ENUMERABLE`.
    pub const fn not_enumerable() -> Self {
        Self::WRITABLE.union(Self::CONFIGURABLE)
    }

    /// Enumerable, configurable accessor.
    pub const fn accessor() -> Self {
        Self::ACCESSOR
            .union(Self::ENUMERABLE)
            .union(Self::CONFIGURABLE)
    }

    /// Check if property is writable.
    #[inline]
    pub fn is_writable(self) -> bool {
        self.contains(Self::WRITABLE)
    }

    /// Check if property is enumerable.
    #[inline]
    pub fn is_enumerable(self) -> bool {
        self.contains(Self::ENUMERABLE)
    }

    /// Check if property is configurable.
    #[inline]
    pub fn is_configurable(self) -> bool {
        self.contains(Self::CONFIGURABLE)
    }

    /// Check if property is an accessor.
    #[inline]
    pub fn is_accessor(self) -> bool {
        self.contains(Self::ACCESSOR)
    }
}

/// Runtime representation a storage location is specialized for.
///
/// Representations only ever widen: `Int` to `Double` to `Tagged`, or
/// directly to `Tagged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    /// Small integers only
    Int,
    /// Numbers (small integers are accepted without widening)
    Double,
    /// Any value
    Tagged,
}

impl Representation {
    /// The narrowest representation that can hold `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Smi(_) => Representation::Int,
            Value::Double(_) => Representation::Double,
            _ => Representation::Tagged,
        }
    }

    /// Returns true if `value` fits this representation without widening.
    pub fn can_store(self, value: &Value) -> bool {
        match self {
            Representation::Int => matches!(value, Value::Smi(_)),
            Representation::Double => matches!(value, Value::Smi(_) | Value::Double(_)),
            Representation::Tagged => true,
        }
    }

    /// The narrowest representation holding values of both.
    pub fn generalize(self, other: Representation) -> Representation {
        use Representation::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Int, Double) | (Double, Int) => Double,
            _ => Tagged,
        }
    }
}

/// Where a property value lives inside an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    /// Fixed slot index in the object's inline slot vector
    Inline(u32),
    /// Entry in the object's dynamic map, keyed by the property key
    Dynamic,
}

/// One key's storage location and attribute bits within a shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// Property key
    pub key: PropertyKey,
    /// Storage location
    pub location: Location,
    /// Representation the location is specialized for
    pub representation: Representation,
    /// Attribute bits
    pub flags: PropertyFlags,
}

impl PropertyDescriptor {
    /// Returns true for accessor properties.
    #[inline]
    pub fn is_accessor(&self) -> bool {
        self.flags.is_accessor()
    }

    /// Returns true for data properties.
    #[inline]
    pub fn is_data(&self) -> bool {
        !self.flags.is_accessor()
    }

    /// Returns true if `slot` can be stored at this location without changing
    /// the descriptor.
    pub fn can_store(&self, slot: &Slot) -> bool {
        match slot {
            Slot::Data(value) => self.is_data() && self.representation.can_store(value),
            Slot::Accessor(_) => self.is_accessor(),
        }
    }
}
