//! Object storage for the property-access fast path.
//!
//! [`ObjectHeap`] stands in for the surrounding runtime's object store: it
//! owns every [`JsObject`], hands out [`ObjectId`] handles, and implements
//! the full (uncached) property definition protocol including shape
//! transitions, representation widening, migration off obsolete shapes and
//! the switch to dictionary mode.

use crate::object::{Accessor, InternalSlots, JsObject, ObjectStorage, Slot};
use crate::property::{Location, PropertyDescriptor, PropertyFlags, Representation};
use crate::shape::{Layout, ObjectClass, Shape, ShapeTree, DEFAULT_MAX_INLINE_SLOTS};
use core_types::{JsError, JsResult, ObjectId, PropertyKey, Value};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Layout policy of an [`ObjectHeap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
    /// Inline slots per shape lineage
    pub max_inline_slots: u32,
    /// Own-property count at which an object switches to dictionary mode
    pub dictionary_mode_threshold: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            max_inline_slots: DEFAULT_MAX_INLINE_SLOTS,
            dictionary_mode_threshold: 128,
        }
    }
}

/// An own property as seen by the uncached protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnProperty {
    /// Attribute bits
    pub flags: PropertyFlags,
    /// Stored value or accessor pair
    pub slot: Slot,
}

/// Arena of objects sharing one shape tree.
///
/// # Example
///
/// ```
/// use core_types::Value;
/// use object_model::{ObjectHeap, PropertyFlags};
///
/// let mut heap = ObjectHeap::new();
/// let obj = heap.allocate(None);
/// heap.put_data_property(obj, "x".into(), Value::Smi(1), PropertyFlags::default()).unwrap();
///
/// let shape = heap.shape_of(obj).unwrap();
/// assert!(shape.lookup(&"x".into()).is_some());
/// ```
pub struct ObjectHeap {
    shapes: Arc<ShapeTree>,
    objects: Vec<JsObject>,
    config: HeapConfig,
}

impl ObjectHeap {
    /// Creates a heap with the default layout policy.
    pub fn new() -> Self {
        Self::with_config(HeapConfig::default())
    }

    /// Creates a heap with its own shape tree.
    pub fn with_config(config: HeapConfig) -> Self {
        Self::with_shapes(Arc::new(ShapeTree::new(config.max_inline_slots)), config)
    }

    /// Creates a heap sharing an existing shape tree.
    pub fn with_shapes(shapes: Arc<ShapeTree>, config: HeapConfig) -> Self {
        ObjectHeap {
            shapes,
            objects: Vec::new(),
            config,
        }
    }

    /// Layout policy.
    pub fn config(&self) -> HeapConfig {
        self.config
    }

    /// The shape tree of this heap.
    pub fn shapes(&self) -> &Arc<ShapeTree> {
        &self.shapes
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if no object has been allocated.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// Allocates an empty ordinary object.
    pub fn allocate(&mut self, prototype: Option<ObjectId>) -> ObjectId {
        let shape = self.shapes.empty(Layout::ordinary(prototype));
        self.allocate_with_shape(shape)
    }

    /// Allocates an object that starts out with `shape`.
    ///
    /// Slots for properties already present in `shape` read as `undefined`
    /// until written.
    pub fn allocate_with_shape(&mut self, shape: Arc<Shape>) -> ObjectId {
        let shape = self.shapes.current(&shape);
        self.push(JsObject::with_shape(shape, InternalSlots::None))
    }

    /// Allocates an empty ordinary object in dictionary mode.
    pub fn allocate_dictionary(&mut self, prototype: Option<ObjectId>) -> ObjectId {
        self.push(JsObject::dictionary(prototype))
    }

    /// Allocates a proxy for `target` with trap functions on `handler`.
    pub fn allocate_proxy(&mut self, target: ObjectId, handler: ObjectId) -> ObjectId {
        let shape = self.shapes.empty(Layout {
            class: ObjectClass::Proxy,
            prototype: None,
        });
        self.push(JsObject::with_shape(
            shape,
            InternalSlots::Proxy { target, handler },
        ))
    }

    /// Allocates an adapter whose properties are resolved by `adaptee`'s traps.
    pub fn allocate_adapter(&mut self, adaptee: ObjectId, prototype: Option<ObjectId>) -> ObjectId {
        let shape = self.shapes.empty(Layout {
            class: ObjectClass::Adapter,
            prototype,
        });
        self.push(JsObject::with_shape(shape, InternalSlots::Adapter { adaptee }))
    }

    /// Allocates an empty module namespace object.
    pub fn allocate_namespace(&mut self) -> ObjectId {
        let shape = self.shapes.empty(Layout {
            class: ObjectClass::ModuleNamespace,
            prototype: None,
        });
        self.push(JsObject::with_shape(shape, InternalSlots::None))
    }

    fn push(&mut self, object: JsObject) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Returns the object behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this heap.
    pub fn get(&self, id: ObjectId) -> &JsObject {
        match self.objects.get(id.0 as usize) {
            Some(object) => object,
            None => panic!("object {} does not belong to this heap", id.0),
        }
    }

    fn get_mut(&mut self, id: ObjectId) -> &mut JsObject {
        match self.objects.get_mut(id.0 as usize) {
            Some(object) => object,
            None => panic!("object {} does not belong to this heap", id.0),
        }
    }

    /// Object class.
    pub fn class_of(&self, id: ObjectId) -> ObjectClass {
        self.get(id).class
    }

    /// Internal slots.
    pub fn internal_slots(&self, id: ObjectId) -> InternalSlots {
        self.get(id).internal
    }

    /// Returns true if the object is in dictionary mode.
    pub fn is_dictionary(&self, id: ObjectId) -> bool {
        self.get(id).is_dictionary()
    }

    /// Up-to-date shape of the object; `None` in dictionary mode.
    ///
    /// Never returns an obsolete shape: if the stored shape was superseded,
    /// its successor is reported.
    pub fn shape_of(&self, id: ObjectId) -> Option<Arc<Shape>> {
        self.get(id)
            .stored_shape()
            .map(|shape| self.shapes.current(shape))
    }

    /// Prototype of the object.
    pub fn prototype_of(&self, id: ObjectId) -> Option<ObjectId> {
        match &self.get(id).storage {
            ObjectStorage::Shaped { shape, .. } => shape.prototype(),
            ObjectStorage::Dictionary { prototype, .. } => *prototype,
        }
    }

    /// Whether new properties may be added.
    pub fn is_extensible(&self, id: ObjectId) -> bool {
        match &self.get(id).storage {
            ObjectStorage::Shaped { shape, .. } => self.shapes.current(shape).is_extensible(),
            ObjectStorage::Dictionary { extensible, .. } => *extensible,
        }
    }

    /// Own property lookup through the uncached protocol.
    pub fn own_property(&self, id: ObjectId, key: &PropertyKey) -> Option<OwnProperty> {
        match &self.get(id).storage {
            ObjectStorage::Shaped { shape, .. } => {
                let shape = self.shapes.current(shape);
                let descriptor = shape.lookup(key)?;
                Some(OwnProperty {
                    flags: descriptor.flags,
                    slot: self.read_slot(id, descriptor),
                })
            }
            ObjectStorage::Dictionary { properties, .. } => {
                properties.get(key).map(|(flags, slot)| OwnProperty {
                    flags: *flags,
                    slot: slot.clone(),
                })
            }
        }
    }

    /// Own property keys in insertion order.
    pub fn own_keys(&self, id: ObjectId) -> Vec<PropertyKey> {
        match &self.get(id).storage {
            ObjectStorage::Shaped { shape, .. } => self
                .shapes
                .current(shape)
                .properties()
                .map(|descriptor| descriptor.key.clone())
                .collect(),
            ObjectStorage::Dictionary { properties, .. } => properties.keys().cloned().collect(),
        }
    }

    /// Reads the storage location described by `descriptor`.
    ///
    /// The caller guarantees that `descriptor` belongs to the object's shape.
    /// Locations that were never written read as `undefined`.
    ///
    /// # Panics
    ///
    /// Panics on dictionary-mode objects, which have no locations.
    pub fn read_slot(&self, id: ObjectId, descriptor: &PropertyDescriptor) -> Slot {
        match &self.get(id).storage {
            ObjectStorage::Shaped { slots, dynamic, .. } => read_location(slots, dynamic, descriptor),
            ObjectStorage::Dictionary { .. } => {
                panic!("read_slot on dictionary-mode object {}", id.0)
            }
        }
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Moves the object off an obsolete shape.
    ///
    /// Returns true if the stored shape was replaced.
    pub fn migrate(&mut self, id: ObjectId) -> bool {
        let shapes = Arc::clone(&self.shapes);
        match &mut self.get_mut(id).storage {
            ObjectStorage::Shaped { shape, .. } if shape.is_obsolete() => {
                *shape = shapes.current(shape);
                true
            }
            _ => false,
        }
    }

    /// Stores `slot` at `descriptor`'s location and installs `new_shape`.
    ///
    /// This is the cached install path: the caller has already established
    /// that the object's current shape is the one the transition was
    /// recorded from, and that the location can hold `slot` as is.
    pub fn store_with_transition(
        &mut self,
        id: ObjectId,
        new_shape: &Arc<Shape>,
        descriptor: &PropertyDescriptor,
        slot: Slot,
    ) {
        debug_assert!(descriptor.can_store(&slot));
        match &mut self.get_mut(id).storage {
            ObjectStorage::Shaped {
                shape,
                slots,
                dynamic,
            } => {
                write_location(slots, dynamic, descriptor, slot);
                *shape = Arc::clone(new_shape);
            }
            ObjectStorage::Dictionary { .. } => {
                panic!("store_with_transition on dictionary-mode object {}", id.0)
            }
        }
    }

    /// Defines (or redefines) an own data property.
    ///
    /// # Errors
    ///
    /// `TypeError` if the property is non-configurable with different
    /// attributes, or if a new property is added to a non-extensible object.
    pub fn put_data_property(
        &mut self,
        id: ObjectId,
        key: PropertyKey,
        value: Value,
        flags: PropertyFlags,
    ) -> JsResult<()> {
        self.define_own_property(id, key, Slot::Data(value), flags - PropertyFlags::ACCESSOR)
    }

    /// Defines (or redefines) an own accessor property.
    ///
    /// # Errors
    ///
    /// Same as [`ObjectHeap::put_data_property`].
    pub fn define_accessor_property(
        &mut self,
        id: ObjectId,
        key: PropertyKey,
        accessor: Accessor,
        flags: PropertyFlags,
    ) -> JsResult<()> {
        let flags = (flags | PropertyFlags::ACCESSOR) - PropertyFlags::WRITABLE;
        self.define_own_property(id, key, Slot::Accessor(accessor), flags)
    }

    /// Full property definition protocol.
    pub fn define_own_property(
        &mut self,
        id: ObjectId,
        key: PropertyKey,
        slot: Slot,
        flags: PropertyFlags,
    ) -> JsResult<()> {
        self.migrate(id);
        if self.needs_dictionary_for(id, &key) {
            self.convert_to_dictionary(id);
        }
        let shapes = Arc::clone(&self.shapes);
        match &mut self.get_mut(id).storage {
            ObjectStorage::Dictionary {
                extensible,
                properties,
                ..
            } => {
                match properties.get_mut(&key) {
                    Some((existing, stored)) => {
                        check_redefinition(&key, *existing, stored, flags, &slot)?;
                        *existing = flags;
                        *stored = slot;
                    }
                    None if !*extensible => return Err(not_extensible(&key)),
                    None => {
                        properties.insert(key, (flags, slot));
                    }
                }
                Ok(())
            }
            ObjectStorage::Shaped {
                shape,
                slots,
                dynamic,
            } => {
                if let Some(existing) = shape.lookup(&key) {
                    let stored = read_location(slots, dynamic, existing);
                    check_redefinition(&key, existing.flags, &stored, flags, &slot)?;
                    let mut next = if existing.flags != flags {
                        shapes.with_changed_attributes(shape, &key, flags)
                    } else {
                        Arc::clone(shape)
                    };
                    if let Slot::Data(value) = &slot {
                        let fits = next
                            .lookup(&key)
                            .is_some_and(|descriptor| descriptor.can_store(&slot));
                        if !fits {
                            next = shapes.with_replaced_property(&next, &key, Representation::of(value));
                        }
                    }
                    let descriptor = lookup_present(&next, &key);
                    write_location(slots, dynamic, &descriptor, slot);
                    *shape = next;
                    return Ok(());
                }
                if !shape.is_extensible() {
                    return Err(not_extensible(&key));
                }
                let representation = match &slot {
                    Slot::Data(value) => Representation::of(value),
                    Slot::Accessor(_) => Representation::Tagged,
                };
                let next = shapes.with_added_property(shape, key.clone(), flags, representation);
                let descriptor = lookup_present(&next, &key);
                write_location(slots, dynamic, &descriptor, slot);
                *shape = next;
                Ok(())
            }
        }
    }

    /// Deletes an own property. Returns false for non-configurable properties.
    pub fn delete_property(&mut self, id: ObjectId, key: &PropertyKey) -> bool {
        self.migrate(id);
        let shapes = Arc::clone(&self.shapes);
        match &mut self.get_mut(id).storage {
            ObjectStorage::Dictionary { properties, .. } => match properties.get(key) {
                Some((flags, _)) if !flags.is_configurable() => false,
                Some(_) => {
                    properties.shift_remove(key);
                    true
                }
                None => true,
            },
            ObjectStorage::Shaped {
                shape,
                slots,
                dynamic,
            } => {
                let Some(descriptor) = shape.lookup(key).cloned() else {
                    return true;
                };
                if !descriptor.flags.is_configurable() {
                    return false;
                }
                match descriptor.location {
                    Location::Inline(index) => {
                        if let Some(slot) = slots.get_mut(index as usize) {
                            *slot = Slot::Data(Value::Undefined);
                        }
                    }
                    Location::Dynamic => {
                        dynamic.remove(key);
                    }
                }
                *shape = shapes.with_removed_property(shape, key);
                true
            }
        }
    }

    /// Replaces the prototype.
    ///
    /// # Errors
    ///
    /// `TypeError` if the new prototype chain would contain the object
    /// itself, or if the object is non-extensible and the prototype changes.
    pub fn set_prototype(&mut self, id: ObjectId, prototype: Option<ObjectId>) -> JsResult<()> {
        if self.prototype_of(id) == prototype {
            return Ok(());
        }
        if !self.is_extensible(id) {
            return Err(JsError::type_error("object is not extensible"));
        }
        let mut cursor = prototype;
        while let Some(p) = cursor {
            if p == id {
                return Err(JsError::type_error("Cyclic __proto__ value"));
            }
            cursor = self.prototype_of(p);
        }
        self.migrate(id);
        let shapes = Arc::clone(&self.shapes);
        match &mut self.get_mut(id).storage {
            ObjectStorage::Shaped { shape, .. } => {
                *shape = shapes.with_prototype(shape, prototype);
            }
            ObjectStorage::Dictionary {
                prototype: stored, ..
            } => {
                *stored = prototype;
            }
        }
        Ok(())
    }

    /// Makes the object non-extensible.
    pub fn prevent_extensions(&mut self, id: ObjectId) {
        self.migrate(id);
        let shapes = Arc::clone(&self.shapes);
        match &mut self.get_mut(id).storage {
            ObjectStorage::Shaped { shape, .. } => {
                *shape = shapes.without_extensions(shape);
            }
            ObjectStorage::Dictionary { extensible, .. } => {
                *extensible = false;
            }
        }
    }

    /// Returns true if adding `key` would push a shaped object past the
    /// dictionary-mode threshold.
    fn needs_dictionary_for(&self, id: ObjectId, key: &PropertyKey) -> bool {
        match self.shape_of(id) {
            Some(shape) => {
                shape.is_extensible()
                    && shape.lookup(key).is_none()
                    && shape.property_count() >= self.config.dictionary_mode_threshold
            }
            None => false,
        }
    }

    /// Switches the object to dictionary mode, keeping property order.
    pub fn convert_to_dictionary(&mut self, id: ObjectId) {
        let Some(shape) = self.shape_of(id) else {
            return;
        };
        let mut properties = IndexMap::default();
        for descriptor in shape.properties() {
            let slot = self.read_slot(id, descriptor);
            properties.insert(descriptor.key.clone(), (descriptor.flags, slot));
        }
        log::debug!(
            "object {} switched to dictionary mode with {} properties",
            id.0,
            properties.len()
        );
        self.get_mut(id).storage = ObjectStorage::Dictionary {
            prototype: shape.prototype(),
            extensible: shape.is_extensible(),
            properties,
        };
    }
}

impl Default for ObjectHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObjectHeap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectHeap")
            .field("objects", &self.objects.len())
            .field("shapes", &self.shapes)
            .field("config", &self.config)
            .finish()
    }
}

fn write_location(
    slots: &mut Vec<Slot>,
    dynamic: &mut FxHashMap<PropertyKey, Slot>,
    descriptor: &PropertyDescriptor,
    slot: Slot,
) {
    match descriptor.location {
        Location::Inline(index) => {
            let index = index as usize;
            if slots.len() <= index {
                slots.resize(index + 1, Slot::Data(Value::Undefined));
            }
            slots[index] = slot;
        }
        Location::Dynamic => {
            dynamic.insert(descriptor.key.clone(), slot);
        }
    }
}

fn read_location(
    slots: &[Slot],
    dynamic: &FxHashMap<PropertyKey, Slot>,
    descriptor: &PropertyDescriptor,
) -> Slot {
    let slot = match descriptor.location {
        Location::Inline(index) => slots.get(index as usize),
        Location::Dynamic => dynamic.get(&descriptor.key),
    };
    slot.cloned().unwrap_or(Slot::Data(Value::Undefined))
}

fn lookup_present(shape: &Shape, key: &PropertyKey) -> PropertyDescriptor {
    match shape.lookup(key) {
        Some(descriptor) => descriptor.clone(),
        None => unreachable!("transition lost property {} in {}", key, shape),
    }
}

/// Non-configurable properties accept a redefinition only if it changes
/// nothing, except that a writable data property may change its value or
/// drop `WRITABLE`.
fn check_redefinition(
    key: &PropertyKey,
    existing: PropertyFlags,
    stored: &Slot,
    requested: PropertyFlags,
    slot: &Slot,
) -> JsResult<()> {
    if existing.is_configurable() {
        return Ok(());
    }
    let allowed = match (stored, slot) {
        _ if requested.is_configurable()
            || existing.contains(PropertyFlags::ENUMERABLE)
                != requested.contains(PropertyFlags::ENUMERABLE) =>
        {
            false
        }
        (Slot::Data(_), Slot::Data(_)) if existing.is_writable() => true,
        (Slot::Data(current), Slot::Data(value)) => !requested.is_writable() && same_value(current, value),
        (Slot::Accessor(current), Slot::Accessor(accessor)) => current == accessor,
        _ => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(JsError::type_error(format!("Cannot redefine property: {}", key)))
    }
}

fn same_value(a: &Value, b: &Value) -> bool {
    let number = |value: &Value| match value {
        Value::Smi(n) => Some(f64::from(*n)),
        Value::Double(d) => Some(*d),
        _ => None,
    };
    match (number(a), number(b)) {
        (Some(x), Some(y)) => (x.is_nan() && y.is_nan()) || x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

fn not_extensible(key: &PropertyKey) -> JsError {
    JsError::type_error(format!(
        "Cannot add property {}, object is not extensible",
        key
    ))
}
