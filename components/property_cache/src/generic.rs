//! Uncached property resolution.
//!
//! This is what a megamorphic site runs on every access, and what cache
//! entries fall back to for the parts of a lookup they do not specialize.

use core_types::{JsError, JsResult, ObjectId, PrimitiveKind, PropertyKey, Value};
use object_model::{InternalSlots, ObjectClass, ObjectHeap, PropertyFlags, Slot, WalkStop};

use crate::host::Host;
use crate::realm::Intrinsics;

/// Everything a lookup may consult.
pub(crate) struct Resolver<'a> {
    pub heap: &'a ObjectHeap,
    pub host: &'a mut dyn Host,
    pub intrinsics: &'a Intrinsics,
}

impl Resolver<'_> {
    /// `receiver[key]`
    pub fn read(&mut self, receiver: &Value, key: &PropertyKey) -> JsResult<Value> {
        if let Some(kind) = receiver.primitive_kind() {
            if let (PrimitiveKind::String, Value::String(s)) = (kind, receiver) {
                if is_length(key) {
                    return Ok(string_length(s));
                }
                if let Some(character) = string_index(s, key) {
                    return Ok(character);
                }
            }
            return self.read_from(self.intrinsics.prototype_for(kind), receiver, key);
        }
        match receiver {
            Value::Object(id) => self.read_from(Some(*id), receiver, key),
            Value::Foreign(foreign) => self.host.foreign_read(*foreign, key),
            _ => Err(read_error(receiver, key)),
        }
    }

    /// Reads `key` starting at `start`, with `receiver` as `this` for getters.
    pub fn read_from(&mut self, start: Option<ObjectId>, receiver: &Value, key: &PropertyKey) -> JsResult<Value> {
        let mut cursor = start;
        while let Some(id) = cursor {
            let walk = self.heap.walk_prototype_chain(id, key, false);
            match walk.stop {
                WalkStop::Found { holder, descriptor } => {
                    let slot = self.heap.read_slot(holder, &descriptor);
                    return self.slot_value(slot, receiver);
                }
                WalkStop::Absent => return Ok(Value::Undefined),
                WalkStop::Exotic { holder, .. } => return self.read_exotic(holder, receiver, key),
                WalkStop::Dictionary { holder } => {
                    if let Some(own) = self.heap.own_property(holder, key) {
                        return self.slot_value(own.slot, receiver);
                    }
                    cursor = self.heap.prototype_of(holder);
                }
            }
        }
        Ok(Value::Undefined)
    }

    /// Read delegated to an exotic holder.
    pub fn read_exotic(&mut self, holder: ObjectId, receiver: &Value, key: &PropertyKey) -> JsResult<Value> {
        match self.heap.internal_slots(holder) {
            InternalSlots::Proxy { target, handler } => self.host.proxy_get(target, handler, key, receiver),
            InternalSlots::Adapter { adaptee } => self.host.adapter_get(adaptee, key),
            InternalSlots::None => match self.heap.own_property(holder, key) {
                Some(own) => self.slot_value(own.slot, receiver),
                None => Ok(Value::Undefined),
            },
        }
    }

    /// `key in receiver`, or own-property presence with `own_only`.
    ///
    /// Primitives are treated as their wrapper objects.
    pub fn has(&mut self, receiver: &Value, key: &PropertyKey, own_only: bool) -> JsResult<bool> {
        if let Some(kind) = receiver.primitive_kind() {
            if let Value::String(s) = receiver {
                if is_length(key) || string_index(s, key).is_some() {
                    return Ok(true);
                }
            }
            if own_only {
                return Ok(false);
            }
            return self.has_from(self.intrinsics.prototype_for(kind), key, false);
        }
        match receiver {
            Value::Object(id) => self.has_from(Some(*id), key, own_only),
            Value::Foreign(foreign) => self.host.foreign_has(*foreign, key),
            _ => Err(has_error(receiver, key)),
        }
    }

    /// Presence check starting at `start`.
    pub fn has_from(&mut self, start: Option<ObjectId>, key: &PropertyKey, own_only: bool) -> JsResult<bool> {
        let mut cursor = start;
        while let Some(id) = cursor {
            let walk = self.heap.walk_prototype_chain(id, key, own_only);
            match walk.stop {
                WalkStop::Found { .. } => return Ok(true),
                WalkStop::Absent => return Ok(false),
                WalkStop::Exotic { holder, .. } => return self.has_exotic(holder, key, own_only),
                WalkStop::Dictionary { holder } => {
                    if self.heap.own_property(holder, key).is_some() {
                        return Ok(true);
                    }
                    if own_only {
                        return Ok(false);
                    }
                    cursor = self.heap.prototype_of(holder);
                }
            }
        }
        Ok(false)
    }

    /// Presence check delegated to an exotic holder.
    pub fn has_exotic(&mut self, holder: ObjectId, key: &PropertyKey, own_only: bool) -> JsResult<bool> {
        match self.heap.internal_slots(holder) {
            InternalSlots::Proxy { target, handler } if own_only => {
                self.host.proxy_has_own(target, handler, key)
            }
            InternalSlots::Proxy { target, handler } => self.host.proxy_has(target, handler, key),
            InternalSlots::Adapter { adaptee } => self.host.adapter_has(adaptee, key),
            InternalSlots::None => Ok(self.heap.own_property(holder, key).is_some()),
        }
    }

    /// Value of a property slot; accessors call their getter.
    pub fn slot_value(&mut self, slot: Slot, receiver: &Value) -> JsResult<Value> {
        match slot {
            Slot::Data(value) => Ok(value),
            Slot::Accessor(accessor) => match accessor.getter {
                Some(getter) => self.host.call_getter(getter, receiver),
                None => Ok(Value::Undefined),
            },
        }
    }
}

/// Defines `key` on `receiver` without caching.
pub(crate) fn define(
    heap: &mut ObjectHeap,
    host: &mut dyn Host,
    receiver: &Value,
    key: PropertyKey,
    value: Value,
    flags: PropertyFlags,
) -> JsResult<()> {
    match receiver {
        Value::Object(id) => match heap.internal_slots(*id) {
            InternalSlots::Proxy { target, handler } => host.proxy_define(target, handler, &key, value, flags),
            InternalSlots::Adapter { adaptee } => host.adapter_put(adaptee, &key, value),
            InternalSlots::None if heap.class_of(*id) == ObjectClass::ModuleNamespace => Err(
                JsError::type_error(format!("Cannot define property {}, object is not extensible", key)),
            ),
            InternalSlots::None => heap.put_data_property(*id, key, value, flags),
        },
        Value::Foreign(foreign) => host.foreign_write(*foreign, &key, value),
        Value::Undefined | Value::Null => Err(JsError::type_error(format!(
            "Cannot set properties of {} (setting '{}')",
            receiver, key
        ))),
        _ => Err(JsError::type_error(format!(
            "Cannot define property {} on primitive {}",
            key,
            receiver.type_of()
        ))),
    }
}

pub(crate) fn read_error(receiver: &Value, key: &PropertyKey) -> JsError {
    JsError::type_error(format!("Cannot read properties of {} (reading '{}')", receiver, key))
}

pub(crate) fn has_error(receiver: &Value, key: &PropertyKey) -> JsError {
    JsError::type_error(format!(
        "Cannot use 'in' operator to search for '{}' in {}",
        key, receiver
    ))
}

pub(crate) fn is_length(key: &PropertyKey) -> bool {
    key.as_str() == Some("length")
}

pub(crate) fn string_length(s: &str) -> Value {
    Value::Smi(s.encode_utf16().count() as i32)
}

/// Canonical array index: decimal digits without a leading zero, below
/// `u32::MAX`.
pub(crate) fn array_index(key: &PropertyKey) -> Option<u32> {
    let text = key.as_str()?;
    if text.is_empty() || (text.len() > 1 && text.starts_with('0')) {
        return None;
    }
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<u32>().ok().filter(|&index| index != u32::MAX)
}

/// The UTF-16 code unit of `s` at index `key`, as a one-unit string.
///
/// A lone surrogate comes back as U+FFFD, since `Value::String` holds UTF-8.
pub(crate) fn string_index(s: &str, key: &PropertyKey) -> Option<Value> {
    let index = array_index(key)?;
    let unit = s.encode_utf16().nth(index as usize)?;
    Some(Value::String(String::from_utf16_lossy(&[unit])))
}
