//! Object literal evaluation and the install cache behind it.
//!
//! Each named member of a literal owns a [`LiteralInstallCache`] that
//! remembers `(old shape, new shape, descriptor)` triples. Evaluating the
//! same literal again finds the triple for the object's current shape and
//! stores the value straight into the recorded location.

use core_types::{JsResult, ObjectId, PropertyKey, Value};
use object_model::{
    Accessor, Assumption, ObjectClass, ObjectHeap, PropertyDescriptor, PropertyFlags, Shape, Slot,
};
use std::fmt;
use std::iter;
use std::sync::Arc;

use crate::config::CacheConfig;
use crate::host::Host;
use crate::inline_cache::{CacheState, PublishCell};
use crate::realm::Intrinsics;
use crate::site::{Counters, SiteStats};

/// One recorded install transition.
#[derive(Debug, Clone)]
pub struct InstallEntry {
    old_shape: Arc<Shape>,
    new_shape: Arc<Shape>,
    descriptor: PropertyDescriptor,
    new_shape_valid: Arc<Assumption>,
}

impl InstallEntry {
    /// Shape the object had before the install.
    pub fn old_shape(&self) -> &Arc<Shape> {
        &self.old_shape
    }

    /// Shape the object has after the install.
    pub fn new_shape(&self) -> &Arc<Shape> {
        &self.new_shape
    }

    /// Descriptor of the installed property in the new shape.
    pub fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    /// False once either shape became obsolete; such entries never match
    /// again.
    pub fn is_valid(&self) -> bool {
        self.new_shape_valid.is_valid() && self.old_shape.is_valid()
    }

    fn matches(&self, shape: &Shape, key: &PropertyKey, slot: &Slot, flags: PropertyFlags) -> bool {
        self.old_shape.check(shape)
            && self.new_shape_valid.check().is_ok()
            && self.descriptor.key == *key
            && self.descriptor.flags == flags
            && self.descriptor.can_store(slot)
    }
}

impl fmt::Display for InstallEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({})",
            self.old_shape.id().0,
            self.new_shape.id().0,
            self.descriptor.key
        )
    }
}

/// Install cache of one literal member or define site.
///
/// Unbounded: new entries go to the front and every insert filters out
/// entries that can never match again.
#[derive(Debug, Default)]
pub struct LiteralInstallCache {
    entries: PublishCell<Vec<InstallEntry>>,
    counters: Counters,
}

impl LiteralInstallCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines `key` on `object` with `slot` and `flags`.
    ///
    /// Ordinary shaped objects go through the cache; dictionary-mode
    /// objects always take the full definition path.
    ///
    /// # Errors
    ///
    /// Whatever the full definition path raises (non-extensible objects,
    /// non-configurable properties).
    pub fn install(
        &self,
        heap: &mut ObjectHeap,
        object: ObjectId,
        key: &PropertyKey,
        slot: Slot,
        flags: PropertyFlags,
    ) -> JsResult<()> {
        let shape = match heap.shape_of(object) {
            Some(shape) if shape.class() == ObjectClass::Ordinary => shape,
            _ => return heap.define_own_property(object, key.clone(), slot, flags),
        };

        let (version, entries) = self.entries.snapshot();
        if let Some(entry) = entries.iter().find(|e| e.matches(&shape, key, &slot, flags)) {
            self.counters.hit();
            heap.store_with_transition(object, &entry.new_shape, &entry.descriptor, slot);
            return Ok(());
        }

        self.counters.miss();
        heap.define_own_property(object, key.clone(), slot, flags)?;
        let Some(new_shape) = heap.shape_of(object) else {
            return Ok(());
        };
        let Some(descriptor) = new_shape.lookup(key).cloned() else {
            return Ok(());
        };
        let entry = InstallEntry {
            new_shape_valid: Arc::clone(new_shape.validity()),
            old_shape: shape,
            new_shape,
            descriptor,
        };
        if !entry.is_valid() {
            return Ok(());
        }
        let next: Vec<InstallEntry> = iter::once(entry)
            .chain(entries.iter().filter(|e| e.is_valid()).cloned())
            .collect();
        let dropped = entries.len() + 1 - next.len();
        if self.entries.publish(version, next) {
            log::trace!("cached install of {} at literal site", key);
            if dropped > 0 {
                log::debug!("dropped {} obsolete install entries for {}", dropped, key);
            }
        }
        Ok(())
    }

    /// Number of recorded transitions.
    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    /// Returns true if nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recorded transitions, newest first.
    pub fn entries(&self) -> Vec<InstallEntry> {
        self.entries.load().as_ref().clone()
    }

    /// Chain state by number of recorded transitions.
    pub fn state(&self) -> CacheState {
        match self.len() {
            0 => CacheState::Uninitialized,
            1 => CacheState::Monomorphic,
            _ => CacheState::Polymorphic,
        }
    }

    /// Hit and miss counts.
    pub fn stats(&self) -> SiteStats {
        self.counters.snapshot()
    }

    /// Recorded transitions, e.g. `[3 -> 4 (x)]`.
    pub fn debug_string(&self) -> String {
        let entries = self.entries.load();
        let parts: Vec<String> = entries.iter().map(ToString::to_string).collect();
        format!("[{}]", parts.join(", "))
    }
}

/// Syntactic member of an object literal.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralMember {
    /// `key: value`
    Data(PropertyKey),
    /// `get key() {}` / `set key(v) {}`
    Accessor(PropertyKey),
    /// `[expr]: value`
    ComputedData,
    /// `get [expr]() {}` / `set [expr](v) {}`
    ComputedAccessor,
    /// `__proto__: value`
    Proto,
    /// `...value`
    Spread,
}

/// Runtime input for one member of an evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberValue {
    /// Value of a data, `__proto__` or spread member
    Value(Value),
    /// Functions of an accessor member
    Accessor(Accessor),
    /// Key and value of a computed data member
    Keyed(PropertyKey, Value),
    /// Key and functions of a computed accessor member
    KeyedAccessor(PropertyKey, Accessor),
}

/// Object literal with per-member install caches.
///
/// # Example
///
/// ```
/// use core_types::Value;
/// use object_model::ObjectHeap;
/// use property_cache::{CacheConfig, Intrinsics, LiteralMember, MemberValue, NoHost, ObjectLiteral};
///
/// let literal = ObjectLiteral::new(
///     vec![LiteralMember::Data("x".into()), LiteralMember::Data("y".into())],
///     &CacheConfig::default(),
/// );
/// let mut heap = ObjectHeap::new();
/// let values = || vec![MemberValue::Value(Value::Smi(1)), MemberValue::Value(Value::Smi(2))];
/// let a = literal.evaluate(&mut heap, &mut NoHost, &Intrinsics::default(), values()).unwrap();
/// let b = literal.evaluate(&mut heap, &mut NoHost, &Intrinsics::default(), values()).unwrap();
/// assert!(heap.shape_of(a).unwrap().check(&heap.shape_of(b).unwrap()));
/// ```
#[derive(Debug)]
pub struct ObjectLiteral {
    members: Vec<(LiteralMember, LiteralInstallCache)>,
    dictionary: bool,
}

impl ObjectLiteral {
    /// Creates a literal; data-only literals above the configured size
    /// are built directly in dictionary mode.
    pub fn new(members: Vec<LiteralMember>, config: &CacheConfig) -> Self {
        let data_only = members.iter().all(|m| matches!(m, LiteralMember::Data(_)));
        let dictionary = data_only && members.len() > config.literal_dictionary_threshold;
        ObjectLiteral {
            members: members
                .into_iter()
                .map(|member| (member, LiteralInstallCache::new()))
                .collect(),
            dictionary,
        }
    }

    /// Members in source order.
    pub fn members(&self) -> impl Iterator<Item = &LiteralMember> {
        self.members.iter().map(|(member, _)| member)
    }

    /// Install cache of the member at `index`.
    pub fn member_cache(&self, index: usize) -> Option<&LiteralInstallCache> {
        self.members.get(index).map(|(_, cache)| cache)
    }

    /// Returns true if evaluation starts in dictionary mode.
    pub fn is_dictionary_literal(&self) -> bool {
        self.dictionary
    }

    /// Creates a new object from `values`, one per member.
    ///
    /// # Errors
    ///
    /// Getter and host errors raised while spreading.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not line up with the members.
    pub fn evaluate(
        &self,
        heap: &mut ObjectHeap,
        host: &mut dyn Host,
        intrinsics: &Intrinsics,
        values: Vec<MemberValue>,
    ) -> JsResult<ObjectId> {
        assert_eq!(
            values.len(),
            self.members.len(),
            "object literal evaluated with the wrong number of values"
        );
        let object = if self.dictionary {
            heap.allocate_dictionary(intrinsics.object_prototype)
        } else {
            heap.allocate(intrinsics.object_prototype)
        };
        for ((member, cache), value) in self.members.iter().zip(values) {
            match (member, value) {
                (LiteralMember::Data(key), MemberValue::Value(value)) => {
                    cache.install(heap, object, key, Slot::Data(value), PropertyFlags::default())?;
                }
                (LiteralMember::Accessor(key), MemberValue::Accessor(accessor)) => {
                    let accessor = merge_accessor(heap, object, key, accessor);
                    cache.install(heap, object, key, Slot::Accessor(accessor), PropertyFlags::accessor())?;
                }
                (LiteralMember::ComputedData, MemberValue::Keyed(key, value)) => {
                    heap.put_data_property(object, key, value, PropertyFlags::default())?;
                }
                (LiteralMember::ComputedAccessor, MemberValue::KeyedAccessor(key, accessor)) => {
                    let accessor = merge_accessor(heap, object, &key, accessor);
                    heap.define_accessor_property(object, key, accessor, PropertyFlags::accessor())?;
                }
                (LiteralMember::Proto, MemberValue::Value(value)) => match value {
                    Value::Object(prototype) => heap.set_prototype(object, Some(prototype))?,
                    Value::Null => heap.set_prototype(object, None)?,
                    _ => {}
                },
                (LiteralMember::Spread, MemberValue::Value(source)) => {
                    copy_data_properties(heap, host, object, &source)?;
                }
                (member, value) => {
                    panic!("literal member {:?} evaluated with {:?}", member, value)
                }
            }
        }
        Ok(object)
    }
}

/// Completes a getter-only or setter-only member with the other half
/// already defined on `object`.
fn merge_accessor(heap: &ObjectHeap, object: ObjectId, key: &PropertyKey, accessor: Accessor) -> Accessor {
    match heap.own_property(object, key).map(|own| own.slot) {
        Some(Slot::Accessor(existing)) => Accessor {
            getter: accessor.getter.or(existing.getter),
            setter: accessor.setter.or(existing.setter),
        },
        _ => accessor,
    }
}

/// Copies the enumerable own properties of `source` onto `target` as data
/// properties. `null` and `undefined` are ignored; strings spread into
/// their characters.
fn copy_data_properties(
    heap: &mut ObjectHeap,
    host: &mut dyn Host,
    target: ObjectId,
    source: &Value,
) -> JsResult<()> {
    match source {
        Value::String(s) => {
            for (index, ch) in s.chars().enumerate() {
                heap.put_data_property(
                    target,
                    index.to_string().into(),
                    Value::String(ch.to_string()),
                    PropertyFlags::default(),
                )?;
            }
            Ok(())
        }
        Value::Object(id) if heap.class_of(*id) == ObjectClass::Ordinary => {
            for key in heap.own_keys(*id) {
                let Some(own) = heap.own_property(*id, &key) else {
                    continue;
                };
                if !own.flags.is_enumerable() {
                    continue;
                }
                let value = match own.slot {
                    Slot::Data(value) => value,
                    Slot::Accessor(Accessor {
                        getter: Some(getter),
                        ..
                    }) => host.call_getter(getter, source)?,
                    Slot::Accessor(_) => Value::Undefined,
                };
                heap.put_data_property(target, key, value, PropertyFlags::default())?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
