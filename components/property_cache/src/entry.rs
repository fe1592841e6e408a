//! Cache entries: a guard plus the action that is valid under it.

use core_types::{JsResult, ObjectId, PropertyKey, Value};
use object_model::{ChainWalk, ObjectClass, ObjectHeap, PropertyDescriptor, WalkStop};
use std::fmt;

use crate::generic::{array_index, is_length, string_length, Resolver};
use crate::guard::{GuardMatch, ReceiverGuard, ShapePath};
use crate::realm::Intrinsics;

/// Operation an access site performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupMode {
    /// Property read
    Read,
    /// `in` operator: own or inherited presence
    Has,
    /// `hasOwnProperty`: own presence only
    HasOwn,
}

impl LookupMode {
    /// Returns true if only the receiver itself is consulted.
    pub fn own_only(self) -> bool {
        matches!(self, LookupMode::HasOwn)
    }
}

/// What a matching entry does.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryAction {
    /// Data property stored at the descriptor's location in the guard holder
    Present(PropertyDescriptor),
    /// Accessor property stored in the guard holder
    Accessor(PropertyDescriptor),
    /// No object on the guarded path has the key and the path is complete
    Absent,
    /// The guarded path lacks the key; the rest of the chain is resolved
    /// uncached, starting after the path
    Continue,
    /// Adapter receiver; resolved by the adaptee's traps
    Adapter,
    /// Proxy receiver; resolved by the handler's traps
    Proxy,
    /// Module namespace receiver; uncached own lookup
    Unspecialized,
    /// Dictionary-mode receiver; flat-map lookup, then the prototype chain
    Dictionary,
    /// Foreign receiver; foreign protocol
    Foreign,
    /// `length` of a primitive string
    StringLength,
    /// Index key on a primitive string; resolved uncached, since the
    /// answer depends on the string's contents
    StringIndex,
}

impl EntryAction {
    /// Short name used in debug output.
    pub fn name(&self) -> &'static str {
        match self {
            EntryAction::Present(_) => "Present",
            EntryAction::Accessor(_) => "Accessor",
            EntryAction::Absent => "Absent",
            EntryAction::Continue => "Continue",
            EntryAction::Adapter => "Adapter",
            EntryAction::Proxy => "Proxy",
            EntryAction::Unspecialized => "Unspecialized",
            EntryAction::Dictionary => "Dictionary",
            EntryAction::Foreign => "Foreign",
            EntryAction::StringLength => "StringLength",
            EntryAction::StringIndex => "StringIndex",
        }
    }
}

/// One guarded case of an access site's chain.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Property key the entry was derived for
    pub key: PropertyKey,
    /// Receiver guard
    pub guard: ReceiverGuard,
    /// Cached action
    pub action: EntryAction,
}

impl CacheEntry {
    /// Builds the entry for `receiver` and `key` from the current heap state.
    ///
    /// # Panics
    ///
    /// Panics on `null`/`undefined` receivers, which callers reject first.
    pub fn derive(
        heap: &ObjectHeap,
        intrinsics: &Intrinsics,
        receiver: &Value,
        key: &PropertyKey,
        mode: LookupMode,
    ) -> CacheEntry {
        let (guard, action) = derive_guarded(heap, intrinsics, receiver, key, mode);
        CacheEntry {
            key: key.clone(),
            guard,
            action,
        }
    }

    /// False once the entry depends on an obsolete shape.
    pub fn is_valid(&self) -> bool {
        self.guard.is_valid()
    }

    /// Guard check for `receiver` looking up `key`.
    pub fn matches(
        &self,
        heap: &ObjectHeap,
        intrinsics: &Intrinsics,
        receiver: &Value,
        key: &PropertyKey,
    ) -> Option<GuardMatch> {
        if self.key != *key {
            return None;
        }
        self.guard.matches(heap, intrinsics, receiver)
    }

    pub(crate) fn read(&self, hit: GuardMatch, r: &mut Resolver<'_>, receiver: &Value) -> JsResult<Value> {
        match &self.action {
            EntryAction::Present(descriptor) | EntryAction::Accessor(descriptor) => {
                let slot = r.heap.read_slot(holder(hit), descriptor);
                r.slot_value(slot, receiver)
            }
            EntryAction::Absent => Ok(Value::Undefined),
            EntryAction::Continue => r.read_from(hit.next, receiver, &self.key),
            EntryAction::Adapter | EntryAction::Proxy | EntryAction::Unspecialized => {
                r.read_exotic(holder(hit), receiver, &self.key)
            }
            EntryAction::Dictionary => r.read_from(Some(holder(hit)), receiver, &self.key),
            EntryAction::Foreign => match receiver {
                Value::Foreign(foreign) => r.host.foreign_read(*foreign, &self.key),
                _ => unreachable!("foreign entry matched {}", receiver.type_of()),
            },
            EntryAction::StringLength => match receiver {
                Value::String(s) => Ok(string_length(s)),
                _ => unreachable!("string length entry matched {}", receiver.type_of()),
            },
            EntryAction::StringIndex => r.read(receiver, &self.key),
        }
    }

    pub(crate) fn has(
        &self,
        hit: GuardMatch,
        r: &mut Resolver<'_>,
        receiver: &Value,
        own_only: bool,
    ) -> JsResult<bool> {
        match &self.action {
            EntryAction::Present(_) | EntryAction::Accessor(_) | EntryAction::StringLength => Ok(true),
            EntryAction::Absent => Ok(false),
            EntryAction::Continue => r.has_from(hit.next, &self.key, own_only),
            EntryAction::Adapter | EntryAction::Proxy | EntryAction::Unspecialized => {
                r.has_exotic(holder(hit), &self.key, own_only)
            }
            EntryAction::Dictionary => r.has_from(Some(holder(hit)), &self.key, own_only),
            EntryAction::Foreign => match receiver {
                Value::Foreign(foreign) => r.host.foreign_has(*foreign, &self.key),
                _ => unreachable!("foreign entry matched {}", receiver.type_of()),
            },
            EntryAction::StringIndex => r.has(receiver, &self.key, own_only),
        }
    }
}

fn holder(hit: GuardMatch) -> ObjectId {
    match hit.holder {
        Some(holder) => holder,
        None => unreachable!("entry requires a holder but its guard located none"),
    }
}

fn derive_guarded(
    heap: &ObjectHeap,
    intrinsics: &Intrinsics,
    receiver: &Value,
    key: &PropertyKey,
    mode: LookupMode,
) -> (ReceiverGuard, EntryAction) {
    if let Some(kind) = receiver.primitive_kind() {
        if matches!(receiver, Value::String(_)) {
            let action = if is_length(key) {
                Some(EntryAction::StringLength)
            } else if array_index(key).is_some() {
                Some(EntryAction::StringIndex)
            } else {
                None
            };
            if let Some(action) = action {
                let guard = ReceiverGuard::Primitive {
                    kind,
                    shapes: ShapePath::new(),
                };
                return (guard, action);
            }
        }
        let (shapes, action) = match intrinsics.prototype_for(kind) {
            Some(prototype) if !mode.own_only() => {
                from_walk(heap.walk_prototype_chain(prototype, key, false))
            }
            _ => (ShapePath::new(), EntryAction::Absent),
        };
        return (ReceiverGuard::Primitive { kind, shapes }, action);
    }
    match receiver {
        Value::Foreign(_) => (ReceiverGuard::Foreign, EntryAction::Foreign),
        Value::Object(id) => match heap.class_of(*id) {
            ObjectClass::Adapter => (ReceiverGuard::Class(ObjectClass::Adapter), EntryAction::Adapter),
            ObjectClass::Proxy => (ReceiverGuard::Class(ObjectClass::Proxy), EntryAction::Proxy),
            ObjectClass::ModuleNamespace => (
                ReceiverGuard::Class(ObjectClass::ModuleNamespace),
                EntryAction::Unspecialized,
            ),
            ObjectClass::Ordinary if heap.is_dictionary(*id) => {
                (ReceiverGuard::Dictionary, EntryAction::Dictionary)
            }
            ObjectClass::Ordinary => {
                let (shapes, action) = from_walk(heap.walk_prototype_chain(*id, key, mode.own_only()));
                (ReceiverGuard::Shapes(shapes), action)
            }
        },
        _ => unreachable!("cache entry derived for {} receiver", receiver.type_of()),
    }
}

fn from_walk(walk: ChainWalk) -> (ShapePath, EntryAction) {
    let shapes: ShapePath = walk.shapes().cloned().collect();
    let action = match walk.stop {
        WalkStop::Found { descriptor, .. } if descriptor.is_accessor() => EntryAction::Accessor(descriptor),
        WalkStop::Found { descriptor, .. } => EntryAction::Present(descriptor),
        WalkStop::Absent => EntryAction::Absent,
        WalkStop::Exotic { .. } | WalkStop::Dictionary { .. } => EntryAction::Continue,
    };
    (shapes, action)
}

impl fmt::Display for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}) if {}", self.action.name(), self.key, self.guard)
    }
}
