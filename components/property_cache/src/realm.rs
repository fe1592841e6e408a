//! Realm objects the caches need to resolve primitive receivers.

use core_types::{ObjectId, PrimitiveKind};

/// Prototype objects of the current realm.
///
/// Passed explicitly to the caches instead of being looked up through
/// global state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intrinsics {
    /// `Object.prototype`, the prototype of literals and default instances
    pub object_prototype: Option<ObjectId>,
    /// `String.prototype`
    pub string_prototype: Option<ObjectId>,
    /// `Number.prototype`
    pub number_prototype: Option<ObjectId>,
    /// `Boolean.prototype`
    pub boolean_prototype: Option<ObjectId>,
    /// `Symbol.prototype`
    pub symbol_prototype: Option<ObjectId>,
    /// `BigInt.prototype`
    pub bigint_prototype: Option<ObjectId>,
}

impl Intrinsics {
    /// Prototype that property lookups on a primitive of `kind` start at.
    pub fn prototype_for(&self, kind: PrimitiveKind) -> Option<ObjectId> {
        match kind {
            PrimitiveKind::String => self.string_prototype,
            PrimitiveKind::Number => self.number_prototype,
            PrimitiveKind::Boolean => self.boolean_prototype,
            PrimitiveKind::Symbol => self.symbol_prototype,
            PrimitiveKind::BigInt => self.bigint_prototype,
        }
    }
}
