//! Initial shapes for `new` expressions.

use core_types::{ObjectId, Value};
use object_model::{Layout, ObjectHeap, Shape};
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::inline_cache::CacheState;
use crate::realm::Intrinsics;
use crate::site::{Counters, SiteStats};

/// Prototype → initial shape cache of one construction site.
///
/// Up to `limit` prototypes are remembered; beyond that the shape is
/// computed on every request while the cached prototypes keep hitting.
#[derive(Debug)]
pub struct ConstructShapeCache {
    limit: usize,
    entries: RwLock<SmallVec<[(ObjectId, Arc<Shape>); 8]>>,
    overflowed: AtomicBool,
    counters: Counters,
}

impl ConstructShapeCache {
    /// Creates an empty cache holding at most `limit` prototypes.
    pub fn new(limit: usize) -> Self {
        ConstructShapeCache {
            limit,
            entries: RwLock::new(SmallVec::new()),
            overflowed: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// Initial shape for instances whose prototype is `prototype`.
    ///
    /// Returns `None` if `prototype` is not an object; the caller then
    /// falls back to its default shape.
    pub fn initial_shape(&self, heap: &ObjectHeap, prototype: &Value) -> Option<Arc<Shape>> {
        let Value::Object(prototype) = prototype else {
            return None;
        };
        let cached = self
            .entries
            .read()
            .iter()
            .find(|(p, _)| p == prototype)
            .map(|(_, shape)| Arc::clone(shape));
        if let Some(shape) = cached.filter(|shape| shape.is_valid()) {
            self.counters.hit();
            return Some(shape);
        }

        self.counters.miss();
        let shape = heap.shapes().empty(Layout::ordinary(Some(*prototype)));
        let mut entries = self.entries.write();
        if let Some(entry) = entries.iter_mut().find(|(p, _)| p == prototype) {
            entry.1 = Arc::clone(&shape);
        } else if entries.len() < self.limit {
            entries.push((*prototype, Arc::clone(&shape)));
            log::trace!("cached initial {} for prototype {}", shape, prototype.0);
        } else if !self.overflowed.swap(true, Ordering::Relaxed) {
            log::debug!(
                "construction cache full with {} prototypes, computing initial shapes uncached",
                self.limit
            );
        }
        Some(shape)
    }

    /// Allocates a new ordinary instance for `prototype`.
    ///
    /// Non-object prototypes get the realm's default instance shape, whose
    /// prototype is `Object.prototype`.
    pub fn create_instance(&self, heap: &mut ObjectHeap, intrinsics: &Intrinsics, prototype: &Value) -> ObjectId {
        let shape = match self.initial_shape(heap, prototype) {
            Some(shape) => shape,
            None => heap
                .shapes()
                .empty(Layout::ordinary(intrinsics.object_prototype)),
        };
        heap.allocate_with_shape(shape)
    }

    /// Number of cached prototypes.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no prototype is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `prototype` is cached.
    pub fn contains(&self, prototype: ObjectId) -> bool {
        self.entries.read().iter().any(|(p, _)| *p == prototype)
    }

    /// Megamorphic once a prototype was turned away.
    pub fn state(&self) -> CacheState {
        if self.overflowed.load(Ordering::Relaxed) {
            return CacheState::Megamorphic;
        }
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
}
