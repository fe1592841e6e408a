//! Prototype-chain walk used by cache misses.
//!
//! The walk records the shape of every ordinary object it passes, so a
//! cache entry can later re-validate the whole chain with pointer checks.
//! It stops at the first object whose behavior a shape cannot describe:
//! exotic classes and dictionary-mode objects.

use crate::heap::ObjectHeap;
use crate::property::PropertyDescriptor;
use crate::shape::{ObjectClass, Shape};
use core_types::{ObjectId, PropertyKey};
use smallvec::SmallVec;
use std::sync::Arc;

/// Why a prototype-chain walk ended.
#[derive(Debug, Clone, PartialEq)]
pub enum WalkStop {
    /// `holder`, the last object on the path, has the property
    Found {
        /// Object holding the property
        holder: ObjectId,
        /// Its descriptor in the holder's shape
        descriptor: PropertyDescriptor,
    },
    /// No object on the path has the property and the walk is over
    Absent,
    /// `holder` has a class with its own property semantics
    Exotic {
        /// First non-ordinary object
        holder: ObjectId,
        /// Its class
        class: ObjectClass,
    },
    /// `holder` stores its properties in dictionary mode
    Dictionary {
        /// First dictionary-mode object
        holder: ObjectId,
    },
}

/// Result of [`ObjectHeap::walk_prototype_chain`].
#[derive(Debug, Clone)]
pub struct ChainWalk {
    /// Ordinary, shaped objects visited, receiver first
    pub path: SmallVec<[(ObjectId, Arc<Shape>); 4]>,
    /// Stop reason
    pub stop: WalkStop,
}

impl ChainWalk {
    /// Prototype hops from the receiver to the holder.
    pub fn depth(&self) -> usize {
        match self.stop {
            WalkStop::Found { .. } => self.path.len() - 1,
            _ => self.path.len(),
        }
    }

    /// Object the walk stopped at; `None` when the chain ended.
    pub fn holder(&self) -> Option<ObjectId> {
        match self.stop {
            WalkStop::Found { holder, .. }
            | WalkStop::Exotic { holder, .. }
            | WalkStop::Dictionary { holder } => Some(holder),
            WalkStop::Absent => None,
        }
    }

    /// Shapes along the path, receiver first.
    pub fn shapes(&self) -> impl Iterator<Item = &Arc<Shape>> {
        self.path.iter().map(|(_, shape)| shape)
    }
}

impl ObjectHeap {
    /// Walks from `start` toward the end of its prototype chain looking for
    /// `key`. With `own_only`, only `start` itself is inspected.
    ///
    /// Shapes are reported in their current (non-obsolete) form.
    pub fn walk_prototype_chain(&self, start: ObjectId, key: &PropertyKey, own_only: bool) -> ChainWalk {
        let mut path = SmallVec::new();
        let mut cursor = start;
        loop {
            let object = self.get(cursor);
            if object.class != ObjectClass::Ordinary {
                return ChainWalk {
                    path,
                    stop: WalkStop::Exotic {
                        holder: cursor,
                        class: object.class,
                    },
                };
            }
            let Some(shape) = self.shape_of(cursor) else {
                return ChainWalk {
                    path,
                    stop: WalkStop::Dictionary { holder: cursor },
                };
            };
            let found = shape.lookup(key).cloned();
            let prototype = shape.prototype();
            path.push((cursor, shape));
            if let Some(descriptor) = found {
                return ChainWalk {
                    path,
                    stop: WalkStop::Found {
                        holder: cursor,
                        descriptor,
                    },
                };
            }
            match prototype {
                Some(next) if !own_only => cursor = next,
                _ => {
                    return ChainWalk {
                        path,
                        stop: WalkStop::Absent,
                    }
                }
            }
        }
    }
}
