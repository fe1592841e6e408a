//! Object Model - shapes, property layouts and object storage
//!
//! This component provides:
//! - Property descriptors with storage locations and value representations
//! - Validity tokens ([`Assumption`]) for detecting obsolete shapes
//! - A shared shape transition graph ([`ShapeTree`]) addressed by handle
//! - Object storage ([`ObjectHeap`]) addressable by property descriptor
//! - The prototype-chain walker used by cache misses

pub mod assumption;
pub mod heap;
pub mod lookup;
pub mod object;
pub mod property;
pub mod shape;

// Re-export main types
pub use assumption::{Assumption, InvalidAssumption};
pub use heap::{HeapConfig, ObjectHeap, OwnProperty};
pub use lookup::{ChainWalk, WalkStop};
pub use object::{Accessor, InternalSlots, JsObject, ObjectStorage, Slot};
pub use property::{Location, PropertyDescriptor, PropertyFlags, Representation};
pub use shape::{Layout, ObjectClass, Shape, ShapeId, ShapeTree, DEFAULT_MAX_INLINE_SLOTS};
