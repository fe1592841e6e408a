//! Receiver guards.
//!
//! A guard decides, without side effects, whether a cache entry applies to
//! a receiver. Shaped receivers are guarded by shape identity along the
//! whole path the entry depends on; receivers whose properties a shape
//! cannot describe are guarded by class or type instead.

use core_types::{ObjectId, PrimitiveKind, Value};
use object_model::{ObjectClass, ObjectHeap, Shape};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

use crate::realm::Intrinsics;

/// Shapes along a prototype path, nearest first.
pub type ShapePath = SmallVec<[Arc<Shape>; 4]>;

/// Guard of one cache entry.
#[derive(Debug, Clone)]
pub enum ReceiverGuard {
    /// Ordinary receiver whose shape, and the shapes of the prototypes
    /// after it, are exactly these
    Shapes(ShapePath),
    /// Primitive of `kind`; `shapes` start at the realm prototype for `kind`
    Primitive {
        /// Primitive type
        kind: PrimitiveKind,
        /// Shapes from the wrapper prototype on
        shapes: ShapePath,
    },
    /// Object of an exotic class
    Class(ObjectClass),
    /// Ordinary object in dictionary mode
    Dictionary,
    /// Foreign value
    Foreign,
}

/// Objects located while checking a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardMatch {
    /// Object matched by the last shape, or the receiver for class and
    /// dictionary guards
    pub holder: Option<ObjectId>,
    /// Prototype after the guarded path
    pub next: Option<ObjectId>,
}

impl ReceiverGuard {
    /// Returns false once any guarded shape has become obsolete.
    pub fn is_valid(&self) -> bool {
        match self {
            ReceiverGuard::Shapes(shapes) | ReceiverGuard::Primitive { shapes, .. } => {
                shapes.iter().all(|shape| shape.is_valid())
            }
            ReceiverGuard::Class(_) | ReceiverGuard::Dictionary | ReceiverGuard::Foreign => true,
        }
    }

    /// Shapes this guard depends on.
    pub fn shapes(&self) -> &[Arc<Shape>] {
        match self {
            ReceiverGuard::Shapes(shapes) | ReceiverGuard::Primitive { shapes, .. } => shapes,
            ReceiverGuard::Class(_) | ReceiverGuard::Dictionary | ReceiverGuard::Foreign => &[],
        }
    }

    /// Checks `receiver`; never mutates anything.
    pub fn matches(&self, heap: &ObjectHeap, intrinsics: &Intrinsics, receiver: &Value) -> Option<GuardMatch> {
        match self {
            ReceiverGuard::Shapes(shapes) => match receiver {
                Value::Object(id) => match_path(heap, Some(*id), shapes),
                _ => None,
            },
            ReceiverGuard::Primitive { kind, shapes } => {
                if receiver.primitive_kind() != Some(*kind) {
                    return None;
                }
                match_path(heap, intrinsics.prototype_for(*kind), shapes)
            }
            ReceiverGuard::Class(class) => match receiver {
                Value::Object(id) if heap.class_of(*id) == *class => Some(GuardMatch {
                    holder: Some(*id),
                    next: None,
                }),
                _ => None,
            },
            ReceiverGuard::Dictionary => match receiver {
                Value::Object(id)
                    if heap.class_of(*id) == ObjectClass::Ordinary && heap.is_dictionary(*id) =>
                {
                    Some(GuardMatch {
                        holder: Some(*id),
                        next: None,
                    })
                }
                _ => None,
            },
            ReceiverGuard::Foreign => match receiver {
                Value::Foreign(_) => Some(GuardMatch {
                    holder: None,
                    next: None,
                }),
                _ => None,
            },
        }
    }
}

fn match_path(heap: &ObjectHeap, start: Option<ObjectId>, shapes: &[Arc<Shape>]) -> Option<GuardMatch> {
    let mut cursor = start;
    let mut holder = None;
    for expected in shapes {
        let id = cursor?;
        let actual = heap.shape_of(id)?;
        if !expected.check(&actual) {
            return None;
        }
        holder = Some(id);
        cursor = expected.prototype();
    }
    Some(GuardMatch {
        holder,
        next: cursor,
    })
}

impl fmt::Display for ReceiverGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiverGuard::Shapes(shapes) => write_path(f, "shapes", shapes),
            ReceiverGuard::Primitive { kind, shapes } => write_path(f, &format!("{:?}", kind), shapes),
            ReceiverGuard::Class(class) => write!(f, "class {:?}", class),
            ReceiverGuard::Dictionary => write!(f, "dictionary"),
            ReceiverGuard::Foreign => write!(f, "foreign"),
        }
    }
}

fn write_path(f: &mut fmt::Formatter<'_>, label: &str, shapes: &[Arc<Shape>]) -> fmt::Result {
    write!(f, "{}(", label)?;
    for (i, shape) in shapes.iter().enumerate() {
        if i > 0 {
            write!(f, " > ")?;
        }
        write!(f, "#{}", shape.id().0)?;
    }
    write!(f, ")")
}
