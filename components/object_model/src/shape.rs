//! Shape system for JavaScript object layouts.
//!
//! Objects with the same properties, added in the same order with the same
//! attributes, share a [`Shape`]. Shapes are immutable once published and
//! form a transition graph: every shape remembers the children derived from
//! it, keyed by the transition that produced them, so repeating the same
//! sequence of property additions from the same root always yields the
//! identical shape object.
//!
//! Shapes live in a [`ShapeTree`] arena and refer to each other by
//! [`ShapeId`]. The per-shape transition table is the only mutable shared
//! state; it supports concurrent reads and an idempotent insert-if-absent, so
//! threads racing to create the same transition converge on one child.
//!
//! # Example
//!
//! ```
//! use object_model::{Layout, PropertyFlags, Representation, ShapeTree};
//!
//! let tree = ShapeTree::default();
//! let empty = tree.empty(Layout::ordinary(None));
//! let a = tree.with_added_property(&empty, "x".into(), PropertyFlags::default(), Representation::Int);
//! let b = tree.with_added_property(&a, "y".into(), PropertyFlags::default(), Representation::Int);
//!
//! let a2 = tree.with_added_property(&empty, "x".into(), PropertyFlags::default(), Representation::Int);
//! let b2 = tree.with_added_property(&a2, "y".into(), PropertyFlags::default(), Representation::Int);
//! assert!(b.check(&b2));
//! ```

use crate::assumption::Assumption;
use crate::property::{Location, PropertyDescriptor, PropertyFlags, Representation};
use core_types::{ObjectId, PropertyKey};
use crossbeam::atomic::AtomicCell;
use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::fmt;
use std::sync::Arc;

/// Inline slots handed out per shape lineage before properties fall back to
/// dynamic-map locations.
pub const DEFAULT_MAX_INLINE_SLOTS: u32 = 8;

/// Handle of a shape inside its [`ShapeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u32);

/// Behavioral class of an object.
///
/// Only ordinary objects resolve properties through their shape; the other
/// classes intercept property resolution and are guarded by class identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    /// Plain object
    Ordinary,
    /// Adapter object whose property resolution is delegated to user traps
    Adapter,
    /// Proxy object
    Proxy,
    /// Module namespace object (own lookups are never specialized)
    ModuleNamespace,
}

/// Layout kind of a shape root: object class plus prototype.
///
/// The prototype is part of the layout, so a shape check on a receiver also
/// pins down which object its prototype is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    /// Object class
    pub class: ObjectClass,
    /// Prototype object, if any
    pub prototype: Option<ObjectId>,
}

impl Layout {
    /// Layout of an ordinary object with the given prototype.
    pub fn ordinary(prototype: Option<ObjectId>) -> Self {
        Layout {
            class: ObjectClass::Ordinary,
            prototype,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Transition {
    Add {
        key: PropertyKey,
        flags: PropertyFlags,
    },
    Remove(PropertyKey),
    Attributes {
        key: PropertyKey,
        flags: PropertyFlags,
    },
    Generalize {
        key: PropertyKey,
        representation: Representation,
    },
    Prototype(Option<ObjectId>),
    PreventExtensions,
}

type PropertyMap = IndexMap<PropertyKey, PropertyDescriptor, FxBuildHasher>;

/// Immutable descriptor of an object's property layout.
pub struct Shape {
    id: ShapeId,
    layout: Layout,
    parent: Option<ShapeId>,
    extensible: bool,
    /// Insertion-ordered, with O(1) lookup.
    properties: PropertyMap,
    /// Next inline slot to hand out; never decreases along a lineage.
    next_inline_slot: u32,
    transitions: RwLock<FxHashMap<Transition, ShapeId>>,
    validity: Arc<Assumption>,
    /// Set before `validity` is invalidated.
    successor: AtomicCell<Option<ShapeId>>,
}

impl Shape {
    fn root(id: ShapeId, layout: Layout) -> Self {
        Shape {
            id,
            layout,
            parent: None,
            extensible: true,
            properties: PropertyMap::default(),
            next_inline_slot: 0,
            transitions: RwLock::new(FxHashMap::default()),
            validity: Assumption::new(format!("shape#{} not obsolete", id.0)),
            successor: AtomicCell::new(None),
        }
    }

    fn derived(id: ShapeId, parent: &Shape, properties: PropertyMap, next_inline_slot: u32) -> Self {
        Shape {
            id,
            layout: parent.layout,
            parent: Some(parent.id),
            extensible: parent.extensible,
            properties,
            next_inline_slot,
            transitions: RwLock::new(FxHashMap::default()),
            validity: Assumption::new(format!("shape#{} not obsolete", id.0)),
            successor: AtomicCell::new(None),
        }
    }

    /// Handle of this shape.
    #[inline]
    pub fn id(&self) -> ShapeId {
        self.id
    }

    /// Layout kind (class and prototype).
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Object class of objects with this shape.
    #[inline]
    pub fn class(&self) -> ObjectClass {
        self.layout.class
    }

    /// Prototype of objects with this shape.
    #[inline]
    pub fn prototype(&self) -> Option<ObjectId> {
        self.layout.prototype
    }

    /// Parent in the transition graph; `None` for roots.
    pub fn parent(&self) -> Option<ShapeId> {
        self.parent
    }

    /// Whether objects with this shape accept new properties.
    pub fn is_extensible(&self) -> bool {
        self.extensible
    }

    /// Looks up a property by key. Never fails; absent keys yield `None`.
    #[inline]
    pub fn lookup(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        self.properties.get(key)
    }

    /// Properties in insertion order.
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.values()
    }

    /// Number of properties.
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Most recently added property.
    pub fn last_property(&self) -> Option<&PropertyDescriptor> {
        self.properties.last().map(|(_, descriptor)| descriptor)
    }

    /// Number of inline slots objects of this shape must provide.
    pub fn inline_slot_count(&self) -> u32 {
        self.next_inline_slot
    }

    /// Validity token of this shape.
    pub fn validity(&self) -> &Arc<Assumption> {
        &self.validity
    }

    /// False once the shape has been superseded.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.validity.is_valid()
    }

    /// True once the shape has been superseded.
    #[inline]
    pub fn is_obsolete(&self) -> bool {
        !self.is_valid()
    }

    /// Shape that superseded this one, if it is obsolete.
    pub fn successor(&self) -> Option<ShapeId> {
        self.successor.load()
    }

    /// Guard primitive: true iff `candidate` is this exact shape object.
    #[inline]
    pub fn check(&self, candidate: &Shape) -> bool {
        std::ptr::eq(self, candidate)
    }

    /// Number of cached child transitions.
    pub fn transition_count(&self) -> usize {
        self.transitions.read().len()
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("id", &self.id.0)
            .field("layout", &self.layout)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("obsolete", &self.is_obsolete())
            .finish()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape#{}{{", self.id.0)?;
        for (i, key) in self.properties.keys().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", key)?;
        }
        f.write_str("}")
    }
}

/// Arena owning every shape and the transition edges between them.
pub struct ShapeTree {
    nodes: RwLock<Vec<Arc<Shape>>>,
    roots: RwLock<FxHashMap<Layout, ShapeId>>,
    max_inline_slots: u32,
}

impl ShapeTree {
    /// Creates an empty arena handing out at most `max_inline_slots` inline
    /// slots per lineage.
    pub fn new(max_inline_slots: u32) -> Self {
        ShapeTree {
            nodes: RwLock::new(Vec::new()),
            roots: RwLock::new(FxHashMap::default()),
            max_inline_slots,
        }
    }

    /// Inline slot limit of this arena.
    pub fn max_inline_slots(&self) -> u32 {
        self.max_inline_slots
    }

    /// Number of shapes created so far.
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// Returns true if no shape has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves a handle.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree.
    pub fn get(&self, id: ShapeId) -> Arc<Shape> {
        let nodes = self.nodes.read();
        match nodes.get(id.0 as usize) {
            Some(shape) => Arc::clone(shape),
            None => panic!("shape#{} does not belong to this tree", id.0),
        }
    }

    /// Follows successor links until reaching a shape that is not obsolete.
    pub fn current(&self, shape: &Arc<Shape>) -> Arc<Shape> {
        let mut current = Arc::clone(shape);
        while let Some(next) = current.successor() {
            current = self.get(next);
        }
        current
    }

    /// Root shape with no properties for `layout`.
    pub fn empty(&self, layout: Layout) -> Arc<Shape> {
        let existing = self.roots.read().get(&layout).copied();
        if let Some(id) = existing {
            return self.get(id);
        }
        let mut roots = self.roots.write();
        if let Some(&id) = roots.get(&layout) {
            drop(roots);
            return self.get(id);
        }
        let shape = self.push(|id| Shape::root(id, layout));
        roots.insert(layout, shape.id);
        shape
    }

    /// Shape with `key` appended.
    ///
    /// Returns the cached child if this exact transition was taken before.
    /// If that child's location was specialized for a narrower
    /// representation, the child is generalized (and becomes obsolete).
    /// Never mutates `shape`. When the lineage has used up its inline slots,
    /// the property gets a dynamic-map location instead.
    ///
    /// # Panics
    ///
    /// Panics if `key` is already present.
    pub fn with_added_property(
        &self,
        shape: &Arc<Shape>,
        key: PropertyKey,
        flags: PropertyFlags,
        representation: Representation,
    ) -> Arc<Shape> {
        let shape = self.current(shape);
        assert!(
            shape.lookup(&key).is_none(),
            "property {} already present in {}",
            key,
            shape
        );
        let representation = if flags.is_accessor() {
            Representation::Tagged
        } else {
            representation
        };
        let transition = Transition::Add {
            key: key.clone(),
            flags,
        };
        let max_inline_slots = self.max_inline_slots;
        let lookup_key = key.clone();
        let child = self.transition(&shape, transition, |id| {
            let mut properties = shape.properties.clone();
            let mut next_inline_slot = shape.next_inline_slot;
            let location = if next_inline_slot < max_inline_slots {
                next_inline_slot += 1;
                Location::Inline(next_inline_slot - 1)
            } else {
                Location::Dynamic
            };
            properties.insert(
                key.clone(),
                PropertyDescriptor {
                    key,
                    location,
                    representation,
                    flags,
                },
            );
            Shape::derived(id, &shape, properties, next_inline_slot)
        });
        // An earlier add of the same key may have picked a narrower
        // representation; widen that child instead of forking a sibling.
        self.with_replaced_property(&child, &lookup_key, representation)
    }

    /// Shape whose `key` location is widened to hold `representation`.
    ///
    /// If the existing representation already covers it, `shape` itself is
    /// returned. Otherwise the generalized child keeps every location, and
    /// `shape` becomes obsolete: its validity token is invalidated and its
    /// objects migrate forward to the child. Shapes derived from `shape`
    /// become obsolete as well; their successors are rebuilt on top of the
    /// child by replaying the same transitions, so a later add sequence
    /// through the child lands on those very successors.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not present.
    pub fn with_replaced_property(
        &self,
        shape: &Arc<Shape>,
        key: &PropertyKey,
        representation: Representation,
    ) -> Arc<Shape> {
        let shape = self.current(shape);
        let existing = match shape.lookup(key) {
            Some(descriptor) => descriptor.representation,
            None => panic!("cannot generalize missing property {} in {}", key, shape),
        };
        let widened = existing.generalize(representation);
        if widened == existing {
            return shape;
        }
        let transition = Transition::Generalize {
            key: key.clone(),
            representation: widened,
        };
        let child = self.transition(&shape, transition, |id| {
            let mut properties = shape.properties.clone();
            if let Some(descriptor) = properties.get_mut(key) {
                descriptor.representation = widened;
            }
            Shape::derived(id, &shape, properties, shape.next_inline_slot)
        });
        self.obsolete(&shape, &child);
        self.current(&child)
    }

    /// Shape without `key`. The removed location is never handed out again
    /// in this lineage.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not present.
    pub fn with_removed_property(&self, shape: &Arc<Shape>, key: &PropertyKey) -> Arc<Shape> {
        let shape = self.current(shape);
        assert!(
            shape.lookup(key).is_some(),
            "cannot remove missing property {} from {}",
            key,
            shape
        );
        self.transition(&shape, Transition::Remove(key.clone()), |id| {
            let mut properties = shape.properties.clone();
            properties.shift_remove(key);
            Shape::derived(id, &shape, properties, shape.next_inline_slot)
        })
    }

    /// Shape with the attributes of `key` replaced by `flags`, keeping its
    /// location. Switching between data and accessor widens the location to
    /// `Tagged`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not present.
    pub fn with_changed_attributes(
        &self,
        shape: &Arc<Shape>,
        key: &PropertyKey,
        flags: PropertyFlags,
    ) -> Arc<Shape> {
        let shape = self.current(shape);
        let current = match shape.lookup(key) {
            Some(descriptor) => descriptor.flags,
            None => panic!("cannot reconfigure missing property {} in {}", key, shape),
        };
        if current == flags {
            return shape;
        }
        let kind_changed = current.is_accessor() != flags.is_accessor();
        let transition = Transition::Attributes {
            key: key.clone(),
            flags,
        };
        self.transition(&shape, transition, |id| {
            let mut properties = shape.properties.clone();
            if let Some(descriptor) = properties.get_mut(key) {
                descriptor.flags = flags;
                if kind_changed {
                    descriptor.representation = Representation::Tagged;
                }
            }
            Shape::derived(id, &shape, properties, shape.next_inline_slot)
        })
    }

    /// Shape with the same properties and a different prototype.
    pub fn with_prototype(&self, shape: &Arc<Shape>, prototype: Option<ObjectId>) -> Arc<Shape> {
        let shape = self.current(shape);
        if shape.prototype() == prototype {
            return shape;
        }
        self.transition(&shape, Transition::Prototype(prototype), |id| {
            let mut child = Shape::derived(id, &shape, shape.properties.clone(), shape.next_inline_slot);
            child.layout.prototype = prototype;
            child
        })
    }

    /// Shape that rejects new properties.
    pub fn without_extensions(&self, shape: &Arc<Shape>) -> Arc<Shape> {
        let shape = self.current(shape);
        if !shape.extensible {
            return shape;
        }
        self.transition(&shape, Transition::PreventExtensions, |id| {
            let mut child = Shape::derived(id, &shape, shape.properties.clone(), shape.next_inline_slot);
            child.extensible = false;
            child
        })
    }

    fn transition(
        &self,
        parent: &Arc<Shape>,
        transition: Transition,
        build: impl FnOnce(ShapeId) -> Shape,
    ) -> Arc<Shape> {
        let existing = parent.transitions.read().get(&transition).copied();
        if let Some(id) = existing {
            return self.current(&self.get(id));
        }
        let mut edges = parent.transitions.write();
        if let Some(&id) = edges.get(&transition) {
            drop(edges);
            return self.current(&self.get(id));
        }
        let child = self.push(build);
        edges.insert(transition.clone(), child.id);
        drop(edges);
        // The parent went obsolete while the edge was being created.
        if let Some(successor) = parent.successor() {
            let replayed = self.replay(&self.get(successor), &transition, &child);
            self.obsolete(&child, &replayed);
            return self.current(&child);
        }
        child
    }

    /// Applies `transition` to `parent`, taking representations from
    /// `original`, the shape the same transition produced elsewhere.
    fn replay(&self, parent: &Arc<Shape>, transition: &Transition, original: &Shape) -> Arc<Shape> {
        match transition {
            Transition::Add { key, flags } => {
                let representation = original
                    .lookup(key)
                    .map_or(Representation::Tagged, |descriptor| descriptor.representation);
                self.with_added_property(parent, key.clone(), *flags, representation)
            }
            Transition::Remove(key) => self.with_removed_property(parent, key),
            Transition::Attributes { key, flags } => self.with_changed_attributes(parent, key, *flags),
            Transition::Generalize {
                key,
                representation,
            } => self.with_replaced_property(parent, key, *representation),
            Transition::Prototype(prototype) => self.with_prototype(parent, *prototype),
            Transition::PreventExtensions => self.without_extensions(parent),
        }
    }

    fn push(&self, build: impl FnOnce(ShapeId) -> Shape) -> Arc<Shape> {
        let mut nodes = self.nodes.write();
        let id = ShapeId(nodes.len() as u32);
        let shape = Arc::new(build(id));
        nodes.push(Arc::clone(&shape));
        shape
    }

    fn obsolete(&self, shape: &Shape, successor: &Arc<Shape>) {
        {
            // Held so that an edge inserted concurrently is either seen by
            // `forward_descendants` or sees the successor itself.
            let _edges = shape.transitions.write();
            // The first successor wins; `current` stays acyclic.
            let _ = shape.successor.compare_exchange(None, Some(successor.id));
            if !shape.validity.invalidate() {
                return;
            }
        }
        log::debug!("{} obsoleted, objects migrate to {}", shape, successor);
        self.forward_descendants(shape, successor);
    }

    /// Rebuilds every shape derived from the obsolete `old` on top of `new`
    /// and obsoletes the originals in favor of the rebuilt shapes.
    fn forward_descendants(&self, old: &Shape, new: &Arc<Shape>) {
        let edges: Vec<(Transition, ShapeId)> = old
            .transitions
            .read()
            .iter()
            .map(|(transition, id)| (transition.clone(), *id))
            .collect();
        for (transition, child_id) in edges {
            if child_id == new.id {
                continue;
            }
            let child = self.get(child_id);
            let replayed = self.replay(new, &transition, &child);
            if child.check(&replayed) {
                continue;
            }
            if child.is_valid() {
                self.obsolete(&child, &replayed);
            } else {
                // Already superseded; only its descendants need rebuilding.
                self.forward_descendants(&child, &replayed);
            }
        }
    }
}

impl Default for ShapeTree {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INLINE_SLOTS)
    }
}

impl fmt::Debug for ShapeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeTree")
            .field("shapes", &self.len())
            .field("max_inline_slots", &self.max_inline_slots)
            .finish()
    }
}
