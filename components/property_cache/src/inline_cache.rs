//! Inline cache chains for property access sites
//!
//! Provides mono/poly/megamorphic chain states and the publish cell that
//! lets concurrently executing code share one site's chain.

use arrayvec::ArrayVec;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Hard upper bound on entries in one chain.
pub const MAX_POLYMORPHIC_ENTRIES: usize = 16;

/// Observable state of an access site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheState {
    /// Nothing cached yet
    Uninitialized,
    /// One guarded entry
    Monomorphic,
    /// Several guarded entries, tried in order
    Polymorphic,
    /// Generic, uncached lookups only
    Megamorphic,
}

/// Guarded entries of one access site.
///
/// A chain is an immutable snapshot: growing, pruning and degrading all
/// return a new chain, which the site then publishes through its
/// [`PublishCell`].
#[derive(Debug, Clone, PartialEq)]
pub enum InlineCache<E> {
    /// No entry installed yet
    Uninitialized,
    /// Single entry (most common case)
    Monomorphic(E),
    /// Two or more entries, oldest first
    Polymorphic(ArrayVec<E, MAX_POLYMORPHIC_ENTRIES>),
    /// Too many receiver kinds; terminal
    Megamorphic,
}

impl<E> InlineCache<E> {
    /// Create a new uninitialized chain
    pub fn new() -> Self {
        InlineCache::Uninitialized
    }

    /// Entries in lookup order.
    pub fn entries(&self) -> &[E] {
        match self {
            InlineCache::Uninitialized | InlineCache::Megamorphic => &[],
            InlineCache::Monomorphic(entry) => std::slice::from_ref(entry),
            InlineCache::Polymorphic(entries) => entries,
        }
    }

    /// State of this chain.
    pub fn state(&self) -> CacheState {
        match self {
            InlineCache::Uninitialized => CacheState::Uninitialized,
            InlineCache::Monomorphic(_) => CacheState::Monomorphic,
            InlineCache::Polymorphic(_) => CacheState::Polymorphic,
            InlineCache::Megamorphic => CacheState::Megamorphic,
        }
    }

    /// Returns true once the chain has degraded to generic lookups.
    pub fn is_megamorphic(&self) -> bool {
        matches!(self, InlineCache::Megamorphic)
    }
}

impl<E: Clone> InlineCache<E> {
    /// Chain with `entry` appended.
    ///
    /// Transitions chain state as needed:
    /// - Uninitialized → Monomorphic
    /// - Monomorphic → Polymorphic
    /// - full chain (`limit` entries) → Megamorphic, which never grows again
    pub fn with_entry(&self, entry: E, limit: usize) -> Self {
        let limit = limit.clamp(1, MAX_POLYMORPHIC_ENTRIES);
        match self {
            InlineCache::Megamorphic => InlineCache::Megamorphic,
            _ if self.entries().len() >= limit => InlineCache::Megamorphic,
            InlineCache::Uninitialized => InlineCache::Monomorphic(entry),
            _ => Self::from_entries(self.entries().iter().cloned().chain(Some(entry))),
        }
    }

    /// Chain keeping only the entries accepted by `keep`, in order.
    pub fn retain(&self, mut keep: impl FnMut(&E) -> bool) -> Self {
        match self {
            InlineCache::Megamorphic => InlineCache::Megamorphic,
            _ => Self::from_entries(self.entries().iter().filter(|e| keep(*e)).cloned()),
        }
    }

    fn from_entries(entries: impl IntoIterator<Item = E>) -> Self {
        let mut entries: ArrayVec<E, MAX_POLYMORPHIC_ENTRIES> = entries.into_iter().collect();
        match entries.len() {
            0 => InlineCache::Uninitialized,
            1 => match entries.pop() {
                Some(entry) => InlineCache::Monomorphic(entry),
                None => InlineCache::Uninitialized,
            },
            _ => InlineCache::Polymorphic(entries),
        }
    }
}

impl<E> Default for InlineCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: fmt::Display> fmt::Display for InlineCache<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.state())?;
        if self.is_megamorphic() {
            return Ok(());
        }
        write!(f, "[")?;
        for (i, entry) in self.entries().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", entry)?;
        }
        write!(f, "]")
    }
}

/// Versioned, atomically replaced snapshot.
///
/// Readers take the current snapshot without blocking writers for longer
/// than an `Arc` clone. Writers publish a replacement computed from the
/// version they read; if another writer got there first the replacement
/// is dropped and the caller serves its result uncached.
#[derive(Debug)]
pub struct PublishCell<T> {
    current: RwLock<(u64, Arc<T>)>,
}

impl<T> PublishCell<T> {
    /// Cell holding `value` at version 0.
    pub fn new(value: T) -> Self {
        PublishCell {
            current: RwLock::new((0, Arc::new(value))),
        }
    }

    /// Current version and snapshot.
    pub fn snapshot(&self) -> (u64, Arc<T>) {
        let current = self.current.read();
        (current.0, Arc::clone(&current.1))
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.current.read().1)
    }

    /// Replaces the snapshot if it is still at `expected`.
    ///
    /// Returns false (and drops `value`) if another publish won.
    pub fn publish(&self, expected: u64, value: T) -> bool {
        let mut current = self.current.write();
        if current.0 != expected {
            return false;
        }
        *current = (expected + 1, Arc::new(value));
        true
    }
}

impl<T: Default> Default for PublishCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
