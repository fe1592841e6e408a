//! Read and presence-check access sites.

use core_types::{JsResult, PropertyKey, Value};
use object_model::ObjectHeap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::entry::{CacheEntry, LookupMode};
use crate::generic::{has_error, read_error, Resolver};
use crate::guard::GuardMatch;
use crate::host::Host;
use crate::inline_cache::{CacheState, InlineCache, PublishCell};
use crate::realm::Intrinsics;

/// Hit and miss counts of one site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiteStats {
    /// Accesses served by a cached entry
    pub hits: u64,
    /// Accesses that derived a new entry or computed uncached
    pub misses: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counters {
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SiteStats {
        SiteStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Inline cache of one read, `in`, or `hasOwnProperty` site.
///
/// Entries are tried oldest first. A miss appends an entry derived from the
/// current heap state until `limit` entries exist; the next miss turns the
/// site megamorphic for good. Entries whose shapes became obsolete are
/// dropped individually, leaving the rest of the chain warm.
///
/// # Example
///
/// ```
/// use core_types::Value;
/// use object_model::{ObjectHeap, PropertyFlags};
/// use property_cache::{CacheState, Intrinsics, LookupMode, NoHost, PropertySite};
///
/// let mut heap = ObjectHeap::new();
/// let obj = heap.allocate(None);
/// heap.put_data_property(obj, "x".into(), Value::Smi(1), PropertyFlags::default()).unwrap();
///
/// let site = PropertySite::new(LookupMode::Has, 4);
/// let found = site
///     .has(&heap, &mut NoHost, &Intrinsics::default(), &Value::Object(obj), &"x".into())
///     .unwrap();
/// assert!(found);
/// assert_eq!(site.state(), CacheState::Monomorphic);
/// ```
#[derive(Debug)]
pub struct PropertySite {
    mode: LookupMode,
    limit: usize,
    chain: PublishCell<InlineCache<CacheEntry>>,
    counters: Counters,
}

impl PropertySite {
    /// Creates an uninitialized site.
    pub fn new(mode: LookupMode, limit: usize) -> Self {
        PropertySite {
            mode,
            limit,
            chain: PublishCell::default(),
            counters: Counters::default(),
        }
    }

    /// Operation of this site.
    pub fn mode(&self) -> LookupMode {
        self.mode
    }

    /// Current chain state.
    pub fn state(&self) -> CacheState {
        self.chain.load().state()
    }

    /// Current chain, e.g. `Monomorphic[Present(x) if shapes(#2)]`.
    pub fn debug_string(&self) -> String {
        self.chain.load().to_string()
    }

    /// Hit and miss counts.
    pub fn stats(&self) -> SiteStats {
        self.counters.snapshot()
    }

    /// Resolves `receiver[key]`.
    ///
    /// # Errors
    ///
    /// `TypeError` for `null`/`undefined` receivers; host errors from traps,
    /// getters and the foreign protocol are propagated.
    pub fn read(
        &self,
        heap: &ObjectHeap,
        host: &mut dyn Host,
        intrinsics: &Intrinsics,
        receiver: &Value,
        key: &PropertyKey,
    ) -> JsResult<Value> {
        debug_assert_eq!(self.mode, LookupMode::Read);
        if receiver.is_nullish() {
            return Err(read_error(receiver, key));
        }
        let mut r = Resolver {
            heap,
            host,
            intrinsics,
        };
        self.dispatch(
            &mut r,
            receiver,
            key,
            |entry, hit, r| entry.read(hit, r, receiver),
            |r| r.read(receiver, key),
        )
    }

    /// Resolves `key in receiver` (or `hasOwnProperty` in own mode).
    ///
    /// # Errors
    ///
    /// Same as [`PropertySite::read`].
    pub fn has(
        &self,
        heap: &ObjectHeap,
        host: &mut dyn Host,
        intrinsics: &Intrinsics,
        receiver: &Value,
        key: &PropertyKey,
    ) -> JsResult<bool> {
        debug_assert_ne!(self.mode, LookupMode::Read);
        if receiver.is_nullish() {
            return Err(has_error(receiver, key));
        }
        let own_only = self.mode.own_only();
        let mut r = Resolver {
            heap,
            host,
            intrinsics,
        };
        self.dispatch(
            &mut r,
            receiver,
            key,
            |entry, hit, r| entry.has(hit, r, receiver, own_only),
            |r| r.has(receiver, key, own_only),
        )
    }

    fn dispatch<'a, T>(
        &self,
        r: &mut Resolver<'a>,
        receiver: &Value,
        key: &PropertyKey,
        cached: impl FnOnce(&CacheEntry, GuardMatch, &mut Resolver<'a>) -> JsResult<T>,
        generic: impl FnOnce(&mut Resolver<'a>) -> JsResult<T>,
    ) -> JsResult<T> {
        let (version, chain) = self.chain.snapshot();
        if chain.is_megamorphic() {
            self.counters.miss();
            return generic(r);
        }

        let mut stale = 0;
        for entry in chain.entries() {
            if !entry.is_valid() {
                stale += 1;
                continue;
            }
            if let Some(hit) = entry.matches(r.heap, r.intrinsics, receiver, key) {
                self.counters.hit();
                if stale > 0 && self.chain.publish(version, chain.retain(CacheEntry::is_valid)) {
                    log::debug!("dropped {} obsolete entries at {:?} site", stale, self.mode);
                }
                return cached(entry, hit, r);
            }
        }

        self.counters.miss();
        let entry = CacheEntry::derive(r.heap, r.intrinsics, receiver, key, self.mode);
        let next = chain
            .retain(CacheEntry::is_valid)
            .with_entry(entry.clone(), self.limit);
        let megamorphic = next.is_megamorphic();
        if self.chain.publish(version, next) {
            if megamorphic {
                log::debug!(
                    "{:?} site for {} went megamorphic after {} entries",
                    self.mode,
                    key,
                    self.limit
                );
            } else {
                log::trace!("resolved property {} at {:?} site: {}", key, self.mode, entry);
            }
            if stale > 0 {
                log::debug!("dropped {} obsolete entries at {:?} site", stale, self.mode);
            }
        }
        if megamorphic {
            return generic(r);
        }
        match entry.guard.matches(r.heap, r.intrinsics, receiver) {
            Some(hit) => cached(&entry, hit, r),
            None => unreachable!("entry {} does not match the receiver it was derived for", entry),
        }
    }
}
