//! Entry points the execution engine calls, one access site at a time.

use core_types::{JsResult, ObjectId, PropertyKey, Value};
use object_model::{ObjectClass, ObjectHeap, PropertyFlags, Shape, Slot};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::sync::Arc;

use crate::config::{CacheConfig, ConfigError};
use crate::construct::ConstructShapeCache;
use crate::entry::LookupMode;
use crate::generic;
use crate::host::Host;
use crate::inline_cache::CacheState;
use crate::object_literal::{LiteralInstallCache, LiteralMember, MemberValue, ObjectLiteral};
use crate::realm::Intrinsics;
use crate::site::{PropertySite, SiteStats};

/// Identifies one access site in the executing program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId(pub u32);

/// Kind of access site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteKind {
    /// Property read
    Read,
    /// `in` check
    Has,
    /// `hasOwnProperty` check
    HasOwn,
    /// Property definition
    Define,
    /// `new` expression
    Construct,
}

type SiteTable<K, V> = RwLock<FxHashMap<K, Arc<V>>>;

/// Inline caches of every access site, created on first use.
///
/// # Example
///
/// ```
/// use core_types::Value;
/// use object_model::{ObjectHeap, PropertyFlags};
/// use property_cache::{CacheConfig, CacheState, Intrinsics, NoHost, PropertyAccess, SiteId, SiteKind};
///
/// let access = PropertyAccess::new(CacheConfig::default(), Intrinsics::default()).unwrap();
/// let mut heap = access.create_heap();
/// let obj = heap.allocate(None);
/// let site = SiteId(1);
///
/// access
///     .resolve_define(site, &mut heap, &mut NoHost, &Value::Object(obj), "x".into(), Value::Smi(1), PropertyFlags::default())
///     .unwrap();
/// let x = access.resolve_read(site, &heap, &mut NoHost, &Value::Object(obj), &"x".into()).unwrap();
/// assert_eq!(x, Value::Smi(1));
/// assert_eq!(access.site_state(SiteKind::Read, site), CacheState::Monomorphic);
/// ```
#[derive(Debug)]
pub struct PropertyAccess {
    config: CacheConfig,
    intrinsics: Intrinsics,
    property_sites: SiteTable<(SiteKind, SiteId), PropertySite>,
    define_sites: SiteTable<SiteId, LiteralInstallCache>,
    construct_sites: SiteTable<SiteId, ConstructShapeCache>,
}

impl PropertyAccess {
    /// Creates the cache set for one realm.
    ///
    /// The heap passed to the resolve methods must follow the same layout
    /// policy; build it with [`PropertyAccess::create_heap`] or verify it
    /// with [`PropertyAccess::check_heap`].
    ///
    /// # Errors
    ///
    /// Returns the first limit of `config` that is out of range.
    pub fn new(config: CacheConfig, intrinsics: Intrinsics) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(PropertyAccess {
            config,
            intrinsics,
            property_sites: RwLock::default(),
            define_sites: RwLock::default(),
            construct_sites: RwLock::default(),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Empty heap with this configuration's layout policy.
    pub fn create_heap(&self) -> ObjectHeap {
        ObjectHeap::with_config(self.config.heap_config())
    }

    /// Checks that an existing heap agrees with this configuration.
    ///
    /// # Errors
    ///
    /// See [`CacheConfig::check_heap`].
    pub fn check_heap(&self, heap: &ObjectHeap) -> Result<(), ConfigError> {
        self.config.check_heap(heap)
    }

    /// Realm prototypes used for primitive receivers and new objects.
    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    /// `receiver[key]` at `site`.
    ///
    /// # Errors
    ///
    /// `TypeError` for `null`/`undefined` receivers; host errors propagate.
    pub fn resolve_read(
        &self,
        site: SiteId,
        heap: &ObjectHeap,
        host: &mut dyn Host,
        receiver: &Value,
        key: &PropertyKey,
    ) -> JsResult<Value> {
        self.property_site(SiteKind::Read, site)
            .read(heap, host, &self.intrinsics, receiver, key)
    }

    /// `key in receiver` at `site`.
    ///
    /// # Errors
    ///
    /// Same as [`PropertyAccess::resolve_read`].
    pub fn resolve_has(
        &self,
        site: SiteId,
        heap: &ObjectHeap,
        host: &mut dyn Host,
        receiver: &Value,
        key: &PropertyKey,
    ) -> JsResult<bool> {
        self.property_site(SiteKind::Has, site)
            .has(heap, host, &self.intrinsics, receiver, key)
    }

    /// `receiver.hasOwnProperty(key)` at `site`.
    ///
    /// # Errors
    ///
    /// Same as [`PropertyAccess::resolve_read`].
    pub fn resolve_has_own(
        &self,
        site: SiteId,
        heap: &ObjectHeap,
        host: &mut dyn Host,
        receiver: &Value,
        key: &PropertyKey,
    ) -> JsResult<bool> {
        self.property_site(SiteKind::HasOwn, site)
            .has(heap, host, &self.intrinsics, receiver, key)
    }

    /// Defines a data property at `site`.
    ///
    /// Ordinary objects go through the site's install cache; exotic and
    /// foreign receivers are handed to the host.
    ///
    /// # Errors
    ///
    /// Definition errors (non-extensible object, non-configurable property,
    /// primitive or nullish receiver) and host errors.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_define(
        &self,
        site: SiteId,
        heap: &mut ObjectHeap,
        host: &mut dyn Host,
        receiver: &Value,
        key: PropertyKey,
        value: Value,
        flags: PropertyFlags,
    ) -> JsResult<()> {
        match receiver {
            Value::Object(id) if heap.class_of(*id) == ObjectClass::Ordinary => {
                get_or_insert(&self.define_sites, site, LiteralInstallCache::new)
                    .install(heap, *id, &key, Slot::Data(value), flags)
            }
            _ => generic::define(heap, host, receiver, key, value, flags),
        }
    }

    /// Initial shape for instances created at `site` with `prototype`;
    /// `None` if `prototype` is not an object.
    pub fn resolve_construct_shape(&self, site: SiteId, heap: &ObjectHeap, prototype: &Value) -> Option<Arc<Shape>> {
        self.construct_site(site).initial_shape(heap, prototype)
    }

    /// Allocates the instance of a `new` expression at `site`.
    pub fn create_instance(&self, site: SiteId, heap: &mut ObjectHeap, prototype: &Value) -> ObjectId {
        self.construct_site(site)
            .create_instance(heap, &self.intrinsics, prototype)
    }

    /// Prepares an object literal with its own member caches.
    pub fn object_literal(&self, members: Vec<LiteralMember>) -> ObjectLiteral {
        ObjectLiteral::new(members, &self.config)
    }

    /// Evaluates `literal` in this realm.
    ///
    /// # Errors
    ///
    /// See [`ObjectLiteral::evaluate`].
    pub fn evaluate_literal(
        &self,
        literal: &ObjectLiteral,
        heap: &mut ObjectHeap,
        host: &mut dyn Host,
        values: Vec<MemberValue>,
    ) -> JsResult<ObjectId> {
        literal.evaluate(heap, host, &self.intrinsics, values)
    }

    /// State of a site; sites never used report `Uninitialized`.
    pub fn site_state(&self, kind: SiteKind, site: SiteId) -> CacheState {
        match kind {
            SiteKind::Define => lookup(&self.define_sites, &site).map_or(CacheState::Uninitialized, |s| s.state()),
            SiteKind::Construct => {
                lookup(&self.construct_sites, &site).map_or(CacheState::Uninitialized, |s| s.state())
            }
            _ => lookup(&self.property_sites, &(kind, site)).map_or(CacheState::Uninitialized, |s| s.state()),
        }
    }

    /// Hit and miss counts of a site.
    pub fn site_stats(&self, kind: SiteKind, site: SiteId) -> SiteStats {
        let stats = match kind {
            SiteKind::Define => lookup(&self.define_sites, &site).map(|s| s.stats()),
            SiteKind::Construct => lookup(&self.construct_sites, &site).map(|s| s.stats()),
            _ => lookup(&self.property_sites, &(kind, site)).map(|s| s.stats()),
        };
        stats.unwrap_or_default()
    }

    /// Human-readable cache contents of a site.
    pub fn debug_string(&self, kind: SiteKind, site: SiteId) -> String {
        let chain = match kind {
            SiteKind::Define => lookup(&self.define_sites, &site).map(|s| s.debug_string()),
            SiteKind::Construct => lookup(&self.construct_sites, &site)
                .map(|s| format!("{:?}({} prototypes)", s.state(), s.len())),
            _ => lookup(&self.property_sites, &(kind, site)).map(|s| s.debug_string()),
        };
        chain.unwrap_or_else(|| format!("{:?}", CacheState::Uninitialized))
    }

    fn property_site(&self, kind: SiteKind, site: SiteId) -> Arc<PropertySite> {
        let mode = match kind {
            SiteKind::Read => LookupMode::Read,
            SiteKind::Has => LookupMode::Has,
            SiteKind::HasOwn => LookupMode::HasOwn,
            SiteKind::Define | SiteKind::Construct => {
                unreachable!("{:?} sites have no property chain", kind)
            }
        };
        let limit = self.config.property_cache_limit;
        get_or_insert(&self.property_sites, (kind, site), || PropertySite::new(mode, limit))
    }

    fn construct_site(&self, site: SiteId) -> Arc<ConstructShapeCache> {
        let limit = self.config.construct_cache_limit;
        get_or_insert(&self.construct_sites, site, || ConstructShapeCache::new(limit))
    }
}

fn lookup<K: Hash + Eq, V>(table: &SiteTable<K, V>, key: &K) -> Option<Arc<V>> {
    table.read().get(key).cloned()
}

fn get_or_insert<K: Hash + Eq, V>(table: &SiteTable<K, V>, key: K, make: impl FnOnce() -> V) -> Arc<V> {
    if let Some(site) = lookup(table, &key) {
        return site;
    }
    Arc::clone(table.write().entry(key).or_insert_with(|| Arc::new(make())))
}
