//! Capacity limits of access-site chains and construction caches
//!
//! Tests that exceeding a capacity degrades to the generic path for good
//! while every answer stays correct.

use core_types::{PropertyKey, Value};
use integration_tests::Realm;
use property_cache::{CacheConfig, CacheState, ConstructShapeCache, NoHost, SiteId, SiteKind};
use std::sync::Arc;

/// Test: capacity + 1 distinct shapes turn the site generic for good
#[test]
fn test_read_chain_converges_to_generic() {
    let capacity = 4;
    let mut realm = Realm::new(CacheConfig::default().with_property_cache_limit(capacity));
    let site = SiteId(3);
    let key = PropertyKey::from("k");

    for i in 0..capacity + 1 {
        let tag = format!("tag{}", i);
        let obj = realm.object(&[(tag.as_str(), Value::Smi(0)), ("k", Value::Smi(i as i32))]);
        let value = realm
            .access
            .resolve_read(site, &realm.heap, &mut NoHost, &Value::Object(obj), &key)
            .unwrap();
        assert_eq!(value, Value::Smi(i as i32));
        let expected = match i {
            0 => CacheState::Monomorphic,
            i if i < capacity => CacheState::Polymorphic,
            _ => CacheState::Megamorphic,
        };
        assert_eq!(realm.access.site_state(SiteKind::Read, site), expected);
    }

    // More shapes, including ones seen before, never revive the chain.
    for i in 0..10 {
        let tag = format!("late{}", i);
        let obj = realm.object(&[("k", Value::Smi(100 + i)), (tag.as_str(), Value::Smi(0))]);
        let value = realm
            .access
            .resolve_read(site, &realm.heap, &mut NoHost, &Value::Object(obj), &key)
            .unwrap();
        assert_eq!(value, Value::Smi(100 + i));
        assert_eq!(realm.access.debug_string(SiteKind::Read, site), "Megamorphic");
    }
    let stats = realm.access.site_stats(SiteKind::Read, site);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, capacity as u64 + 11);
}

/// Test: the ninth prototype misses a capacity-8 construction cache
#[test]
fn test_construct_cache_overflow_keeps_results() {
    let mut realm = Realm::new(CacheConfig::default().with_construct_cache_limit(8));
    let prototypes: Vec<_> = (0..9).map(|_| realm.heap.allocate(None)).collect();
    let site = SiteId(0);

    let first: Vec<_> = prototypes
        .iter()
        .map(|p| {
            realm
                .access
                .resolve_construct_shape(site, &realm.heap, &Value::Object(*p))
                .unwrap()
        })
        .collect();
    let stats = realm.access.site_stats(SiteKind::Construct, site);
    assert_eq!((stats.hits, stats.misses), (0, 9));
    assert_eq!(realm.access.site_state(SiteKind::Construct, site), CacheState::Megamorphic);
    for (shape, p) in first.iter().zip(&prototypes) {
        assert_eq!(shape.prototype(), Some(*p));
        assert_eq!(shape.property_count(), 0);
    }

    // The eight cached prototypes hit and keep their shapes; the ninth is
    // recomputed, with the same result.
    for (shape, p) in first.iter().zip(&prototypes) {
        let again = realm
            .access
            .resolve_construct_shape(site, &realm.heap, &Value::Object(*p))
            .unwrap();
        assert!(Arc::ptr_eq(shape, &again));
    }
    let stats = realm.access.site_stats(SiteKind::Construct, site);
    assert_eq!((stats.hits, stats.misses), (8, 10));

    let instance = realm
        .access
        .create_instance(site, &mut realm.heap, &Value::Object(prototypes[8]));
    assert_eq!(realm.heap.prototype_of(instance), Some(prototypes[8]));
}

/// Test: a standalone cache reports which prototypes it kept
#[test]
fn test_construct_cache_membership() {
    let mut realm = Realm::default();
    let cache = ConstructShapeCache::new(8);
    let prototypes: Vec<_> = (0..9).map(|_| realm.heap.allocate(None)).collect();
    for p in &prototypes {
        cache.initial_shape(&realm.heap, &Value::Object(*p));
    }
    assert_eq!(cache.len(), 8);
    assert!(prototypes[..8].iter().all(|p| cache.contains(*p)));
    assert!(!cache.contains(prototypes[8]));
}
