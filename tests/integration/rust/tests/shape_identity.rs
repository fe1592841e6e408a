//! Shape identity and presence checks across objects
//!
//! Tests that equal transition sequences converge on one shape and that
//! has-sites keyed on that shape stay correct while other objects change.

use core_types::{PropertyKey, Value};
use integration_tests::Realm;
use object_model::{Layout, PropertyFlags, Representation};
use property_cache::{CacheState, NoHost, SiteId, SiteKind};

/// Test: x then y yields the same shape for independent objects
#[test]
fn test_same_additions_reach_same_shape() {
    let mut realm = Realm::default();
    let root = realm
        .heap
        .shapes()
        .empty(Layout::ordinary(realm.object_prototype()));
    let shapes = realm.heap.shapes();
    let a = shapes.with_added_property(&root, "x".into(), PropertyFlags::default(), Representation::Int);
    let b = shapes.with_added_property(&a, "y".into(), PropertyFlags::default(), Representation::Int);
    let again = shapes.with_added_property(&root, "x".into(), PropertyFlags::default(), Representation::Int);
    assert!(a.check(&again));

    let first = realm.object(&[("x", Value::Smi(1)), ("y", Value::Smi(2))]);
    let second = realm.object(&[("x", Value::Smi(3)), ("y", Value::Smi(4))]);
    assert!(realm.heap.shape_of(first).unwrap().check(&b));
    assert!(realm.heap.shape_of(second).unwrap().check(&b));
}

/// Test: has x and y are true, has z is false with an Absent entry on shape B
#[test]
fn test_has_site_over_shape_b() {
    let mut realm = Realm::default();
    let obj = realm.object(&[("x", Value::Smi(1)), ("y", Value::Smi(2))]);
    let shape_b = realm.heap.shape_of(obj).unwrap();
    let receiver = Value::Object(obj);
    let site = SiteId(1);

    let has = |key: &str| {
        realm
            .access
            .resolve_has(site, &realm.heap, &mut NoHost, &receiver, &key.into())
            .unwrap()
    };
    assert!(has("x"));
    assert!(has("y"));
    assert!(!has("z"));

    let chain = realm.access.debug_string(SiteKind::Has, site);
    assert!(
        chain.contains(&format!("Absent(z) if shapes(#{} > ", shape_b.id().0)),
        "unexpected chain {}",
        chain
    );
    assert_eq!(realm.access.site_state(SiteKind::Has, site), CacheState::Polymorphic);

    // The absent entry now answers without re-deriving.
    let before = realm.access.site_stats(SiteKind::Has, site);
    assert!(!realm
        .access
        .resolve_has(site, &realm.heap, &mut NoHost, &receiver, &"z".into())
        .unwrap());
    let after = realm.access.site_stats(SiteKind::Has, site);
    assert_eq!(after.hits, before.hits + 1);
    assert_eq!(after.misses, before.misses);
}

/// Test: additions to other objects never flip an established answer
#[test]
fn test_no_cross_object_interference() {
    let mut realm = Realm::default();
    let obj = realm.object(&[("x", Value::Smi(1))]);
    let receiver = Value::Object(obj);
    let key = PropertyKey::from("x");
    let site = SiteId(2);
    assert!(realm
        .access
        .resolve_has(site, &realm.heap, &mut NoHost, &receiver, &key)
        .unwrap());

    for i in 0..20 {
        let other = realm.object(&[("x", Value::Smi(i))]);
        if i == 0 {
            // Widening the shared location obsoletes obj's shape as well.
            realm
                .heap
                .put_data_property(other, "x".into(), Value::String("wide".into()), PropertyFlags::default())
                .unwrap();
        }
        let name = format!("extra{}", i);
        realm
            .heap
            .put_data_property(other, name.as_str().into(), Value::Smi(i), PropertyFlags::default())
            .unwrap();
        assert!(realm
            .access
            .resolve_has(site, &realm.heap, &mut NoHost, &receiver, &key)
            .unwrap());
    }
    assert_eq!(realm.heap.own_keys(obj), vec![key]);
}
