//! Object literal install cache behavior
//!
//! Tests install idempotence and shape sharing between literal evaluations.

use core_types::{PropertyKey, Value};
use integration_tests::Realm;
use object_model::{PropertyFlags, Slot};
use property_cache::{CacheState, LiteralInstallCache, LiteralMember, MemberValue, NoHost};

/// Test: installing the same property twice leaves shape and storage alone
#[test]
fn test_install_is_idempotent() {
    let mut realm = Realm::default();
    let cache = LiteralInstallCache::new();
    let obj = realm.object(&[]);
    let key = PropertyKey::from("x");

    cache
        .install(&mut realm.heap, obj, &key, Slot::Data(Value::Smi(7)), PropertyFlags::default())
        .unwrap();
    let shape = realm.heap.shape_of(obj).unwrap();
    let shape_count = realm.heap.shapes().len();

    cache
        .install(&mut realm.heap, obj, &key, Slot::Data(Value::Smi(7)), PropertyFlags::default())
        .unwrap();
    assert!(realm.heap.shape_of(obj).unwrap().check(&shape));
    assert_eq!(realm.heap.shapes().len(), shape_count);
    assert_eq!(realm.heap.own_keys(obj), vec![key.clone()]);
    assert_eq!(
        realm.heap.own_property(obj, &key).unwrap().slot,
        Slot::Data(Value::Smi(7))
    );
}

/// Test: repeated literal evaluations share shapes and hit every member cache
#[test]
fn test_literal_evaluations_share_shape() {
    let mut realm = Realm::default();
    let literal = realm.access.object_literal(vec![
        LiteralMember::Data("x".into()),
        LiteralMember::Data("y".into()),
        LiteralMember::Data("label".into()),
    ]);
    let values = |n: i32| {
        vec![
            MemberValue::Value(Value::Smi(n)),
            MemberValue::Value(Value::Double(n as f64 + 0.5)),
            MemberValue::Value(Value::String(format!("point {}", n))),
        ]
    };

    let objects: Vec<_> = (0..4)
        .map(|n| {
            realm
                .access
                .evaluate_literal(&literal, &mut realm.heap, &mut NoHost, values(n))
                .unwrap()
        })
        .collect();
    let shape = realm.heap.shape_of(objects[0]).unwrap();
    for obj in &objects {
        assert!(realm.heap.shape_of(*obj).unwrap().check(&shape));
        assert_eq!(realm.heap.prototype_of(*obj), realm.object_prototype());
    }
    for index in 0..3 {
        let cache = literal.member_cache(index).unwrap();
        assert_eq!(cache.state(), CacheState::Monomorphic);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (3, 1));
    }
    assert_eq!(
        realm.heap.own_property(objects[3], &"label".into()).unwrap().slot,
        Slot::Data(Value::String("point 3".to_string()))
    );
}
