//! Unit tests for property cache components

use core_types::{ErrorKind, ForeignId, JsError, JsResult, ObjectId, PropertyKey, Value};
use object_model::{Accessor, ObjectHeap, PropertyFlags};
use property_cache::{
    CacheConfig, CacheState, EntryAction, Host, Intrinsics, LookupMode, NoHost, PropertyAccess,
    PropertySite, SiteId, SiteKind,
};

/// Host that answers every trap from fixed tables and records the calls.
#[derive(Default)]
struct RecordingHost {
    calls: Vec<String>,
    present: Vec<String>,
}

impl RecordingHost {
    fn with_keys(keys: &[&str]) -> Self {
        RecordingHost {
            calls: Vec::new(),
            present: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn knows(&self, key: &PropertyKey) -> bool {
        self.present.iter().any(|k| key.as_str() == Some(k.as_str()))
    }
}

impl Host for RecordingHost {
    fn foreign_has(&mut self, foreign: ForeignId, key: &PropertyKey) -> JsResult<bool> {
        self.calls.push(format!("foreign_has {} {}", foreign.0, key));
        Ok(self.knows(key))
    }

    fn foreign_read(&mut self, foreign: ForeignId, key: &PropertyKey) -> JsResult<Value> {
        self.calls.push(format!("foreign_read {} {}", foreign.0, key));
        Ok(Value::String(format!("foreign:{}", key)))
    }

    fn proxy_has(&mut self, _target: ObjectId, _handler: ObjectId, key: &PropertyKey) -> JsResult<bool> {
        self.calls.push(format!("proxy_has {}", key));
        Ok(self.knows(key))
    }

    fn proxy_get(
        &mut self,
        _target: ObjectId,
        _handler: ObjectId,
        key: &PropertyKey,
        _receiver: &Value,
    ) -> JsResult<Value> {
        self.calls.push(format!("proxy_get {}", key));
        Ok(Value::Smi(42))
    }

    fn adapter_has(&mut self, _adaptee: ObjectId, key: &PropertyKey) -> JsResult<bool> {
        self.calls.push(format!("adapter_has {}", key));
        Ok(self.knows(key))
    }

    fn adapter_get(&mut self, _adaptee: ObjectId, key: &PropertyKey) -> JsResult<Value> {
        self.calls.push(format!("adapter_get {}", key));
        if key.as_str() == Some("boom") {
            return Err(JsError::new(ErrorKind::RangeError, "adapter failed"));
        }
        Ok(Value::Boolean(true))
    }

    fn call_getter(&mut self, getter: ObjectId, receiver: &Value) -> JsResult<Value> {
        self.calls.push(format!("getter {} this={}", getter.0, receiver));
        Ok(Value::Smi(getter.0 as i32))
    }
}

fn access() -> PropertyAccess {
    PropertyAccess::new(CacheConfig::default(), Intrinsics::default()).unwrap()
}

fn put(heap: &mut ObjectHeap, id: ObjectId, key: &str, value: Value) {
    heap.put_data_property(id, key.into(), value, PropertyFlags::default())
        .unwrap();
}

// ============================================================================
// Read sites
// ============================================================================

#[test]
fn test_read_own_and_inherited() {
    let access = access();
    let mut heap = ObjectHeap::new();
    let proto = heap.allocate(None);
    put(&mut heap, proto, "m", Value::Smi(10));
    let obj = heap.allocate(Some(proto));
    put(&mut heap, obj, "x", Value::Smi(1));
    let receiver = Value::Object(obj);

    let read = |heap: &ObjectHeap, site: u32, key: &str| {
        access
            .resolve_read(SiteId(site), heap, &mut NoHost, &receiver, &key.into())
            .unwrap()
    };
    assert_eq!(read(&heap, 1, "x"), Value::Smi(1));
    assert_eq!(read(&heap, 2, "m"), Value::Smi(10));
    assert_eq!(read(&heap, 3, "nope"), Value::Undefined);

    // Shadowing the inherited property changes the receiver shape; the
    // site re-derives and sees the own value.
    put(&mut heap, obj, "m", Value::Smi(20));
    assert_eq!(read(&heap, 2, "m"), Value::Smi(20));
    assert_eq!(access.site_state(SiteKind::Read, SiteId(2)), CacheState::Polymorphic);
}

#[test]
fn test_prototype_change_invalidates_inherited_entry() {
    let access = access();
    let mut heap = ObjectHeap::new();
    let proto = heap.allocate(None);
    put(&mut heap, proto, "m", Value::Smi(1));
    let obj = heap.allocate(Some(proto));
    let receiver = Value::Object(obj);
    let key = PropertyKey::from("m");

    assert_eq!(
        access.resolve_read(SiteId(0), &heap, &mut NoHost, &receiver, &key).unwrap(),
        Value::Smi(1)
    );
    put(&mut heap, proto, "m", Value::Smi(2));
    assert_eq!(
        access.resolve_read(SiteId(0), &heap, &mut NoHost, &receiver, &key).unwrap(),
        Value::Smi(2)
    );
    assert!(heap.delete_property(proto, &key));
    assert_eq!(
        access.resolve_read(SiteId(0), &heap, &mut NoHost, &receiver, &key).unwrap(),
        Value::Undefined
    );
}

#[test]
fn test_accessor_read_calls_getter() {
    let access = access();
    let mut heap = ObjectHeap::new();
    let getter = heap.allocate(None);
    let obj = heap.allocate(None);
    heap.define_accessor_property(
        obj,
        "g".into(),
        Accessor {
            getter: Some(getter),
            setter: None,
        },
        PropertyFlags::accessor(),
    )
    .unwrap();
    heap.define_accessor_property(obj, "setter_only".into(), Accessor::default(), PropertyFlags::accessor())
        .unwrap();
    let mut host = RecordingHost::default();
    let receiver = Value::Object(obj);

    for _ in 0..2 {
        let value = access
            .resolve_read(SiteId(0), &heap, &mut host, &receiver, &"g".into())
            .unwrap();
        assert_eq!(value, Value::Smi(getter.0 as i32));
    }
    assert_eq!(host.calls.len(), 2);
    assert_eq!(access.site_stats(SiteKind::Read, SiteId(0)).hits, 1);

    let missing_getter = access
        .resolve_read(SiteId(1), &heap, &mut host, &receiver, &"setter_only".into())
        .unwrap();
    assert_eq!(missing_getter, Value::Undefined);
}

#[test]
fn test_getter_errors_propagate() {
    let access = access();
    let mut heap = ObjectHeap::new();
    let getter = heap.allocate(None);
    let obj = heap.allocate(None);
    heap.define_accessor_property(
        obj,
        "g".into(),
        Accessor {
            getter: Some(getter),
            setter: None,
        },
        PropertyFlags::accessor(),
    )
    .unwrap();
    let err = access
        .resolve_read(SiteId(0), &heap, &mut NoHost, &Value::Object(obj), &"g".into())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeError);
}

#[test]
fn test_primitive_receivers_use_realm_prototypes() {
    let mut heap = ObjectHeap::new();
    let string_proto = heap.allocate(None);
    put(&mut heap, string_proto, "trim", Value::Smi(7));
    let number_proto = heap.allocate(None);
    put(&mut heap, number_proto, "toFixed", Value::Smi(8));
    let access = PropertyAccess::new(
        CacheConfig::default(),
        Intrinsics {
            string_prototype: Some(string_proto),
            number_prototype: Some(number_proto),
            ..Intrinsics::default()
        },
    )
    .unwrap();

    let s = Value::String("hello".to_string());
    let read = |site: u32, receiver: &Value, key: &str| {
        access
            .resolve_read(SiteId(site), &heap, &mut NoHost, receiver, &key.into())
            .unwrap()
    };
    assert_eq!(read(0, &s, "length"), Value::Smi(5));
    assert_eq!(read(0, &Value::String("ab".into()), "length"), Value::Smi(2));
    assert_eq!(access.site_state(SiteKind::Read, SiteId(0)), CacheState::Monomorphic);
    assert_eq!(read(1, &s, "trim"), Value::Smi(7));
    assert_eq!(read(2, &Value::Double(1.5), "toFixed"), Value::Smi(8));
    assert_eq!(read(2, &Value::Smi(3), "toFixed"), Value::Smi(8));
    assert_eq!(read(3, &Value::Boolean(true), "x"), Value::Undefined);

    assert!(!access
        .resolve_has_own(SiteId(4), &heap, &mut NoHost, &s, &"trim".into())
        .unwrap());
    assert!(access
        .resolve_has(SiteId(5), &heap, &mut NoHost, &s, &"trim".into())
        .unwrap());
}

#[test]
fn test_string_index_keys_read_code_units() {
    let mut heap = ObjectHeap::new();
    let string_proto = heap.allocate(None);
    put(&mut heap, string_proto, "5", Value::Smi(55));
    let access = PropertyAccess::new(
        CacheConfig::default(),
        Intrinsics {
            string_prototype: Some(string_proto),
            ..Intrinsics::default()
        },
    )
    .unwrap();
    let read = |receiver: &str, key: &str| {
        access
            .resolve_read(SiteId(0), &heap, &mut NoHost, &Value::String(receiver.into()), &key.into())
            .unwrap()
    };

    assert_eq!(read("abc", "0"), Value::String("a".into()));
    assert_eq!(read("xyz", "0"), Value::String("x".into()));
    assert_eq!(read("", "0"), Value::Undefined);
    let stats = access.site_stats(SiteKind::Read, SiteId(0));
    assert_eq!((stats.hits, stats.misses), (2, 1));
    assert_eq!(access.site_state(SiteKind::Read, SiteId(0)), CacheState::Monomorphic);
    assert!(access
        .debug_string(SiteKind::Read, SiteId(0))
        .contains("StringIndex(0)"));

    // Past the end the lookup continues on String.prototype.
    assert_eq!(
        access
            .resolve_read(SiteId(1), &heap, &mut NoHost, &Value::String("abc".into()), &"5".into())
            .unwrap(),
        Value::Smi(55)
    );

    let has_own = |receiver: &str, key: &str| {
        access
            .resolve_has_own(SiteId(2), &heap, &mut NoHost, &Value::String(receiver.into()), &key.into())
            .unwrap()
    };
    assert!(has_own("abc", "2"));
    assert!(!has_own("ab", "2"));
    assert!(!has_own("abc", "5"));
}

#[test]
fn test_nullish_receivers_raise_type_error() {
    let access = access();
    let heap = ObjectHeap::new();
    let err = access
        .resolve_read(SiteId(0), &heap, &mut NoHost, &Value::Undefined, &"x".into())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert_eq!(err.message, "Cannot read properties of undefined (reading 'x')");
    assert!(access
        .resolve_has(SiteId(0), &heap, &mut NoHost, &Value::Null, &"x".into())
        .is_err());
}

// ============================================================================
// Has sites
// ============================================================================

#[test]
fn test_has_own_mode() {
    let access = access();
    let mut heap = ObjectHeap::new();
    let proto = heap.allocate(None);
    put(&mut heap, proto, "inherited", Value::Smi(1));
    let obj = heap.allocate(Some(proto));
    put(&mut heap, obj, "own", Value::Smi(1));
    let receiver = Value::Object(obj);

    let has_own = |key: &str| {
        access
            .resolve_has_own(SiteId(0), &heap, &mut NoHost, &receiver, &key.into())
            .unwrap()
    };
    assert!(has_own("own"));
    assert!(!has_own("inherited"));
    assert!(access
        .resolve_has(SiteId(0), &heap, &mut NoHost, &receiver, &"inherited".into())
        .unwrap());
    assert_eq!(access.site_state(SiteKind::HasOwn, SiteId(0)), CacheState::Polymorphic);
}

#[test]
fn test_exotic_receivers_delegate_to_host() {
    let access = access();
    let mut heap = ObjectHeap::new();
    let target = heap.allocate(None);
    let proxy = heap.allocate_proxy(target, target);
    let adapter = heap.allocate_adapter(target, None);
    let mut host = RecordingHost::with_keys(&["known"]);

    assert!(access
        .resolve_has(SiteId(0), &heap, &mut host, &Value::Object(proxy), &"known".into())
        .unwrap());
    assert!(!access
        .resolve_has(SiteId(0), &heap, &mut host, &Value::Object(proxy), &"other".into())
        .unwrap());
    assert!(access
        .resolve_has(SiteId(1), &heap, &mut host, &Value::Object(adapter), &"known".into())
        .unwrap());
    assert!(access
        .resolve_has(SiteId(2), &heap, &mut host, &Value::Foreign(ForeignId(5)), &"known".into())
        .unwrap());
    assert_eq!(
        access
            .resolve_read(SiteId(3), &heap, &mut host, &Value::Object(proxy), &"p".into())
            .unwrap(),
        Value::Smi(42)
    );
    assert_eq!(
        access
            .resolve_read(SiteId(4), &heap, &mut host, &Value::Foreign(ForeignId(5)), &"f".into())
            .unwrap(),
        Value::String("foreign:f".to_string())
    );
    assert_eq!(
        host.calls,
        vec![
            "proxy_has known",
            "proxy_has other",
            "adapter_has known",
            "foreign_has 5 known",
            "proxy_get p",
            "foreign_read 5 f",
        ]
    );
    // Class guards still key on the property name.
    assert_eq!(access.site_state(SiteKind::Has, SiteId(0)), CacheState::Polymorphic);
}

#[test]
fn test_host_errors_propagate_from_adapter() {
    let access = access();
    let mut heap = ObjectHeap::new();
    let adaptee = heap.allocate(None);
    let adapter = heap.allocate_adapter(adaptee, None);
    let mut host = RecordingHost::default();
    let err = access
        .resolve_read(SiteId(0), &heap, &mut host, &Value::Object(adapter), &"boom".into())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RangeError);
}

#[test]
fn test_exotic_prototype_continues_uncached() {
    let access = access();
    let mut heap = ObjectHeap::new();
    let adaptee = heap.allocate(None);
    let adapter = heap.allocate_adapter(adaptee, None);
    let obj = heap.allocate(Some(adapter));
    put(&mut heap, obj, "own", Value::Smi(1));
    let mut host = RecordingHost::with_keys(&["trap"]);
    let receiver = Value::Object(obj);

    assert!(access
        .resolve_has(SiteId(0), &heap, &mut host, &receiver, &"trap".into())
        .unwrap());
    assert!(access
        .resolve_has(SiteId(0), &heap, &mut host, &receiver, &"trap".into())
        .unwrap());
    assert_eq!(host.calls, vec!["adapter_has trap", "adapter_has trap"]);
    assert!(access
        .debug_string(SiteKind::Has, SiteId(0))
        .starts_with("Monomorphic[Continue(trap)"));
}

#[test]
fn test_dictionary_receivers() {
    let access = access();
    let mut heap = ObjectHeap::new();
    let proto = heap.allocate(None);
    put(&mut heap, proto, "p", Value::Smi(1));
    let dict = heap.allocate_dictionary(Some(proto));
    put(&mut heap, dict, "d", Value::Smi(2));
    let receiver = Value::Object(dict);

    assert_eq!(
        access.resolve_read(SiteId(0), &heap, &mut NoHost, &receiver, &"d".into()).unwrap(),
        Value::Smi(2)
    );
    assert_eq!(
        access.resolve_read(SiteId(0), &heap, &mut NoHost, &receiver, &"p".into()).unwrap(),
        Value::Smi(1)
    );
    put(&mut heap, dict, "late", Value::Smi(3));
    assert!(access
        .resolve_has(SiteId(1), &heap, &mut NoHost, &receiver, &"late".into())
        .unwrap());
    assert!(access
        .debug_string(SiteKind::Has, SiteId(1))
        .contains("Dictionary(late) if dictionary"));
}

#[test]
fn test_module_namespace_is_unspecialized() {
    let site = PropertySite::new(LookupMode::Read, 4);
    let mut heap = ObjectHeap::new();
    let ns = heap.allocate_namespace();
    let value = site
        .read(&heap, &mut NoHost, &Intrinsics::default(), &Value::Object(ns), &"export".into())
        .unwrap();
    assert_eq!(value, Value::Undefined);
    assert!(site.debug_string().contains("Unspecialized(export) if class ModuleNamespace"));
}

#[test]
fn test_entry_kinds_in_debug_string() {
    let site = PropertySite::new(LookupMode::Has, 4);
    let mut heap = ObjectHeap::new();
    let obj = heap.allocate(None);
    put(&mut heap, obj, "x", Value::Smi(1));
    let intrinsics = Intrinsics::default();
    let receiver = Value::Object(obj);
    site.has(&heap, &mut NoHost, &intrinsics, &receiver, &"x".into()).unwrap();
    site.has(&heap, &mut NoHost, &intrinsics, &receiver, &"z".into()).unwrap();
    let debug = site.debug_string();
    assert!(debug.starts_with("Polymorphic[Present(x) if shapes(#"));
    assert!(debug.contains("Absent(z) if shapes(#"));
    assert_eq!(EntryAction::Absent.name(), "Absent");
}

// ============================================================================
// Define sites
// ============================================================================

#[test]
fn test_define_caches_transition() {
    let access = access();
    let mut heap = ObjectHeap::new();
    let a = heap.allocate(None);
    let b = heap.allocate(None);
    for id in [a, b] {
        access
            .resolve_define(
                SiteId(0),
                &mut heap,
                &mut NoHost,
                &Value::Object(id),
                "k".into(),
                Value::Smi(1),
                PropertyFlags::default(),
            )
            .unwrap();
    }
    let stats = access.site_stats(SiteKind::Define, SiteId(0));
    assert_eq!((stats.hits, stats.misses), (1, 1));
    assert!(heap.shape_of(a).unwrap().check(&heap.shape_of(b).unwrap()));
}

#[test]
fn test_define_respects_extensibility() {
    let access = access();
    let mut heap = ObjectHeap::new();
    let a = heap.allocate(None);
    let b = heap.allocate(None);
    let define = |heap: &mut ObjectHeap, id: ObjectId| {
        access.resolve_define(
            SiteId(0),
            heap,
            &mut NoHost,
            &Value::Object(id),
            "k".into(),
            Value::Smi(1),
            PropertyFlags::default(),
        )
    };
    define(&mut heap, a).unwrap();
    heap.prevent_extensions(b);
    let err = define(&mut heap, b).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert!(heap.own_property(b, &"k".into()).is_none());
}
