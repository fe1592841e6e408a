//! Contract compliance tests for core_types
//!
//! These tests verify the exported API the object model and the property
//! caches depend on.

use core_types::{ErrorKind, JsError, ObjectId, PropertyKey, SymbolId, Value};

#[cfg(test)]
mod value_contract_tests {
    use super::*;

    /// Contract: object values carry a copyable heap handle
    #[test]
    fn test_object_handle_is_copy() {
        let id = ObjectId(1);
        let a = Value::Object(id);
        let b = Value::Object(id);
        assert_eq!(a, b);
    }

    /// Contract: Value must be clonable and comparable
    #[test]
    fn test_value_clone_eq() {
        let v = Value::String("abc".to_string());
        assert_eq!(v.clone(), v);
    }
}

#[cfg(test)]
mod key_contract_tests {
    use super::*;

    /// Contract: keys are either strings or symbols, hashable and clonable
    #[test]
    fn test_key_variants() {
        let _: PropertyKey = PropertyKey::from("x");
        let _: PropertyKey = PropertyKey::from(SymbolId(0));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    /// Contract: keys can be shared across threads inside shapes
    #[test]
    fn test_key_is_send_sync() {
        assert_send_sync::<PropertyKey>();
        assert_send_sync::<Value>();
    }
}

#[cfg(test)]
mod error_contract_tests {
    use super::*;

    /// Contract: JsError exposes kind and message
    #[test]
    fn test_error_fields() {
        let error = JsError::type_error("x");
        assert_eq!(error.kind, ErrorKind::TypeError);
        assert_eq!(error.message, "x");
    }
}
