//! Collaborators outside the object model.
//!
//! Foreign values, proxy and adapter traps, and accessor getters all run
//! code the caches know nothing about. The embedding runtime provides them
//! through [`Host`]; every callback may fail with a language error, which
//! the caches propagate unchanged.

use core_types::{ForeignId, JsError, JsResult, ObjectId, PropertyKey, Value};
use object_model::PropertyFlags;

/// Runtime services the property caches delegate to.
///
/// Every method has a default that raises a `TypeError`, so a host only
/// implements the receiver kinds it actually hands to the caches.
pub trait Host {
    /// Foreign protocol: does `foreign` have `key`?
    fn foreign_has(&mut self, foreign: ForeignId, key: &PropertyKey) -> JsResult<bool> {
        let _ = key;
        Err(unsupported(format!("foreign object {}", foreign.0)))
    }

    /// Foreign protocol: read `key` from `foreign`.
    fn foreign_read(&mut self, foreign: ForeignId, key: &PropertyKey) -> JsResult<Value> {
        let _ = key;
        Err(unsupported(format!("foreign object {}", foreign.0)))
    }

    /// Foreign protocol: write `key` on `foreign`.
    fn foreign_write(&mut self, foreign: ForeignId, key: &PropertyKey, value: Value) -> JsResult<()> {
        let _ = (key, value);
        Err(unsupported(format!("foreign object {}", foreign.0)))
    }

    /// Proxy `has` trap.
    fn proxy_has(&mut self, target: ObjectId, handler: ObjectId, key: &PropertyKey) -> JsResult<bool> {
        let _ = (target, key);
        Err(unsupported(format!("proxy handler {}", handler.0)))
    }

    /// Proxy `getOwnPropertyDescriptor` trap, reduced to presence.
    fn proxy_has_own(&mut self, target: ObjectId, handler: ObjectId, key: &PropertyKey) -> JsResult<bool> {
        let _ = (target, key);
        Err(unsupported(format!("proxy handler {}", handler.0)))
    }

    /// Proxy `get` trap.
    fn proxy_get(
        &mut self,
        target: ObjectId,
        handler: ObjectId,
        key: &PropertyKey,
        receiver: &Value,
    ) -> JsResult<Value> {
        let _ = (target, key, receiver);
        Err(unsupported(format!("proxy handler {}", handler.0)))
    }

    /// Proxy `defineProperty` trap.
    fn proxy_define(
        &mut self,
        target: ObjectId,
        handler: ObjectId,
        key: &PropertyKey,
        value: Value,
        flags: PropertyFlags,
    ) -> JsResult<()> {
        let _ = (target, key, value, flags);
        Err(unsupported(format!("proxy handler {}", handler.0)))
    }

    /// Adapter `__has__` trap.
    fn adapter_has(&mut self, adaptee: ObjectId, key: &PropertyKey) -> JsResult<bool> {
        let _ = key;
        Err(unsupported(format!("adaptee {}", adaptee.0)))
    }

    /// Adapter `__get__` trap.
    fn adapter_get(&mut self, adaptee: ObjectId, key: &PropertyKey) -> JsResult<Value> {
        let _ = key;
        Err(unsupported(format!("adaptee {}", adaptee.0)))
    }

    /// Adapter `__put__` trap.
    fn adapter_put(&mut self, adaptee: ObjectId, key: &PropertyKey, value: Value) -> JsResult<()> {
        let _ = (key, value);
        Err(unsupported(format!("adaptee {}", adaptee.0)))
    }

    /// Calls an accessor's getter with `receiver` as `this`.
    fn call_getter(&mut self, getter: ObjectId, receiver: &Value) -> JsResult<Value> {
        let _ = receiver;
        Err(unsupported(format!("getter {}", getter.0)))
    }
}

/// Host with no support for exotic receivers or accessor calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHost;

impl Host for NoHost {}

fn unsupported(what: String) -> JsError {
    JsError::type_error(format!("{} is not supported by this host", what))
}
