//! Core value types shared by the object model and the property caches.
//!
//! This crate provides the foundational types handed to the property-access
//! fast path by the surrounding runtime: values, property keys and errors.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of JavaScript values
//! - [`PropertyKey`] - Canonical property key (string or symbol)
//! - [`ObjectId`] / [`ForeignId`] - Handles to native and foreign objects
//! - [`JsError`] - JavaScript errors raised by host callbacks
//! - [`ErrorKind`] - Types of JavaScript errors
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, JsError, PropertyKey, Value};
//!
//! let num = Value::Smi(42);
//! assert!(num.is_truthy());
//! assert_eq!(num.type_of(), "number");
//!
//! let key = PropertyKey::from("x");
//! assert_eq!(key.as_str(), Some("x"));
//!
//! let error = JsError::type_error("undefined is not a function");
//! assert_eq!(error.kind, ErrorKind::TypeError);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod key;
mod value;

pub use error::{ErrorKind, JsError, JsResult};
pub use key::{PropertyKey, SymbolId};
pub use value::{ForeignId, ObjectId, PrimitiveKind, Value};
