//! JavaScript value representation.
//!
//! This module provides the core `Value` enum that represents all values a
//! property access can observe: primitives, native objects (by handle) and
//! foreign objects owned by another language runtime.

use crate::SymbolId;
use num_bigint::BigInt;
use num_traits::Zero;
use std::fmt;

/// Handle to a native object in the object heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// Handle to an object owned by a foreign runtime.
///
/// The object model never looks inside foreign objects; it only forwards
/// messages through the host's foreign-object protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForeignId(pub u32);

/// The primitive type of a non-object value.
///
/// Primitive receivers resolve properties through the prototype object the
/// realm registers for their kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// String values
    String,
    /// Smi and double values
    Number,
    /// Boolean values
    Boolean,
    /// Symbol values
    Symbol,
    /// BigInt values
    BigInt,
}

/// Represents any JavaScript value.
///
/// Primitive values are stored inline, while objects are referenced by ID.
///
/// # Examples
///
/// ```
/// use core_types::{ObjectId, Value};
///
/// let undefined = Value::Undefined;
/// let number = Value::Smi(42);
/// let object = Value::Object(ObjectId(0));
///
/// assert!(!undefined.is_truthy());
/// assert!(number.is_truthy());
/// assert_eq!(number.type_of(), "number");
/// assert_eq!(object.as_object(), Some(ObjectId(0)));
/// ```
#[derive(Clone, PartialEq)]
pub enum Value {
    /// JavaScript undefined value
    Undefined,
    /// JavaScript null value
    Null,
    /// JavaScript boolean (true or false)
    Boolean(bool),
    /// Small integer (fits in 32 bits)
    Smi(i32),
    /// IEEE 754 double-precision floating point
    Double(f64),
    /// JavaScript string value
    String(String),
    /// JavaScript symbol value
    Symbol(SymbolId),
    /// JavaScript BigInt (arbitrary precision integer)
    BigInt(BigInt),
    /// Native object living in the object heap
    Object(ObjectId),
    /// Object owned by a foreign runtime
    Foreign(ForeignId),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::Smi(n) => f.debug_tuple("Smi").field(n).finish(),
            Value::Double(n) => f.debug_tuple("Double").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Symbol(id) => f.debug_tuple("Symbol").field(&id.0).finish(),
            Value::BigInt(n) => f.debug_tuple("BigInt").field(n).finish(),
            Value::Object(id) => f.debug_tuple("Object").field(&id.0).finish(),
            Value::Foreign(id) => f.debug_tuple("Foreign").field(&id.0).finish(),
        }
    }
}

impl Value {
    /// Returns whether this value is truthy in JavaScript semantics.
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// assert!(!Value::Undefined.is_truthy());
    /// assert!(!Value::Smi(0).is_truthy());
    /// assert!(!Value::Double(f64::NAN).is_truthy());
    /// assert!(Value::String("a".to_string()).is_truthy());
    /// ```
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Smi(n) => *n != 0,
            Value::Double(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::BigInt(n) => !n.is_zero(),
            Value::Symbol(_) | Value::Object(_) | Value::Foreign(_) => true,
        }
    }

    /// Returns the JavaScript typeof result for this value.
    ///
    /// Callable objects are not distinguished here; every native object
    /// reports "object".
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Smi(_) | Value::Double(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::BigInt(_) => "bigint",
            Value::Object(_) | Value::Foreign(_) => "object",
        }
    }

    /// Returns true for `undefined` and `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns the object handle if this is a native object.
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the primitive kind, or `None` for nullish values and objects.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            Value::Boolean(_) => Some(PrimitiveKind::Boolean),
            Value::Smi(_) | Value::Double(_) => Some(PrimitiveKind::Number),
            Value::String(_) => Some(PrimitiveKind::String),
            Value::Symbol(_) => Some(PrimitiveKind::Symbol),
            Value::BigInt(_) => Some(PrimitiveKind::BigInt),
            Value::Undefined | Value::Null | Value::Object(_) | Value::Foreign(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Smi(n) => write!(f, "{}", n),
            Value::Double(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    if n.is_sign_positive() {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Symbol(id) => write!(f, "Symbol({})", id.0),
            Value::BigInt(n) => write!(f, "{}n", n),
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Foreign(_) => write!(f, "[foreign object]"),
        }
    }
}
