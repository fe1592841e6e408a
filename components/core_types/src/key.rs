//! Canonical property keys.
//!
//! The surrounding runtime normalizes every property name to either a string
//! or a symbol before handing it to the object model. Anything else never
//! reaches the caches.

use std::fmt;
use std::sync::Arc;

/// Identity of a symbol value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

/// A canonical property key.
///
/// String keys share their backing storage, so cloning a key is cheap and
/// keys can be stored in shapes and cache entries without copying text.
///
/// # Examples
///
/// ```
/// use core_types::{PropertyKey, SymbolId};
///
/// let x = PropertyKey::from("x");
/// assert_eq!(x, PropertyKey::from(String::from("x")));
/// assert!(!x.is_symbol());
///
/// let sym = PropertyKey::from(SymbolId(7));
/// assert!(sym.is_symbol());
/// assert_eq!(sym.as_str(), None);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String-named property
    String(Arc<str>),
    /// Symbol-keyed property
    Symbol(SymbolId),
}

impl PropertyKey {
    /// Returns true for symbol keys.
    pub fn is_symbol(&self) -> bool {
        matches!(self, PropertyKey::Symbol(_))
    }

    /// Returns the key text for string keys.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyKey::String(s) => Some(s),
            PropertyKey::Symbol(_) => None,
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(Arc::from(s))
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::String(Arc::from(s))
    }
}

impl From<SymbolId> for PropertyKey {
    fn from(symbol: SymbolId) -> Self {
        PropertyKey::Symbol(symbol)
    }
}

impl fmt::Debug for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{:?}", s),
            PropertyKey::Symbol(id) => write!(f, "Symbol({})", id.0),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => f.write_str(s),
            PropertyKey::Symbol(id) => write!(f, "Symbol({})", id.0),
        }
    }
}
