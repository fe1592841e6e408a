//! Validity tokens.
//!
//! An [`Assumption`] starts out valid and can be invalidated exactly once.
//! Cache entries bind to the assumption of every shape they were specialized
//! for; an invalid assumption means the shape is no longer the authoritative
//! layout for its objects.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Raised by [`Assumption::check`] once the assumption has been invalidated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("assumption '{name}' is no longer valid")]
pub struct InvalidAssumption {
    /// Name of the failed assumption
    pub name: String,
}

/// One-way invalidatable flag.
///
/// Invalidation is published with release ordering and observed with acquire
/// ordering, so a thread that sees the token invalid also sees every write the
/// invalidating thread made before it (e.g. the successor of an obsolete
/// shape).
///
/// # Example
///
/// ```
/// use object_model::Assumption;
///
/// let token = Assumption::new("shape#3 not obsolete");
/// assert!(token.is_valid());
/// assert!(token.invalidate());
/// assert!(!token.is_valid());
/// assert!(!token.invalidate());
/// ```
pub struct Assumption {
    name: String,
    valid: AtomicBool,
}

impl Assumption {
    /// Creates a new, valid assumption.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Assumption {
            name: name.into(),
            valid: AtomicBool::new(true),
        })
    }

    /// Name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true until the assumption is invalidated.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Fails with [`InvalidAssumption`] if the assumption no longer holds.
    #[inline]
    pub fn check(&self) -> Result<(), InvalidAssumption> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(InvalidAssumption {
                name: self.name.clone(),
            })
        }
    }

    /// Invalidates the assumption.
    ///
    /// Returns true if this call performed the invalidation, false if the
    /// assumption was already invalid.
    pub fn invalidate(&self) -> bool {
        self.valid.swap(false, Ordering::AcqRel)
    }
}

impl fmt::Debug for Assumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assumption")
            .field("name", &self.name)
            .field("valid", &self.is_valid())
            .finish()
    }
}
