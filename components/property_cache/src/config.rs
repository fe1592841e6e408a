//! Cache and layout tuning.

use object_model::{HeapConfig, ObjectHeap, DEFAULT_MAX_INLINE_SLOTS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inline_cache::MAX_POLYMORPHIC_ENTRIES;

/// Invalid [`CacheConfig`] value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A limit is outside its accepted range
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Offending field
        field: &'static str,
        /// Smallest accepted value
        min: usize,
        /// Largest accepted value
        max: usize,
        /// Supplied value
        value: usize,
    },
    /// A heap was built with a different layout policy than the caches
    #[error("heap {field} is {actual}, but the caches were configured with {expected}")]
    HeapMismatch {
        /// Layout field that differs
        field: &'static str,
        /// Value in this configuration
        expected: usize,
        /// Value the heap uses
        actual: usize,
    },
}

/// Tuning knobs for inline caches and object layout.
///
/// # Example
///
/// ```
/// use property_cache::CacheConfig;
///
/// let config = CacheConfig::default().with_property_cache_limit(2);
/// assert!(config.validate().is_ok());
/// assert!(CacheConfig::default().with_property_cache_limit(0).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries per read/has chain before the site goes generic
    pub property_cache_limit: usize,
    /// Prototypes cached per construction site
    pub construct_cache_limit: usize,
    /// Inline slots per shape lineage
    pub max_inline_slots: u32,
    /// Own-property count at which an object switches to dictionary mode
    pub dictionary_mode_threshold: usize,
    /// Data-only literals with more members start in dictionary mode
    pub literal_dictionary_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            property_cache_limit: 5,
            construct_cache_limit: 5,
            max_inline_slots: DEFAULT_MAX_INLINE_SLOTS,
            dictionary_mode_threshold: 128,
            literal_dictionary_threshold: 400,
        }
    }
}

impl CacheConfig {
    /// Sets the read/has chain capacity.
    pub fn with_property_cache_limit(mut self, limit: usize) -> Self {
        self.property_cache_limit = limit;
        self
    }

    /// Sets the construction cache capacity.
    pub fn with_construct_cache_limit(mut self, limit: usize) -> Self {
        self.construct_cache_limit = limit;
        self
    }

    /// Sets the number of inline slots per shape lineage.
    pub fn with_max_inline_slots(mut self, slots: u32) -> Self {
        self.max_inline_slots = slots;
        self
    }

    /// Sets the dictionary-mode threshold for ordinary objects.
    pub fn with_dictionary_mode_threshold(mut self, threshold: usize) -> Self {
        self.dictionary_mode_threshold = threshold;
        self
    }

    /// Sets the dictionary-mode threshold for object literals.
    pub fn with_literal_dictionary_threshold(mut self, threshold: usize) -> Self {
        self.literal_dictionary_threshold = threshold;
        self
    }

    /// Checks every limit against its accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("property_cache_limit", self.property_cache_limit, 1, MAX_POLYMORPHIC_ENTRIES)?;
        check_range("construct_cache_limit", self.construct_cache_limit, 1, MAX_POLYMORPHIC_ENTRIES)?;
        check_range("dictionary_mode_threshold", self.dictionary_mode_threshold, 1, usize::MAX)?;
        check_range("literal_dictionary_threshold", self.literal_dictionary_threshold, 1, usize::MAX)?;
        Ok(())
    }

    /// Layout policy for an [`object_model::ObjectHeap`] used with these caches.
    pub fn heap_config(&self) -> HeapConfig {
        HeapConfig {
            max_inline_slots: self.max_inline_slots,
            dictionary_mode_threshold: self.dictionary_mode_threshold,
        }
    }
}

impl CacheConfig {
    /// Checks that `heap` follows this configuration's layout policy,
    /// including the inline slot limit of its shape tree.
    ///
    /// # Errors
    ///
    /// The first layout field on which they disagree.
    pub fn check_heap(&self, heap: &ObjectHeap) -> Result<(), ConfigError> {
        let actual = heap.config();
        check_same(
            "max_inline_slots",
            self.max_inline_slots as usize,
            actual.max_inline_slots as usize,
        )?;
        check_same(
            "max_inline_slots",
            self.max_inline_slots as usize,
            heap.shapes().max_inline_slots() as usize,
        )?;
        check_same(
            "dictionary_mode_threshold",
            self.dictionary_mode_threshold,
            actual.dictionary_mode_threshold,
        )
    }
}

fn check_same(field: &'static str, expected: usize, actual: usize) -> Result<(), ConfigError> {
    if expected != actual {
        return Err(ConfigError::HeapMismatch {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

fn check_range(field: &'static str, value: usize, min: usize, max: usize) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}
