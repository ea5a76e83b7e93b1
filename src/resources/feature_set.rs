//! Feature Set
//!
//! The flag vocabulary chunks are evaluated against. A [`FeatureSet`] maps an
//! interned flag name to a [`FeatureValue`] (boolean or enum symbol) and is
//! built once per (material, shader stage).
//!
//! # Architecture
//!
//! Flags are stored in a `Vec<(Symbol, FeatureValue)>` kept sorted by symbol,
//! so two sets with the same content always hash and compare equal regardless
//! of insertion order.
//!
//! A chunk invocation sees the stage set overlaid with its own local set
//! through a [`FeatureScope`]; local values shadow stage values.
//!
//! # Usage
//!
//! ```rust,ignore
//! use shader_weave::resources::FeatureSet;
//!
//! let mut features = FeatureSet::new();
//! features.set_flag("MAPTEXTURE", true);
//! features.set_enum("ALPHA_MODE", "BLEND");
//!
//! assert!(features.is_enabled("MAPTEXTURE"));
//! assert!(!features.is_enabled("MAPVERTEX")); // absent flags read as false
//! ```

use std::hash::{Hash, Hasher};

use crate::utils::interner::{self, Symbol};

/// Value of a single feature flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureValue {
    Bool(bool),
    Enum(Symbol),
}

impl FeatureValue {
    /// Whether the flag counts as defined for `#ifdef` purposes.
    #[inline]
    #[must_use]
    pub fn is_set(self) -> bool {
        match self {
            FeatureValue::Bool(enabled) => enabled,
            FeatureValue::Enum(_) => true,
        }
    }

    /// The enum symbol, if this is an enum value.
    #[inline]
    #[must_use]
    pub fn as_enum(self) -> Option<Symbol> {
        match self {
            FeatureValue::Enum(sym) => Some(sym),
            FeatureValue::Bool(_) => None,
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(enabled: bool) -> Self {
        FeatureValue::Bool(enabled)
    }
}

/// A collection of feature flags for one material and shader stage.
///
/// # Performance
///
/// - Insertion/lookup: O(log n) due to binary search
/// - Comparison and hashing: O(n) over integer pairs
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    flags: Vec<(Symbol, FeatureValue)>,
}

impl FeatureSet {
    /// Create an empty feature set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { flags: Vec::new() }
    }

    /// Set a boolean flag (maintains sorted order)
    pub fn set_flag(&mut self, key: &str, enabled: bool) {
        self.set_symbol(interner::intern(key), FeatureValue::Bool(enabled));
    }

    /// Set an enum flag
    pub fn set_enum(&mut self, key: &str, value: &str) {
        self.set_symbol(
            interner::intern(key),
            FeatureValue::Enum(interner::intern(value)),
        );
    }

    /// Set a flag using an already interned key
    #[inline]
    pub fn set_symbol(&mut self, key: Symbol, value: FeatureValue) {
        match self.flags.binary_search_by_key(&key, |&(k, _)| k) {
            Ok(idx) => {
                self.flags[idx].1 = value;
            }
            Err(idx) => {
                self.flags.insert(idx, (key, value));
            }
        }
    }

    /// Builder-style [`set_flag`](Self::set_flag)
    #[must_use]
    pub fn with_flag(mut self, key: &str, enabled: bool) -> Self {
        self.set_flag(key, enabled);
        self
    }

    /// Builder-style [`set_enum`](Self::set_enum)
    #[must_use]
    pub fn with_enum(mut self, key: &str, value: &str) -> Self {
        self.set_enum(key, value);
        self
    }

    /// Check whether a flag is present (with any value)
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        interner::get(key).is_some_and(|key_sym| self.get_symbol(key_sym).is_some())
    }

    /// Check whether a flag reads as defined. Absent flags read as false.
    #[must_use]
    pub fn is_enabled(&self, key: &str) -> bool {
        self.get(key).is_some_and(FeatureValue::is_set)
    }

    /// Get a flag value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<FeatureValue> {
        interner::get(key).and_then(|key_sym| self.get_symbol(key_sym))
    }

    /// Get a flag value using Symbol
    #[inline]
    #[must_use]
    pub fn get_symbol(&self, key: Symbol) -> Option<FeatureValue> {
        self.flags
            .binary_search_by_key(&key, |&(k, _)| k)
            .ok()
            .map(|idx| self.flags[idx].1)
    }

    /// Clear all flags
    #[inline]
    pub fn clear(&mut self) {
        self.flags.clear();
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Iterate all flags (as Symbols)
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &(Symbol, FeatureValue)> {
        self.flags.iter()
    }
}

impl Hash for FeatureSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.flags.hash(state);
    }
}

impl PartialEq for FeatureSet {
    fn eq(&self, other: &Self) -> bool {
        self.flags == other.flags
    }
}

impl Eq for FeatureSet {}

/// Read view of the flags visible to one chunk invocation.
#[derive(Debug, Clone, Copy)]
pub struct FeatureScope<'a> {
    local: Option<&'a FeatureSet>,
    stage: &'a FeatureSet,
}

impl<'a> FeatureScope<'a> {
    #[must_use]
    pub fn new(stage: &'a FeatureSet, local: Option<&'a FeatureSet>) -> Self {
        Self { local, stage }
    }

    /// Looks the flag up in the local set first, then the stage set.
    #[must_use]
    pub fn get(&self, key: Symbol) -> Option<FeatureValue> {
        self.local
            .and_then(|local| local.get_symbol(key))
            .or_else(|| self.stage.get_symbol(key))
    }

    #[must_use]
    pub fn is_set(&self, key: Symbol) -> bool {
        self.get(key).is_some_and(FeatureValue::is_set)
    }
}
