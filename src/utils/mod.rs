//! Utility Module
//!
//! - [`interner`]: String interning for flag names and enum values
//!
//! # String Interning
//!
//! Interned strings (Symbols) compare in O(1), which keeps feature set
//! lookups cheap during assembly.
//!
//! ```rust,ignore
//! use shader_weave::utils::interner;
//!
//! let sym1 = interner::intern("MAPTEXTURE");
//! let sym2 = interner::intern("MAPTEXTURE");
//! assert_eq!(sym1, sym2); // O(1) comparison
//! ```

pub mod interner;

pub use interner::Symbol;
