//! Global String Interner
//!
//! Maps flag names and enum values to compact integer [`Symbol`]s so feature
//! sets compare and hash as integers.
//!
//! Symbol order follows intern order, not string order. Anything that needs a
//! canonical order across processes (permutation keys) must sort by the
//! resolved string.

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact integer handle for an interned string.
pub type Symbol = Spur;

/// Interns a string, returning the existing symbol if already present.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up a string without interning it.
#[inline]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a symbol back to its string.
#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// Pre-interns the flag vocabulary of the built-in chunk library so the hot
/// path only performs lookups.
pub fn preload_common_flags() {
    let common = [
        // Attribute-scoped
        "MAPFLOAT",
        "MAPTEXTURE",
        "MAPVERTEX",
        "MAPINVERT",
        // Stage-scoped
        "UV0",
        "UV1",
        "VERTEX_COLOR",
        "METALNESS",
        "CLEARCOAT",
        "ALPHA_MODE",
        // Enum values
        "OPAQUE",
        "MASK",
        "BLEND",
    ];

    for name in common {
        intern(name);
    }
}
