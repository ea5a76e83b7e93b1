//! Library Settings
//!
//! Tuning knobs of [`ShaderLibrary`](crate::renderer::ShaderLibrary).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::num::NonZeroUsize;
//! use shader_weave::renderer::LibrarySettings;
//!
//! // Default: unbounded caches, no source tracing
//! let settings = LibrarySettings::default();
//!
//! // Bounded source cache with generated code dumped at trace level
//! let settings = LibrarySettings {
//!     source_cache_capacity: NonZeroUsize::new(256),
//!     trace_sources: true,
//!     ..Default::default()
//! };
//! ```
//!
//! Settings are plain data and deserialize from host configuration files.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Maximum number of assembled stage sources kept. `None` is unbounded.
    pub source_cache_capacity: Option<NonZeroUsize>,

    /// Maximum number of compiled programs kept. `None` is unbounded.
    pub program_cache_capacity: Option<NonZeroUsize>,

    /// Logs every newly assembled source at `trace` level.
    pub trace_sources: bool,
}
