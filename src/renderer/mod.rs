//! Shader composition and variant management.
//!
//! - [`pipeline`]: chunk store, template evaluation, assembly, keys and caches
//! - [`settings`]: library configuration

pub mod pipeline;
pub mod settings;

pub use pipeline::{ProgramCache, ProgramSources, ShaderCompiler, ShaderLibrary};
pub use settings::LibrarySettings;
