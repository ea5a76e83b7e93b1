#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod errors;
pub mod renderer;
pub mod resources;
pub mod utils;

pub use errors::{Result, WeaveError};
pub use renderer::pipeline::{
    AssembledSource, Assembler, ChunkInvocation, ChunkStore, PermutationKey, ProgramKey, ShaderStage, StageRequest,
    TokenBindings, TokenKind,
};
pub use renderer::{LibrarySettings, ProgramCache, ProgramSources, ShaderCompiler, ShaderLibrary};
pub use resources::{AlphaMode, Attribute, AttributeSource, FeatureSet, MaterialConfig, StandardMaterialBuilder};
pub use utils::interner;
