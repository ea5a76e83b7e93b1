//! Shader composition pipeline
//!
//! Turns chunk templates plus feature sets into stage sources:
//! - chunk_store: named template registry and the embedded chunk library
//! - template: conditional-block parsing and evaluation
//! - tokens: `$`-token substitution
//! - features / layout: material translation into stage requests
//! - pipeline_key: permutation identity
//! - shader_gen: source assembly
//! - cache: build-once variant cache
//! - shader_manager: library facade and program compilation

pub mod cache;
pub mod chunk_store;
pub mod features;
pub mod layout;
pub mod pipeline_key;
pub mod shader_gen;
pub mod shader_manager;
pub mod stage;
pub mod template;
pub mod tokens;

pub use cache::{CacheStats, VariantCache};
pub use chunk_store::{Chunk, ChunkStore};
pub use features::{FeatureSetBuilder, ProgramRequest};
pub use layout::{ChunkSlot, SlotCondition, StageLayout};
pub use pipeline_key::{PermutationKey, ProgramKey};
pub use shader_gen::{AssembledSource, Assembler, ChunkInvocation, StageRequest};
pub use shader_manager::{ProgramCache, ProgramSources, ShaderCompiler, ShaderLibrary};
pub use stage::ShaderStage;
pub use template::{Guard, GuardTest, Template};
pub use tokens::{TokenBindings, TokenKind, TokenKinds, TokenResolver};
