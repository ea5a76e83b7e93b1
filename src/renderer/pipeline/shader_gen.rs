//! Shader Source Assembler
//!
//! Turns a [`StageRequest`] (ordered chunk invocations plus the stage feature
//! set) into final shading-language source:
//!
//! 1. look up each invocation's chunk in the [`ChunkStore`],
//! 2. evaluate its conditional blocks against the invocation's feature scope,
//! 3. substitute tokens from the invocation's bindings,
//! 4. append the result in request order.
//!
//! Nothing is inserted between chunks. A chunk whose blocks are all
//! discarded contributes nothing.

use std::borrow::Cow;
use std::fmt;

use super::chunk_store::ChunkStore;
use super::pipeline_key::PermutationKey;
use super::stage::ShaderStage;
use super::template::Segment;
use super::tokens::{TokenBindings, TokenResolver};
use crate::errors::Result;
use crate::resources::feature_set::{FeatureScope, FeatureSet};

/// One use of a chunk within a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInvocation {
    pub chunk: Cow<'static, str>,
    /// Flags scoped to this invocation; they shadow stage flags.
    pub features: FeatureSet,
    pub bindings: TokenBindings,
}

impl ChunkInvocation {
    #[must_use]
    pub fn new(chunk: impl Into<Cow<'static, str>>) -> Self {
        Self {
            chunk: chunk.into(),
            features: FeatureSet::new(),
            bindings: TokenBindings::new(),
        }
    }

    #[must_use]
    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = features;
        self
    }

    #[must_use]
    pub fn with_bindings(mut self, bindings: TokenBindings) -> Self {
        self.bindings = bindings;
        self
    }
}

/// Everything needed to assemble one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRequest {
    pub stage: ShaderStage,
    pub features: FeatureSet,
    /// Chunk invocations in pipeline order.
    pub invocations: Vec<ChunkInvocation>,
}

impl StageRequest {
    #[must_use]
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            features: FeatureSet::new(),
            invocations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = features;
        self
    }

    #[must_use]
    pub fn with_invocation(mut self, invocation: ChunkInvocation) -> Self {
        self.invocations.push(invocation);
        self
    }

    pub fn push(&mut self, invocation: ChunkInvocation) {
        self.invocations.push(invocation);
    }

    /// Names of the participating chunks, in order.
    pub fn chunk_names(&self) -> impl Iterator<Item = &str> {
        self.invocations.iter().map(|invocation| invocation.chunk.as_ref())
    }
}

/// Fully resolved source for one stage, tagged with its permutation key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledSource {
    key: PermutationKey,
    source: String,
}

impl AssembledSource {
    #[must_use]
    pub fn new(key: PermutationKey, source: String) -> Self {
        Self { key, source }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> PermutationKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.key.stage()
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl AsRef<str> for AssembledSource {
    fn as_ref(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for AssembledSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Stateless assembler over a chunk store.
#[derive(Debug, Clone, Copy)]
pub struct Assembler<'s> {
    store: &'s ChunkStore,
}

impl<'s> Assembler<'s> {
    #[must_use]
    pub fn new(store: &'s ChunkStore) -> Self {
        Self { store }
    }

    /// Assembles the full stage source.
    pub fn assemble(&self, request: &StageRequest) -> Result<String> {
        let mut source = String::new();
        let mut segments: Vec<Segment<'s>> = Vec::new();

        for invocation in &request.invocations {
            segments.clear();
            self.append_chunk(request.stage, &request.features, invocation, &mut segments, &mut source)?;
        }

        Ok(source)
    }

    /// Assembles and computes the permutation key in one call.
    pub fn assemble_keyed(&self, request: &StageRequest) -> Result<AssembledSource> {
        let key = PermutationKey::build(self.store, request)?;
        let source = self.assemble(request)?;
        Ok(AssembledSource::new(key, source))
    }

    fn append_chunk(
        &self,
        stage: ShaderStage,
        stage_features: &FeatureSet,
        invocation: &ChunkInvocation,
        segments: &mut Vec<Segment<'s>>,
        out: &mut String,
    ) -> Result<()> {
        let chunk = self.store.get(&invocation.chunk, stage)?;
        let scope = FeatureScope::new(stage_features, Some(&invocation.features));
        chunk.template().evaluate(&scope, segments);
        TokenResolver::resolve_into(chunk.name(), segments, &invocation.bindings, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WeaveError;
    use crate::renderer::pipeline::tokens::TokenKind;

    fn store() -> ChunkStore {
        let mut store = ChunkStore::new();
        store
            .register("decl", ShaderStage::Fragment, "uniform float u;\n")
            .unwrap();
        store
            .register("optional", ShaderStage::Fragment, "#ifdef MAPVERTEX\nv = vVertexColor.$VC;\n#endif\n")
            .unwrap();
        store
            .register("main", ShaderStage::Fragment, "void main() {}\n")
            .unwrap();
        store
    }

    #[test]
    fn test_concatenates_in_request_order() {
        let store = store();
        let request = StageRequest::new(ShaderStage::Fragment)
            .with_invocation(ChunkInvocation::new("main"))
            .with_invocation(ChunkInvocation::new("decl"));

        let source = Assembler::new(&store).assemble(&request).unwrap();
        assert_eq!(source, "void main() {}\nuniform float u;\n");
    }

    #[test]
    fn test_empty_chunk_contributes_nothing() {
        let store = store();
        let request = StageRequest::new(ShaderStage::Fragment)
            .with_invocation(ChunkInvocation::new("decl"))
            .with_invocation(ChunkInvocation::new("optional"))
            .with_invocation(ChunkInvocation::new("main"));

        let source = Assembler::new(&store).assemble(&request).unwrap();
        assert_eq!(source, "uniform float u;\nvoid main() {}\n");
    }

    #[test]
    fn test_local_features_scope_to_invocation() {
        let store = store();
        let bindings = TokenBindings::new().with(TokenKind::VertexChannel, "a");
        let request = StageRequest::new(ShaderStage::Fragment)
            .with_invocation(
                ChunkInvocation::new("optional")
                    .with_features(FeatureSet::new().with_flag("MAPVERTEX", true))
                    .with_bindings(bindings),
            )
            .with_invocation(ChunkInvocation::new("optional"));

        let source = Assembler::new(&store).assemble(&request).unwrap();
        assert_eq!(source, "v = vVertexColor.a;\n");
    }

    #[test]
    fn test_unbound_token_in_retained_text_fails() {
        let store = store();
        let request = StageRequest::new(ShaderStage::Fragment)
            .with_features(FeatureSet::new().with_flag("MAPVERTEX", true))
            .with_invocation(ChunkInvocation::new("optional"));

        let err = Assembler::new(&store).assemble(&request).unwrap_err();
        assert_eq!(
            err,
            WeaveError::UnboundToken {
                kind: TokenKind::VertexChannel,
                chunk: "optional".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_chunk_fails() {
        let store = store();
        let request = StageRequest::new(ShaderStage::Vertex).with_invocation(ChunkInvocation::new("decl"));

        assert!(matches!(
            Assembler::new(&store).assemble(&request),
            Err(WeaveError::UnknownChunk { .. })
        ));
    }
}
