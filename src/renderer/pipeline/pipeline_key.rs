//! Permutation keys.
//!
//! A [`PermutationKey`] identifies one assembled stage source. It is derived
//! from the stage's ordered chunk invocations, and for each invocation only
//! from what the chunk can observe:
//!
//! - the chunk name,
//! - the values of the flags its guards reference (sorted by flag name),
//! - the bindings of the token kinds its template contains.
//!
//! Flags a chunk never tests and bindings for tokens it never uses do not
//! enter the key, so unrelated material differences share one variant.
//! Absent flags and `false` flags are encoded identically since guards cannot
//! tell them apart.
//!
//! The canonical tuple is streamed through xxh3-128 with length-prefixed
//! fields. Identical keys imply byte-identical assembled source.

use std::fmt;

use xxhash_rust::xxh3::Xxh3;

use super::chunk_store::ChunkStore;
use super::shader_gen::StageRequest;
use super::stage::ShaderStage;
use crate::errors::Result;
use crate::resources::feature_set::{FeatureScope, FeatureValue};
use crate::utils::interner;

/// Identity of one assembled stage variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermutationKey {
    stage: ShaderStage,
    digest: u128,
}

impl PermutationKey {
    /// Computes the key of `request` against the chunks registered in `store`.
    pub fn build(store: &ChunkStore, request: &StageRequest) -> Result<Self> {
        let mut writer = KeyWriter::new();
        writer.write_str(request.stage.as_str());
        writer.write_len(request.invocations.len());

        for invocation in &request.invocations {
            let chunk = store.get(&invocation.chunk, request.stage)?;
            let template = chunk.template();
            let scope = FeatureScope::new(&request.features, Some(&invocation.features));

            writer.write_str(chunk.name());

            writer.write_len(template.referenced_flags().len());
            for &flag in template.referenced_flags() {
                writer.write_str(interner::resolve(flag));
                match scope.get(flag) {
                    None | Some(FeatureValue::Bool(false)) => writer.write_tag(0),
                    Some(FeatureValue::Bool(true)) => writer.write_tag(1),
                    Some(FeatureValue::Enum(value)) => {
                        writer.write_tag(2);
                        writer.write_str(interner::resolve(value));
                    }
                }
            }

            writer.write_len(template.tokens().kinds().count());
            for kind in template.tokens().kinds() {
                writer.write_str(kind.marker());
                match invocation.bindings.get(kind) {
                    Some(value) => {
                        writer.write_tag(1);
                        writer.write_str(value);
                    }
                    None => writer.write_tag(0),
                }
            }
        }

        Ok(Self {
            stage: request.stage,
            digest: writer.finish(),
        })
    }

    #[inline]
    #[must_use]
    pub fn stage(self) -> ShaderStage {
        self.stage
    }

    /// xxh3-128 digest of the canonical permutation tuple.
    #[inline]
    #[must_use]
    pub fn digest(self) -> u128 {
        self.digest
    }
}

impl fmt::Display for PermutationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:032x}", self.stage, self.digest)
    }
}

/// Identity of a linked program: one key per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramKey {
    pub vertex: PermutationKey,
    pub fragment: PermutationKey,
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} | {}]", self.vertex, self.fragment)
    }
}

struct KeyWriter {
    hasher: Xxh3,
}

impl KeyWriter {
    fn new() -> Self {
        Self {
            hasher: Xxh3::new(),
        }
    }

    fn write_len(&mut self, len: usize) {
        self.hasher.update(&(len as u64).to_le_bytes());
    }

    fn write_tag(&mut self, tag: u8) {
        self.hasher.update(&[tag]);
    }

    fn write_str(&mut self, value: &str) {
        self.write_len(value.len());
        self.hasher.update(value.as_bytes());
    }

    fn finish(&self) -> u128 {
        self.hasher.digest128()
    }
}
