//! Shader Library
//!
//! Front door of the composition system. Owns the chunk store and the
//! assembled-source cache, and exposes the material-to-source path as a
//! handful of calls.
//!
//! ## Two entry points
//!
//! | Method | Use case | Input |
//! |--------|----------|-------|
//! | [`ShaderLibrary::build_program`]   | Standard materials | [`MaterialConfig`] |
//! | [`ShaderLibrary::get_or_assemble`] | Custom chunk lists | [`StageRequest`]   |
//!
//! Compilation is left to the host through [`ShaderCompiler`]; a
//! [`ProgramCache`] deduplicates compiled programs by [`ProgramKey`].

use std::fmt;
use std::sync::Arc;

use super::cache::{CacheStats, VariantCache};
use super::chunk_store::ChunkStore;
use super::features::{FeatureSetBuilder, ProgramRequest};
use super::layout::StageLayout;
use super::pipeline_key::{PermutationKey, ProgramKey};
use super::shader_gen::{AssembledSource, Assembler, StageRequest};
use super::stage::ShaderStage;
use crate::errors::{Result, WeaveError};
use crate::renderer::settings::LibrarySettings;
use crate::resources::material::MaterialConfig;
use crate::utils::interner;

/// Assembled sources of both stages of one program.
#[derive(Debug, Clone)]
pub struct ProgramSources {
    pub key: ProgramKey,
    pub vertex: Arc<AssembledSource>,
    pub fragment: Arc<AssembledSource>,
}

/// Thread-safe shader library.
///
/// Shared by reference (or `Arc`) across render threads; all methods take
/// `&self`.
pub struct ShaderLibrary {
    store: Arc<ChunkStore>,
    sources: VariantCache<PermutationKey, AssembledSource>,
    settings: LibrarySettings,
}

impl fmt::Debug for ShaderLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderLibrary")
            .field("chunks", &self.store.len())
            .field("sources", &self.sources.len())
            .field("settings", &self.settings)
            .finish()
    }
}

impl ShaderLibrary {
    /// Creates a library over `store`.
    ///
    /// Fails with [`WeaveError::UnknownChunk`] if the store lacks a chunk the
    /// standard layouts name.
    pub fn new(store: Arc<ChunkStore>, settings: LibrarySettings) -> Result<Self> {
        for stage in ShaderStage::ALL {
            StageLayout::standard(stage).validate(&store)?;
        }

        interner::preload_common_flags();
        log::debug!(
            "Shader library ready: {} chunks, source cache capacity {:?}",
            store.len(),
            settings.source_cache_capacity
        );

        Ok(Self {
            store,
            sources: VariantCache::new(settings.source_cache_capacity),
            settings,
        })
    }

    /// Creates a library over the embedded chunk library.
    pub fn with_builtin_chunks(settings: LibrarySettings) -> Result<Self> {
        let store = ChunkStore::with_builtin_chunks()?;
        Self::new(Arc::new(store), settings)
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<ChunkStore> {
        &self.store
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &LibrarySettings {
        &self.settings
    }

    /// Derives the request of one stage from a material.
    pub fn stage_request(&self, material: &MaterialConfig, stage: ShaderStage) -> Result<StageRequest> {
        Ok(FeatureSetBuilder::new(material)?.stage_request(StageLayout::standard(stage)))
    }

    /// Derives the requests of both stages from a material.
    pub fn program_request(&self, material: &MaterialConfig) -> Result<ProgramRequest> {
        Ok(FeatureSetBuilder::new(material)?.program_request())
    }

    pub fn permutation_key(&self, request: &StageRequest) -> Result<PermutationKey> {
        PermutationKey::build(&self.store, request)
    }

    /// Assembles `request` without consulting the cache.
    pub fn assemble(&self, request: &StageRequest) -> Result<AssembledSource> {
        Assembler::new(&self.store).assemble_keyed(request)
    }

    /// Returns the cached source of `request`, assembling it on first use.
    ///
    /// Concurrent callers with the same key wait for a single assembly.
    pub fn get_or_assemble(&self, request: &StageRequest) -> Result<Arc<AssembledSource>> {
        let key = self.permutation_key(request)?;

        self.sources.get_or_build(key, || {
            let source = Assembler::new(&self.store).assemble(request)?;
            if self.settings.trace_sources {
                trace_source(key, &source);
            }
            Ok(AssembledSource::new(key, source))
        })
    }

    /// Assembles (or fetches) both stages of a material's program.
    pub fn build_program(&self, material: &MaterialConfig) -> Result<ProgramSources> {
        let request = self.program_request(material)?;
        let vertex = self.get_or_assemble(&request.vertex)?;
        let fragment = self.get_or_assemble(&request.fragment)?;

        Ok(ProgramSources {
            key: ProgramKey {
                vertex: vertex.key(),
                fragment: fragment.key(),
            },
            vertex,
            fragment,
        })
    }

    #[must_use]
    pub fn cached_sources(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.sources.stats()
    }

    /// Drops every cached source.
    pub fn clear_cache(&self) {
        self.sources.clear();
    }
}

fn trace_source(key: PermutationKey, source: &str) {
    fn normalize_newlines(s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        let mut last_was_newline = false;
        for c in s.chars() {
            if c == '\n' {
                if !last_was_newline {
                    result.push('\n');
                    last_was_newline = true;
                }
            } else {
                result.push(c);
                last_was_newline = false;
            }
        }
        result
    }

    log::trace!(
        "================= Assembled Shader {} ==================\n{}",
        key,
        normalize_newlines(source)
    );
}

// ─── Compilation ──────────────────────────────────────────────────────────────

/// Host-side compiler turning assembled sources into a program object.
pub trait ShaderCompiler: Send + Sync {
    type Program: Send + Sync;
    type Error: fmt::Display;

    fn compile(&self, sources: &ProgramSources) -> std::result::Result<Self::Program, Self::Error>;
}

/// Compiled programs of one [`ShaderLibrary`], deduplicated by [`ProgramKey`].
///
/// A [`ProgramKey`] names chunks, not their text, so the cache holds the
/// library whose sources it compiles.
///
/// Failed compilations are reported to every waiting caller and are not
/// cached; the next request retries.
pub struct ProgramCache<C: ShaderCompiler> {
    compiler: C,
    library: Arc<ShaderLibrary>,
    programs: VariantCache<ProgramKey, C::Program>,
}

impl<C: ShaderCompiler> ProgramCache<C> {
    /// Capacity comes from the library's `program_cache_capacity`.
    #[must_use]
    pub fn new(compiler: C, library: Arc<ShaderLibrary>) -> Self {
        let programs = VariantCache::new(library.settings().program_cache_capacity);
        Self {
            compiler,
            library,
            programs,
        }
    }

    #[inline]
    #[must_use]
    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    #[inline]
    #[must_use]
    pub fn library(&self) -> &Arc<ShaderLibrary> {
        &self.library
    }

    /// Returns the compiled program of `material`, compiling it on first use.
    pub fn get_or_compile(&self, material: &MaterialConfig) -> Result<Arc<C::Program>> {
        let sources = self.library.build_program(material)?;
        self.programs.get_or_build(sources.key, || {
            log::debug!("Compiling program {}", sources.key);
            self.compiler
                .compile(&sources)
                .map_err(|e| WeaveError::Compilation(e.to_string()))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.programs.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::material::Attribute;
    use crate::resources::material_builder::StandardMaterialBuilder;

    fn library() -> ShaderLibrary {
        ShaderLibrary::with_builtin_chunks(LibrarySettings::default()).unwrap()
    }

    #[test]
    fn test_new_rejects_incomplete_store() {
        let mut store = ChunkStore::new();
        store.register("base", ShaderStage::Vertex, "").unwrap();

        let err = ShaderLibrary::new(Arc::new(store), LibrarySettings::default()).unwrap_err();
        assert!(matches!(err, WeaveError::UnknownChunk { .. }));
    }

    #[test]
    fn test_equal_materials_share_sources() {
        let library = library();
        let material = StandardMaterialBuilder::new().map(Attribute::Gloss, "g", 0).build();

        let a = library.build_program(&material).unwrap();
        let b = library.build_program(&material.clone()).unwrap();

        assert_eq!(a.key, b.key);
        assert!(Arc::ptr_eq(&a.fragment, &b.fragment));
        assert_eq!(library.cached_sources(), 2);
        assert_eq!(library.cache_stats().builds, 2);
        assert_eq!(library.cache_stats().hits, 2);
    }

    #[test]
    fn test_cached_and_uncached_assembly_agree() {
        let library = library();
        let material = StandardMaterialBuilder::new().vertex_color(Attribute::Diffuse, "rgb").build();
        let request = library.stage_request(&material, ShaderStage::Fragment).unwrap();

        let cached = library.get_or_assemble(&request).unwrap();
        let fresh = library.assemble(&request).unwrap();
        assert_eq!(*cached, fresh);
    }

    #[test]
    fn test_clear_cache() {
        let library = library();
        library.build_program(&MaterialConfig::default()).unwrap();
        library.clear_cache();
        assert_eq!(library.cached_sources(), 0);
    }
}
