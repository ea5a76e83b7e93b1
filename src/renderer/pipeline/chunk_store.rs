//! Chunk Store
//!
//! Immutable library of parsed shader chunks keyed by `(name, stage)`.
//!
//! The store is filled once during start-up (built-in library plus any
//! host-registered chunks) and then shared as `Arc<ChunkStore>`; all lookups
//! take `&self` and need no locking.
//!
//! The built-in library lives in `src/renderer/pipeline/chunks/{vert,frag}`
//! and is embedded into the binary. The directory names the stage and the
//! file stem names the chunk.

use std::collections::BTreeMap;

use rust_embed::RustEmbed;

use super::stage::ShaderStage;
use super::template::Template;
use crate::errors::{Result, WeaveError};

#[derive(RustEmbed)]
#[folder = "src/renderer/pipeline/chunks"]
struct ChunkAssets;

/// A registered chunk: its template text as registered, plus the parsed template.
#[derive(Debug, Clone)]
pub struct Chunk {
    name: String,
    stage: ShaderStage,
    source: String,
    template: Template,
}

impl Chunk {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Template text exactly as registered.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn template(&self) -> &Template {
        &self.template
    }
}

/// Library of chunks, write-once then read-only.
#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: BTreeMap<(ShaderStage, String), Chunk>,
}

impl ChunkStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the embedded chunk library.
    pub fn with_builtin_chunks() -> Result<Self> {
        let mut store = Self::new();
        store.register_builtin_chunks()?;
        Ok(store)
    }

    /// Parses and registers a chunk.
    pub fn register(&mut self, name: &str, stage: ShaderStage, template_text: &str) -> Result<()> {
        let key = (stage, name.to_string());
        if self.chunks.contains_key(&key) {
            return Err(WeaveError::DuplicateChunk {
                name: name.to_string(),
                stage,
            });
        }

        let template = Template::parse(name, template_text)?;
        self.chunks.insert(
            key,
            Chunk {
                name: name.to_string(),
                stage,
                source: template_text.to_string(),
                template,
            },
        );
        Ok(())
    }

    /// Registers every chunk of the embedded library.
    pub fn register_builtin_chunks(&mut self) -> Result<()> {
        let mut paths: Vec<_> = ChunkAssets::iter().collect();
        paths.sort();

        for path in paths {
            let (stage, name) = parse_chunk_path(&path)?;
            let Some(file) = ChunkAssets::get(&path) else {
                return Err(WeaveError::ChunkLibrary(format!("missing embedded file '{path}'")));
            };
            let text = std::str::from_utf8(file.data.as_ref()).map_err(|e| {
                WeaveError::ChunkLibrary(format!("'{path}' is not valid UTF-8: {e}"))
            })?;
            self.register(name, stage, text)?;
        }

        log::debug!("Registered {} built-in shader chunks", self.chunks.len());
        Ok(())
    }

    pub fn get(&self, name: &str, stage: ShaderStage) -> Result<&Chunk> {
        self.chunks
            .get(&(stage, name.to_string()))
            .ok_or_else(|| WeaveError::UnknownChunk {
                name: name.to_string(),
                stage,
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str, stage: ShaderStage) -> bool {
        self.chunks.contains_key(&(stage, name.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterates chunks ordered by stage, then name.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }
}

/// `frag/gloss.glsl` → (Fragment, "gloss")
fn parse_chunk_path(path: &str) -> Result<(ShaderStage, &str)> {
    let invalid = || WeaveError::ChunkLibrary(format!("unexpected chunk path '{path}'"));

    let (dir, file) = path.split_once('/').ok_or_else(invalid)?;
    let stage = ShaderStage::from_dir_name(dir).ok_or_else(invalid)?;
    let name = file
        .strip_suffix(".glsl")
        .filter(|name| !name.is_empty() && !name.contains('/'))
        .ok_or_else(invalid)?;
    Ok((stage, name))
}
