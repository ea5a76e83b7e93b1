//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`WeaveError`] covers every failure mode of chunk
//! loading, material translation, assembly, and compilation:
//! - Chunk library errors (duplicate / unknown chunks, template syntax)
//! - Material authoring errors (unsupported configurations)
//! - Invocation wiring errors (unbound tokens)
//! - External compiler diagnostics
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, WeaveError>`.
//!
//! ```rust,ignore
//! use shader_weave::errors::{WeaveError, Result};
//!
//! fn load_chunks() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```
//!
//! Errors are `Clone`: a single failed build is delivered to every caller that
//! was waiting on the same permutation.

use thiserror::Error;

use crate::renderer::pipeline::stage::ShaderStage;
use crate::renderer::pipeline::tokens::TokenKind;

/// The main error type for shader chunk composition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeaveError {
    // ========================================================================
    // Chunk Library Errors (load-time, fatal)
    // ========================================================================
    /// A chunk with the same name is already registered for this stage.
    #[error("Duplicate chunk: '{name}' is already registered for the {stage} stage")]
    DuplicateChunk {
        /// Chunk name
        name: String,
        /// Stage the chunk was registered for
        stage: ShaderStage,
    },

    /// No chunk with this name exists for this stage.
    #[error("Unknown chunk: '{name}' is not registered for the {stage} stage")]
    UnknownChunk {
        /// Chunk name
        name: String,
        /// Stage that was searched
        stage: ShaderStage,
    },

    /// The chunk template could not be parsed.
    #[error("Template syntax error in chunk '{chunk}' at line {line}: {message}")]
    TemplateSyntax {
        /// Chunk being parsed
        chunk: String,
        /// 1-based line of the offending construct
        line: usize,
        /// Description of the offending construct
        message: String,
    },

    /// The embedded chunk library is malformed (bad path, non UTF-8 text).
    #[error("Chunk library error: {0}")]
    ChunkLibrary(String),

    // ========================================================================
    // Material Errors (recoverable by the caller)
    // ========================================================================
    /// The material configuration cannot be expressed by the chunk library.
    #[error("Unsupported material configuration for '{attribute}': {reason}")]
    UnsupportedConfiguration {
        /// Material attribute (or feature) at fault
        attribute: String,
        /// Why it is unsupported
        reason: String,
    },

    // ========================================================================
    // Assembly Errors (fatal for that permutation)
    // ========================================================================
    /// A placeholder token in retained chunk text has no binding.
    #[error("Unbound token ${kind} in chunk '{chunk}'")]
    UnboundToken {
        /// Token kind without a binding
        kind: TokenKind,
        /// Chunk containing the token
        chunk: String,
    },

    // ========================================================================
    // Build & Compilation Errors
    // ========================================================================
    /// The external compiler rejected the assembled program.
    #[error("Shader compilation failed: {0}")]
    Compilation(String),

    /// A build for this permutation panicked before producing a result.
    #[error("Variant build abandoned: {0}")]
    BuildAbandoned(String),
}

impl WeaveError {
    pub(crate) fn unsupported(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        WeaveError::UnsupportedConfiguration {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }
}

/// Alias for `Result<T, WeaveError>`.
pub type Result<T> = std::result::Result<T, WeaveError>;
