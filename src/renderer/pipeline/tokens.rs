//! Placeholder Tokens
//!
//! Chunks reference per-invocation strings through a fixed vocabulary of
//! placeholder tokens:
//!
//! | Marker     | Kind                           | Example binding     |
//! |------------|--------------------------------|---------------------|
//! | `$SAMPLER` | [`TokenKind::Sampler`]         | `texture_glossMap`  |
//! | `$UV`      | [`TokenKind::Uv`]              | `vUv0`              |
//! | `$CH`      | [`TokenKind::Channel`]         | `g`                 |
//! | `$VC`      | [`TokenKind::VertexChannel`]   | `a`                 |
//!
//! Bindings are passed explicitly with every chunk invocation; there is no
//! global token state.

use std::fmt;

use bitflags::bitflags;

use super::template::Segment;
use crate::errors::{Result, WeaveError};

/// One of the fixed placeholder kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    Sampler,
    Uv,
    Channel,
    VertexChannel,
}

impl TokenKind {
    pub const COUNT: usize = 4;
    pub const ALL: [TokenKind; Self::COUNT] = [
        TokenKind::Sampler,
        TokenKind::Uv,
        TokenKind::Channel,
        TokenKind::VertexChannel,
    ];

    /// Marker text following `$` in chunk templates.
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            TokenKind::Sampler => "SAMPLER",
            TokenKind::Uv => "UV",
            TokenKind::Channel => "CH",
            TokenKind::VertexChannel => "VC",
        }
    }

    #[must_use]
    pub fn from_marker(marker: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.marker() == marker)
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn bit(self) -> TokenKinds {
        match self {
            TokenKind::Sampler => TokenKinds::SAMPLER,
            TokenKind::Uv => TokenKinds::UV,
            TokenKind::Channel => TokenKinds::CHANNEL,
            TokenKind::VertexChannel => TokenKinds::VERTEX_CHANNEL,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

bitflags! {
    /// Set of token kinds appearing in a chunk template.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TokenKinds: u8 {
        const SAMPLER        = 1 << 0;
        const UV             = 1 << 1;
        const CHANNEL        = 1 << 2;
        const VERTEX_CHANNEL = 1 << 3;
    }
}

impl TokenKinds {
    /// Kinds in the set, in [`TokenKind::ALL`] order.
    pub fn kinds(self) -> impl Iterator<Item = TokenKind> {
        TokenKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(kind.bit()))
    }
}

/// Concrete strings for the tokens of one chunk invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TokenBindings {
    slots: [Option<String>; TokenKind::COUNT],
}

impl TokenBindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, kind: TokenKind, value: impl Into<String>) {
        self.slots[kind.index()] = Some(value.into());
    }

    #[must_use]
    pub fn with(mut self, kind: TokenKind, value: impl Into<String>) -> Self {
        self.bind(kind, value);
        self
    }

    #[must_use]
    pub fn get(&self, kind: TokenKind) -> Option<&str> {
        self.slots[kind.index()].as_deref()
    }

    #[must_use]
    pub fn is_bound(&self, kind: TokenKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TokenKind, &str)> {
        TokenKind::ALL
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|value| (kind, value)))
    }
}

/// Substitutes bound strings for the tokens of retained chunk text.
pub struct TokenResolver;

impl TokenResolver {
    /// Appends the resolved text of `segments` to `out`.
    ///
    /// On failure `out` is left exactly as it was passed in.
    pub fn resolve_into(
        chunk: &str,
        segments: &[Segment<'_>],
        bindings: &TokenBindings,
        out: &mut String,
    ) -> Result<()> {
        let start = out.len();
        for segment in segments {
            match *segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Token(kind) => {
                    if let Some(value) = bindings.get(kind) {
                        out.push_str(value);
                    } else {
                        out.truncate(start);
                        return Err(WeaveError::UnboundToken {
                            kind,
                            chunk: chunk.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolves `segments` into a fresh string.
    pub fn resolve(chunk: &str, segments: &[Segment<'_>], bindings: &TokenBindings) -> Result<String> {
        let mut out = String::new();
        Self::resolve_into(chunk, segments, bindings, &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_round_trip() {
        for kind in TokenKind::ALL {
            assert_eq!(TokenKind::from_marker(kind.marker()), Some(kind));
        }
        assert_eq!(TokenKind::from_marker("SAMPLERS"), None);
    }

    #[test]
    fn test_kinds_iteration_order() {
        let kinds = TokenKinds::VERTEX_CHANNEL | TokenKinds::SAMPLER;
        let collected: Vec<_> = kinds.kinds().collect();
        assert_eq!(collected, vec![TokenKind::Sampler, TokenKind::VertexChannel]);
    }

    #[test]
    fn test_resolve_substitutes_every_occurrence() {
        let segments = [
            Segment::Text("texture2D("),
            Segment::Token(TokenKind::Sampler),
            Segment::Text(", "),
            Segment::Token(TokenKind::Uv),
            Segment::Text(")."),
            Segment::Token(TokenKind::Channel),
            Segment::Text(" // "),
            Segment::Token(TokenKind::Channel),
        ];
        let bindings = TokenBindings::new()
            .with(TokenKind::Sampler, "texture_glossMap")
            .with(TokenKind::Uv, "vUv0")
            .with(TokenKind::Channel, "g");

        let text = TokenResolver::resolve("gloss", &segments, &bindings).unwrap();
        assert_eq!(text, "texture2D(texture_glossMap, vUv0).g // g");
    }

    #[test]
    fn test_unbound_token_leaves_output_untouched() {
        let segments = [Segment::Text("x."), Segment::Token(TokenKind::VertexChannel)];
        let mut out = String::from("prefix");

        let err = TokenResolver::resolve_into("gloss", &segments, &TokenBindings::new(), &mut out)
            .unwrap_err();

        assert_eq!(
            err,
            WeaveError::UnboundToken {
                kind: TokenKind::VertexChannel,
                chunk: "gloss".to_string(),
            }
        );
        assert_eq!(out, "prefix");
    }
}
