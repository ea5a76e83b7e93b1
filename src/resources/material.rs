//! Material Configuration
//!
//! Declarative description of a standard material as the material system
//! hands it over: for every shadeable attribute, where its value comes from.
//!
//! An attribute value is the product of its enabled sources:
//!
//! - a constant (no sources enabled; the chunk's built-in default),
//! - a uniform multiplier (`uniform`),
//! - a texture sample with a channel selector and UV set (`texture`),
//! - a vertex-color channel (`vertex_color`),
//!
//! optionally inverted afterwards (`invert`, gloss-family attributes only).
//!
//! All types deserialize from JSON so hosts can author materials as data:
//!
//! ```json
//! {
//!     "diffuse": { "uniform": true, "texture": { "channel": "rgb" } },
//!     "gloss": { "texture": { "channel": "g", "uv_set": 1 }, "invert": true },
//!     "use_metalness": true,
//!     "metalness": { "texture": { "channel": "r" } },
//!     "clear_coat": { "intensity": { "uniform": true } },
//!     "alpha_mode": "MASK"
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shadeable material attributes known to the chunk library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Diffuse,
    Opacity,
    Metalness,
    Gloss,
    ClearCoat,
    ClearCoatGloss,
}

impl Attribute {
    pub const ALL: [Attribute; 6] = [
        Attribute::Diffuse,
        Attribute::Opacity,
        Attribute::Metalness,
        Attribute::Gloss,
        Attribute::ClearCoat,
        Attribute::ClearCoatGloss,
    ];

    /// Name of the fragment chunk computing this attribute.
    #[must_use]
    pub fn chunk_name(self) -> &'static str {
        match self {
            Attribute::Diffuse => "diffuse",
            Attribute::Opacity => "opacity",
            Attribute::Metalness => "metalness",
            Attribute::Gloss => "gloss",
            Attribute::ClearCoat => "clearCoat",
            Attribute::ClearCoatGloss => "clearCoatGloss",
        }
    }

    /// Number of color channels the attribute consumes.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Attribute::Diffuse => 3,
            _ => 1,
        }
    }

    #[must_use]
    pub fn supports_invert(self) -> bool {
        matches!(self, Attribute::Gloss | Attribute::ClearCoatGloss)
    }

    /// Sampler uniform name used when the attribute is texture-driven.
    #[must_use]
    pub fn sampler_name(self) -> String {
        format!("texture_{}Map", self.chunk_name())
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.chunk_name())
    }
}

/// Texture source of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureMap {
    /// Channel selector, e.g. `"g"` or `"rgb"`.
    pub channel: String,
    #[serde(default)]
    pub uv_set: u32,
}

impl TextureMap {
    #[must_use]
    pub fn new(channel: impl Into<String>, uv_set: u32) -> Self {
        Self {
            channel: channel.into(),
            uv_set,
        }
    }
}

/// Where one attribute's value comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeSource {
    pub uniform: bool,
    pub texture: Option<TextureMap>,
    /// Vertex-color channel selector.
    pub vertex_color: Option<String>,
    pub invert: bool,
}

impl AttributeSource {
    /// No sources: the chunk's constant default.
    #[must_use]
    pub fn constant() -> Self {
        Self::default()
    }

    /// Uniform multiplier only.
    #[must_use]
    pub fn uniform() -> Self {
        Self {
            uniform: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_uniform(mut self, enabled: bool) -> Self {
        self.uniform = enabled;
        self
    }

    #[must_use]
    pub fn with_texture(mut self, channel: impl Into<String>, uv_set: u32) -> Self {
        self.texture = Some(TextureMap::new(channel, uv_set));
        self
    }

    #[must_use]
    pub fn with_vertex_color(mut self, channel: impl Into<String>) -> Self {
        self.vertex_color = Some(channel.into());
        self
    }

    #[must_use]
    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    #[must_use]
    pub fn is_constant(&self) -> bool {
        !self.uniform && self.texture.is_none() && self.vertex_color.is_none() && !self.invert
    }
}

/// Alpha handling of the material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

impl AlphaMode {
    /// Enum value of the `ALPHA_MODE` flag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AlphaMode::Opaque => "OPAQUE",
            AlphaMode::Mask => "MASK",
            AlphaMode::Blend => "BLEND",
        }
    }
}

/// Clear-coat layer: intensity plus its own glossiness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearCoatConfig {
    pub intensity: AttributeSource,
    pub gloss: AttributeSource,
}

impl Default for ClearCoatConfig {
    fn default() -> Self {
        Self {
            intensity: AttributeSource::uniform(),
            gloss: AttributeSource::uniform(),
        }
    }
}

/// Full standard-material configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    pub diffuse: AttributeSource,
    pub opacity: AttributeSource,
    /// Metalness workflow; the metalness attribute is ignored when off.
    pub use_metalness: bool,
    pub metalness: AttributeSource,
    pub gloss: AttributeSource,
    pub clear_coat: Option<ClearCoatConfig>,
    pub alpha_mode: AlphaMode,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            diffuse: AttributeSource::uniform(),
            opacity: AttributeSource::uniform(),
            use_metalness: false,
            metalness: AttributeSource::constant(),
            gloss: AttributeSource::uniform(),
            clear_coat: None,
            alpha_mode: AlphaMode::Opaque,
        }
    }
}

impl MaterialConfig {
    /// Source configured for `attribute`, regardless of whether it is active.
    #[must_use]
    pub fn source(&self, attribute: Attribute) -> Option<&AttributeSource> {
        match attribute {
            Attribute::Diffuse => Some(&self.diffuse),
            Attribute::Opacity => Some(&self.opacity),
            Attribute::Metalness => Some(&self.metalness),
            Attribute::Gloss => Some(&self.gloss),
            Attribute::ClearCoat => self.clear_coat.as_ref().map(|cc| &cc.intensity),
            Attribute::ClearCoatGloss => self.clear_coat.as_ref().map(|cc| &cc.gloss),
        }
    }

    /// Whether the attribute participates in shading for this material.
    #[must_use]
    pub fn is_active(&self, attribute: Attribute) -> bool {
        match attribute {
            Attribute::Diffuse | Attribute::Opacity | Attribute::Gloss => true,
            Attribute::Metalness => self.use_metalness,
            Attribute::ClearCoat | Attribute::ClearCoatGloss => self.clear_coat.is_some(),
        }
    }

    /// Active attributes with their sources, in [`Attribute::ALL`] order.
    pub fn active_sources(&self) -> impl Iterator<Item = (Attribute, &AttributeSource)> {
        Attribute::ALL.into_iter().filter_map(|attribute| {
            if self.is_active(attribute) {
                self.source(attribute).map(|source| (attribute, source))
            } else {
                None
            }
        })
    }
}
