//! Material Feature Derivation
//!
//! Translates a [`MaterialConfig`] into the [`StageRequest`]s of both stages.
//!
//! Every active attribute becomes one chunk invocation carrying a local
//! feature set (`MAPFLOAT`, `MAPTEXTURE`, `MAPVERTEX`, `MAPINVERT`) and the
//! token bindings of its sources. Material-wide switches go into the stage
//! feature set:
//!
//! | Flag           | Set when                                         |
//! |----------------|--------------------------------------------------|
//! | `UV0` / `UV1`  | an active attribute samples a texture on that set |
//! | `VERTEX_COLOR` | an active attribute reads a vertex-color channel  |
//! | `METALNESS`    | the metalness workflow is on                      |
//! | `CLEARCOAT`    | the material has a clear-coat layer               |
//! | `ALPHA_MODE`   | always; enum `OPAQUE` / `MASK` / `BLEND`          |
//!
//! Derivation is a pure function of the material, so equal materials always
//! yield equal requests.

use super::layout::{SlotCondition, StageLayout};
use super::shader_gen::{ChunkInvocation, StageRequest};
use super::stage::ShaderStage;
use super::tokens::{TokenBindings, TokenKind};
use crate::errors::{Result, WeaveError};
use crate::resources::feature_set::FeatureSet;
use crate::resources::material::{Attribute, AttributeSource, MaterialConfig};

pub const MAX_UV_SETS: u32 = 2;

const CHANNELS: &str = "rgba";

/// Requests for both stages of one material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramRequest {
    pub vertex: StageRequest,
    pub fragment: StageRequest,
}

/// Per-attribute invocation data.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeFeatures {
    attribute: Attribute,
    features: FeatureSet,
    bindings: TokenBindings,
}

/// Derives feature sets and invocations from material configurations.
pub struct FeatureSetBuilder<'a> {
    material: &'a MaterialConfig,
    stage_features: FeatureSet,
    attributes: Vec<AttributeFeatures>,
}

impl<'a> FeatureSetBuilder<'a> {
    /// Validates `material` and derives its feature sets.
    pub fn new(material: &'a MaterialConfig) -> Result<Self> {
        if !material.use_metalness && !material.metalness.is_constant() {
            return Err(WeaveError::unsupported(
                Attribute::Metalness.chunk_name(),
                "metalness sources are configured but the metalness workflow is disabled",
            ));
        }

        let mut attributes = Vec::new();
        for (attribute, source) in material.active_sources() {
            attributes.push(attribute_features(attribute, source)?);
        }

        let mut stage_features = FeatureSet::new();
        let uses_uv = |set: u32| {
            material
                .active_sources()
                .any(|(_, source)| source.texture.as_ref().is_some_and(|map| map.uv_set == set))
        };
        stage_features.set_flag("UV0", uses_uv(0));
        stage_features.set_flag("UV1", uses_uv(1));
        stage_features.set_flag(
            "VERTEX_COLOR",
            material.active_sources().any(|(_, source)| source.vertex_color.is_some()),
        );
        stage_features.set_flag("METALNESS", material.use_metalness);
        stage_features.set_flag("CLEARCOAT", material.clear_coat.is_some());
        stage_features.set_enum("ALPHA_MODE", material.alpha_mode.as_str());

        Ok(Self {
            material,
            stage_features,
            attributes,
        })
    }

    /// Material-wide flags shared by both stages.
    #[must_use]
    pub fn stage_features(&self) -> &FeatureSet {
        &self.stage_features
    }

    /// Local feature set of `attribute`, if it is active.
    #[must_use]
    pub fn attribute_features(&self, attribute: Attribute) -> Option<&FeatureSet> {
        self.find(attribute).map(|entry| &entry.features)
    }

    /// Token bindings of `attribute`, if it is active.
    #[must_use]
    pub fn attribute_bindings(&self, attribute: Attribute) -> Option<&TokenBindings> {
        self.find(attribute).map(|entry| &entry.bindings)
    }

    /// Builds the request of one stage following `layout`.
    #[must_use]
    pub fn stage_request(&self, layout: &StageLayout) -> StageRequest {
        let mut request = StageRequest::new(layout.stage).with_features(self.stage_features.clone());

        for slot in layout.slots {
            match slot.condition {
                SlotCondition::Always => request.push(ChunkInvocation::new(slot.chunk)),
                SlotCondition::StageFlag(flag) => {
                    if self.stage_features.is_enabled(flag) {
                        request.push(ChunkInvocation::new(slot.chunk));
                    }
                }
                SlotCondition::Attribute(attribute) => {
                    if let Some(entry) = self.find(attribute) {
                        request.push(
                            ChunkInvocation::new(slot.chunk)
                                .with_features(entry.features.clone())
                                .with_bindings(entry.bindings.clone()),
                        );
                    }
                }
            }
        }

        request
    }

    /// Builds both stage requests with the standard layouts.
    #[must_use]
    pub fn program_request(&self) -> ProgramRequest {
        ProgramRequest {
            vertex: self.stage_request(StageLayout::standard(ShaderStage::Vertex)),
            fragment: self.stage_request(StageLayout::standard(ShaderStage::Fragment)),
        }
    }

    #[must_use]
    pub fn material(&self) -> &MaterialConfig {
        self.material
    }

    fn find(&self, attribute: Attribute) -> Option<&AttributeFeatures> {
        self.attributes.iter().find(|entry| entry.attribute == attribute)
    }
}

fn attribute_features(attribute: Attribute, source: &AttributeSource) -> Result<AttributeFeatures> {
    if source.invert && !attribute.supports_invert() {
        return Err(WeaveError::unsupported(
            attribute.chunk_name(),
            "inversion is only supported for gloss attributes",
        ));
    }

    let mut bindings = TokenBindings::new();

    if let Some(map) = &source.texture {
        let channel = channel_selector(attribute, "texture", &map.channel)?;
        if map.uv_set >= MAX_UV_SETS {
            return Err(WeaveError::unsupported(
                attribute.chunk_name(),
                format!("uv set {} is out of range (0..{MAX_UV_SETS})", map.uv_set),
            ));
        }
        bindings.bind(TokenKind::Sampler, attribute.sampler_name());
        bindings.bind(TokenKind::Uv, format!("vUv{}", map.uv_set));
        bindings.bind(TokenKind::Channel, channel);
    }

    if let Some(channel) = &source.vertex_color {
        let channel = channel_selector(attribute, "vertex color", channel)?;
        bindings.bind(TokenKind::VertexChannel, channel);
    }

    let features = FeatureSet::new()
        .with_flag("MAPFLOAT", source.uniform)
        .with_flag("MAPTEXTURE", source.texture.is_some())
        .with_flag("MAPVERTEX", source.vertex_color.is_some())
        .with_flag("MAPINVERT", source.invert);

    Ok(AttributeFeatures {
        attribute,
        features,
        bindings,
    })
}

/// Validates a channel selector and widens it to the attribute's arity.
///
/// A single component on a color attribute is replicated (`r` becomes `rrr`).
fn channel_selector(attribute: Attribute, what: &str, channel: &str) -> Result<String> {
    if let Some(bad) = channel.chars().find(|c| !CHANNELS.contains(*c)) {
        return Err(WeaveError::unsupported(
            attribute.chunk_name(),
            format!("{what} channel '{channel}' contains invalid component '{bad}'"),
        ));
    }
    let arity = attribute.arity();
    match channel.len() {
        len if len == arity => Ok(channel.to_string()),
        1 => Ok(channel.repeat(arity)),
        len => Err(WeaveError::unsupported(
            attribute.chunk_name(),
            format!("{what} channel '{channel}' selects {len} components, expected 1 or {arity}"),
        )),
    }
}
