use crate::resources::material::{
    AlphaMode, Attribute, AttributeSource, ClearCoatConfig, MaterialConfig, TextureMap,
};

/// Fluent builder for [`MaterialConfig`].
///
/// Setting any clear-coat attribute enables the clear-coat layer.
#[derive(Debug, Clone, Default)]
pub struct StandardMaterialBuilder {
    config: MaterialConfig,
}

impl StandardMaterialBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Per-attribute setters ---
    #[must_use]
    pub fn source(mut self, attribute: Attribute, source: AttributeSource) -> Self {
        *self.source_mut(attribute) = source;
        self
    }

    #[must_use]
    pub fn uniform(mut self, attribute: Attribute, enabled: bool) -> Self {
        self.source_mut(attribute).uniform = enabled;
        self
    }

    #[must_use]
    pub fn map(mut self, attribute: Attribute, channel: &str, uv_set: u32) -> Self {
        self.source_mut(attribute).texture = Some(TextureMap::new(channel, uv_set));
        self
    }

    #[must_use]
    pub fn vertex_color(mut self, attribute: Attribute, channel: &str) -> Self {
        self.source_mut(attribute).vertex_color = Some(channel.to_string());
        self
    }

    #[must_use]
    pub fn invert(mut self, attribute: Attribute) -> Self {
        self.source_mut(attribute).invert = true;
        self
    }

    // --- Material-wide setters ---
    #[must_use]
    pub fn use_metalness(mut self, enabled: bool) -> Self {
        self.config.use_metalness = enabled;
        self
    }

    #[must_use]
    pub fn clear_coat(mut self, enabled: bool) -> Self {
        self.config.clear_coat = enabled.then(|| self.config.clear_coat.take().unwrap_or_default());
        self
    }

    #[must_use]
    pub fn alpha_mode(mut self, mode: AlphaMode) -> Self {
        self.config.alpha_mode = mode;
        self
    }

    /// Returns the configuration. Validation happens when features are derived.
    #[must_use]
    pub fn build(self) -> MaterialConfig {
        self.config
    }

    fn source_mut(&mut self, attribute: Attribute) -> &mut AttributeSource {
        let config = &mut self.config;
        match attribute {
            Attribute::Diffuse => &mut config.diffuse,
            Attribute::Opacity => &mut config.opacity,
            Attribute::Metalness => &mut config.metalness,
            Attribute::Gloss => &mut config.gloss,
            Attribute::ClearCoat => &mut config.clear_coat.get_or_insert_with(ClearCoatConfig::default).intensity,
            Attribute::ClearCoatGloss => &mut config.clear_coat.get_or_insert_with(ClearCoatConfig::default).gloss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_sources() {
        let material = StandardMaterialBuilder::new()
            .map(Attribute::Gloss, "g", 1)
            .invert(Attribute::Gloss)
            .vertex_color(Attribute::Diffuse, "rgb")
            .use_metalness(true)
            .alpha_mode(AlphaMode::Blend)
            .build();

        assert_eq!(material.gloss.texture, Some(TextureMap::new("g", 1)));
        assert!(material.gloss.invert);
        assert!(material.gloss.uniform);
        assert_eq!(material.diffuse.vertex_color.as_deref(), Some("rgb"));
        assert!(material.use_metalness);
        assert_eq!(material.alpha_mode, AlphaMode::Blend);
    }

    #[test]
    fn test_clear_coat_attribute_enables_layer() {
        let material = StandardMaterialBuilder::new()
            .map(Attribute::ClearCoatGloss, "a", 0)
            .build();

        let clear_coat = material.clear_coat.expect("clear coat enabled");
        assert_eq!(clear_coat.gloss.texture, Some(TextureMap::new("a", 0)));
        assert!(clear_coat.intensity.uniform);
    }

    #[test]
    fn test_clear_coat_toggle() {
        let material = StandardMaterialBuilder::new()
            .clear_coat(true)
            .clear_coat(false)
            .build();
        assert!(material.clear_coat.is_none());
    }
}
