//! Core data definitions, independent of assembly:
//! - FeatureSet: named boolean / enum flags
//! - MaterialConfig: declarative material description
//! - StandardMaterialBuilder: fluent material construction

pub mod feature_set;
pub mod material;
pub mod material_builder;

pub use feature_set::{FeatureScope, FeatureSet, FeatureValue};
pub use material::{AlphaMode, Attribute, AttributeSource, ClearCoatConfig, MaterialConfig, TextureMap};
pub use material_builder::StandardMaterialBuilder;
