//! Stage Layouts
//!
//! Fixed chunk order of each stage of the standard program. A slot is either
//! always present or tied to a condition derived from the material (an
//! active attribute, or a stage flag that the material turned on).

use super::chunk_store::ChunkStore;
use super::stage::ShaderStage;
use crate::errors::Result;
use crate::resources::material::Attribute;

/// When a slot participates in a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotCondition {
    Always,
    /// Present while the material has this attribute active.
    Attribute(Attribute),
    /// Present while the stage feature set enables this flag.
    StageFlag(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSlot {
    pub chunk: &'static str,
    pub condition: SlotCondition,
}

impl ChunkSlot {
    const fn always(chunk: &'static str) -> Self {
        Self {
            chunk,
            condition: SlotCondition::Always,
        }
    }

    const fn attribute(attribute: Attribute, chunk: &'static str) -> Self {
        Self {
            chunk,
            condition: SlotCondition::Attribute(attribute),
        }
    }

    const fn flag(flag: &'static str, chunk: &'static str) -> Self {
        Self {
            chunk,
            condition: SlotCondition::StageFlag(flag),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageLayout {
    pub stage: ShaderStage,
    pub slots: &'static [ChunkSlot],
}

const VERTEX_SLOTS: &[ChunkSlot] = &[
    ChunkSlot::always("base"),
    ChunkSlot::flag("UV0", "uv0"),
    ChunkSlot::flag("UV1", "uv1"),
    ChunkSlot::flag("VERTEX_COLOR", "vertexColor"),
    ChunkSlot::always("end"),
];

const FRAGMENT_SLOTS: &[ChunkSlot] = &[
    ChunkSlot::always("base"),
    ChunkSlot::attribute(Attribute::Diffuse, "diffuse"),
    ChunkSlot::attribute(Attribute::Opacity, "opacity"),
    ChunkSlot::attribute(Attribute::Metalness, "metalness"),
    ChunkSlot::attribute(Attribute::Gloss, "gloss"),
    ChunkSlot::attribute(Attribute::ClearCoat, "clearCoat"),
    ChunkSlot::attribute(Attribute::ClearCoatGloss, "clearCoatGloss"),
    ChunkSlot::always("end"),
];

impl StageLayout {
    pub const VERTEX: StageLayout = StageLayout {
        stage: ShaderStage::Vertex,
        slots: VERTEX_SLOTS,
    };

    pub const FRAGMENT: StageLayout = StageLayout {
        stage: ShaderStage::Fragment,
        slots: FRAGMENT_SLOTS,
    };

    /// Standard layout of `stage`.
    #[must_use]
    pub fn standard(stage: ShaderStage) -> &'static StageLayout {
        match stage {
            ShaderStage::Vertex => &Self::VERTEX,
            ShaderStage::Fragment => &Self::FRAGMENT,
        }
    }

    /// Checks that every slot's chunk is registered for this stage.
    pub fn validate(&self, store: &ChunkStore) -> Result<()> {
        for slot in self.slots {
            store.get(slot.chunk, self.stage)?;
        }
        Ok(())
    }
}
