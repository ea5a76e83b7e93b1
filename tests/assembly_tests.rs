//! Assembly Tests
//!
//! Tests for:
//! - Assembler: chunk concatenation, guard evaluation, token substitution
//! - PermutationKey: equality tracks assembled source
//! - Built-in chunk library: standard materials assemble to complete sources

use shader_weave::errors::WeaveError;
use shader_weave::renderer::pipeline::{
    Assembler, ChunkInvocation, ChunkStore, PermutationKey, ShaderStage, StageRequest, TokenBindings, TokenKind,
};
use shader_weave::resources::FeatureSet;
use shader_weave::{Attribute, LibrarySettings, MaterialConfig, ShaderLibrary, StandardMaterialBuilder};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn channel_store() -> ChunkStore {
    let mut store = ChunkStore::new();
    store
        .register(
            "channel",
            ShaderStage::Fragment,
            "#ifdef MAPTEXTURE\nvalue = texture2D($SAMPLER, $UV).$CH;\n#endif\n",
        )
        .unwrap();
    store
}

fn channel_request(channel: &str) -> StageRequest {
    let bindings = TokenBindings::new()
        .with(TokenKind::Sampler, "texture_map")
        .with(TokenKind::Uv, "vUv0")
        .with(TokenKind::Channel, channel);

    StageRequest::new(ShaderStage::Fragment).with_invocation(
        ChunkInvocation::new("channel")
            .with_features(FeatureSet::new().with_flag("MAPTEXTURE", true))
            .with_bindings(bindings),
    )
}

// ============================================================================
// Assembler Tests
// ============================================================================

#[test]
fn assembler_round_trip() {
    let mut store = ChunkStore::new();
    store
        .register("chunk", ShaderStage::Fragment, "a\n#ifdef F\nb$SAMPLER\n#endif\nc")
        .unwrap();

    let request = StageRequest::new(ShaderStage::Fragment)
        .with_features(FeatureSet::new().with_flag("F", true))
        .with_invocation(
            ChunkInvocation::new("chunk").with_bindings(TokenBindings::new().with(TokenKind::Sampler, "tex0")),
        );

    let source = Assembler::new(&store).assemble(&request).unwrap();
    assert_eq!(source, "a\nbtex0\nc");
}

#[test]
fn assembler_same_chunk_different_channels() {
    let store = channel_store();
    let assembler = Assembler::new(&store);

    let diffuse = assembler.assemble_keyed(&channel_request("r")).unwrap();
    let metalness = assembler.assemble_keyed(&channel_request("g")).unwrap();

    assert_ne!(diffuse.key(), metalness.key());
    assert_eq!(diffuse.as_str(), "value = texture2D(texture_map, vUv0).r;\n");
    assert_eq!(diffuse.as_str().replace(".r;", ".g;"), metalness.as_str());
}

#[test]
fn assembler_is_deterministic() {
    let store = channel_store();
    let assembler = Assembler::new(&store);

    let a = assembler.assemble_keyed(&channel_request("a")).unwrap();
    let b = assembler.assemble_keyed(&channel_request("a")).unwrap();
    assert_eq!(a, b);
}

#[test]
fn assembler_guarded_token_without_binding_is_fine_when_discarded() {
    let store = channel_store();
    let request = StageRequest::new(ShaderStage::Fragment).with_invocation(ChunkInvocation::new("channel"));

    let source = Assembler::new(&store).assemble(&request).unwrap();
    assert!(source.is_empty());
}

#[test]
fn assembler_reports_unbound_token() {
    let store = channel_store();
    let request = StageRequest::new(ShaderStage::Fragment).with_invocation(
        ChunkInvocation::new("channel")
            .with_features(FeatureSet::new().with_flag("MAPTEXTURE", true))
            .with_bindings(TokenBindings::new().with(TokenKind::Sampler, "texture_map")),
    );

    let err = Assembler::new(&store).assemble(&request).unwrap_err();
    assert_eq!(
        err,
        WeaveError::UnboundToken {
            kind: TokenKind::Uv,
            chunk: "channel".to_string(),
        }
    );
}

// ============================================================================
// Permutation Key Tests
// ============================================================================

#[test]
fn key_ignores_flags_the_chunk_never_tests() {
    let store = channel_store();
    let plain = channel_request("r");
    let mut noisy = channel_request("r");
    noisy.features.set_flag("CLEARCOAT", true);
    noisy.features.set_enum("ALPHA_MODE", "BLEND");

    assert_eq!(
        PermutationKey::build(&store, &plain).unwrap(),
        PermutationKey::build(&store, &noisy).unwrap()
    );
}

#[test]
fn key_stage_local_shadowing() {
    let store = channel_store();

    // Local `false` shadows stage `true`, same as no flag at all.
    let mut shadowed = channel_request("r");
    shadowed.features.set_flag("MAPTEXTURE", true);
    shadowed.invocations[0].features.set_flag("MAPTEXTURE", false);

    let mut empty = channel_request("r");
    empty.invocations[0].features.clear();

    assert_eq!(
        PermutationKey::build(&store, &shadowed).unwrap(),
        PermutationKey::build(&store, &empty).unwrap()
    );
    assert_eq!(Assembler::new(&store).assemble(&shadowed).unwrap(), "");
}

// ============================================================================
// Built-in Library Tests
// ============================================================================

#[test]
fn builtin_default_material_assembles() {
    init_logger();
    let library = ShaderLibrary::with_builtin_chunks(LibrarySettings::default()).unwrap();
    let program = library.build_program(&MaterialConfig::default()).unwrap();

    let vertex = program.vertex.as_str();
    let fragment = program.fragment.as_str();

    assert!(vertex.contains("gl_Position"));
    assert!(!vertex.contains("vUv0"));
    assert!(fragment.contains("void getGlossiness()"));
    assert!(fragment.contains("uniform float material_glossiness;"));
    assert!(!fragment.contains("getMetalness"));
    assert!(!fragment.contains("ccGlossiness"));
    assert!(!fragment.contains('$'));
    assert!(!fragment.contains("#ifdef"));
}

#[test]
fn builtin_gloss_map_with_invert() {
    let library = ShaderLibrary::with_builtin_chunks(LibrarySettings::default()).unwrap();
    let material = StandardMaterialBuilder::new()
        .uniform(Attribute::Gloss, false)
        .map(Attribute::Gloss, "a", 1)
        .invert(Attribute::Gloss)
        .build();

    let program = library.build_program(&material).unwrap();
    let fragment = program.fragment.as_str();

    assert!(fragment.contains("uniform sampler2D texture_glossMap;"));
    assert!(fragment.contains("dGlossiness *= texture2DBias(texture_glossMap, vUv1, textureBias).a;"));
    assert!(fragment.contains("dGlossiness = 1.0 - dGlossiness;"));
    assert!(!fragment.contains("material_glossiness"));
    assert!(program.vertex.as_str().contains("vUv1 = getUv1();"));
}

#[test]
fn builtin_clear_coat_and_metalness() {
    let library = ShaderLibrary::with_builtin_chunks(LibrarySettings::default()).unwrap();
    let material = StandardMaterialBuilder::new()
        .use_metalness(true)
        .vertex_color(Attribute::Metalness, "b")
        .map(Attribute::ClearCoat, "r", 0)
        .build();

    let program = library.build_program(&material).unwrap();
    let fragment = program.fragment.as_str();

    assert!(fragment.contains("metalness *= saturate(vVertexColor.b);"));
    assert!(fragment.contains("ccSpecularity *= texture2DBias(texture_clearCoatMap, vUv0, textureBias).r;"));
    assert!(fragment.contains("getClearCoatGlossiness();"));
    assert!(fragment.contains("float dMetalness;"));

    let vertex = program.vertex.as_str();
    assert!(vertex.contains("vVertexColor = vertex_color;"));
    assert!(vertex.contains("vUv0 = getUv0();"));
}
