// src/decompose/tests.rs

use super::*;
use crate::catalog::{Capabilities, ElementSupport, Isa, MaskRepr, RegisterClass, TargetFeatures};
use crate::mask::MAX_LANES;
use std::sync::Arc;
use test_log::test;

/// Native shapes of 4, 2 and 1 lanes for f32.
fn four_two_one() -> NativeChunkCatalog {
    NativeChunkCatalog::from_registers(vec![
        RegisterClass::new("v128", Isa::Generic, 16, ElementSupport::FLOATS, Capabilities::FULL),
        RegisterClass::new("v64", Isa::Generic, 8, ElementSupport::FLOATS, Capabilities::FULL),
    ])
    .unwrap()
}

fn preset(name: &str) -> NativeChunkCatalog {
    NativeChunkCatalog::for_target(&TargetFeatures::preset(name).unwrap())
}

fn chunk_lanes(recipe: &Recipe) -> Vec<usize> {
    recipe.chunks().map(|c| c.lanes()).collect()
}

// ============================================================================
// Tier scenarios on a {4, 2, 1} catalog
// ============================================================================

#[test]
fn it_should_use_a_direct_shape_for_an_exact_fit() {
    let catalog = four_two_one();
    let recipe = Decomposer::with_default_policy(&catalog)
        .decompose(ElementType::F32, 4)
        .unwrap();
    assert_eq!(recipe.kind(), RecipeKind::Direct);
    assert_eq!(chunk_lanes(&recipe), [4]);
}

#[test]
fn it_should_tile_multiples_of_the_preferred_shape() {
    let catalog = four_two_one();
    let recipe = Decomposer::with_default_policy(&catalog)
        .decompose(ElementType::F32, 8)
        .unwrap();
    match recipe {
        Recipe::HomogeneousArray { shape, count } => {
            assert_eq!(shape.lanes, 4);
            assert_eq!(count, 2);
        }
        other => panic!("expected an array, got {}", other),
    }
}

#[test]
fn it_should_fall_back_to_a_tuple_of_shrinking_chunks() {
    let catalog = four_two_one();
    let decomposer = Decomposer::with_default_policy(&catalog);

    let six = decomposer.decompose(ElementType::F32, 6).unwrap();
    assert_eq!(six.kind(), RecipeKind::Tuple);
    assert_eq!(chunk_lanes(&six), [4, 2]);

    let seven = decomposer.decompose(ElementType::F32, 7).unwrap();
    assert_eq!(seven.kind(), RecipeKind::Tuple);
    assert_eq!(chunk_lanes(&seven), [4, 2, 1]);
    assert_eq!(seven.to_string(), "tuple[generic[128]:4 + generic[64]:2 + scalar:1]");
}

#[test]
fn it_should_resolve_a_single_lane_to_scalar() {
    let catalog = four_two_one();
    let recipe = Decomposer::with_default_policy(&catalog)
        .decompose(ElementType::F32, 1)
        .unwrap();
    assert_eq!(recipe.to_string(), "direct[scalar:1]");
}

#[test]
fn it_should_honor_min_array_chunks() {
    let catalog = four_two_one();
    let policy = DecomposePolicy {
        min_array_chunks: 3,
        ..DecomposePolicy::default()
    };
    let decomposer = Decomposer::new(&catalog, policy).unwrap();
    let eight = decomposer.decompose(ElementType::F32, 8).unwrap();
    assert_eq!(eight.kind(), RecipeKind::Tuple);
    assert_eq!(chunk_lanes(&eight), [4, 4]);
    assert_eq!(
        decomposer.decompose(ElementType::F32, 12).unwrap().kind(),
        RecipeKind::HomogeneousArray
    );
}

// ============================================================================
// Real targets
// ============================================================================

#[test]
fn it_should_plan_avx2_widths() {
    let catalog = preset("x86-64-v3");
    let decomposer = Decomposer::with_default_policy(&catalog);

    let sixteen = decomposer.decompose(ElementType::F32, 16).unwrap();
    assert_eq!(sixteen.to_string(), "array[2 x avx[256]:8]");

    let six = decomposer.decompose(ElementType::F32, 6).unwrap();
    assert_eq!(six.to_string(), "direct[avx[256]:6/8]");

    let thirteen = decomposer.decompose(ElementType::F32, 13).unwrap();
    assert_eq!(thirteen.to_string(), "tuple[avx[256]:8 + sse[128]:4 + scalar:1]");

    let three = decomposer.decompose(ElementType::F64, 3).unwrap();
    assert_eq!(three.to_string(), "direct[avx[256]:3/4]");
}

#[test]
fn it_should_use_mask_registers_on_avx512() {
    let catalog = preset("x86-64-v4");
    let decomposer = Decomposer::with_default_policy(&catalog);
    let recipe = decomposer.decompose(ElementType::I8, 120).unwrap();
    assert_eq!(recipe.kind(), RecipeKind::Tuple);
    assert_eq!(chunk_lanes(&recipe), [64, 32, 16, 8]);
    let masks: Vec<_> = recipe.chunks().map(|c| c.shape.mask).collect();
    assert_eq!(
        masks,
        [MaskRepr::Bitmask, MaskRepr::Bitmask, MaskRepr::Bitmask, MaskRepr::Vector]
    );

    // Four byte lanes would leave the 8-byte register half empty.
    let hundred = decomposer.decompose(ElementType::I8, 100).unwrap();
    assert_eq!(chunk_lanes(&hundred), [64, 32, 1, 1, 1, 1]);
}

#[test]
fn it_should_never_pad_with_a_ratio_of_one() {
    let catalog = preset("aarch64");
    let policy = DecomposePolicy {
        padding_ratio: 1,
        ..DecomposePolicy::default()
    };
    let decomposer = Decomposer::new(&catalog, policy).unwrap();
    let recipe = decomposer.decompose(ElementType::F32, 7).unwrap();
    assert!(recipe.chunks().all(|c| !c.shape.is_partial()));
    assert_eq!(chunk_lanes(&recipe), [4, 2, 1]);

    let padded = Decomposer::with_default_policy(&catalog)
        .decompose(ElementType::F32, 3)
        .unwrap();
    assert_eq!(padded.to_string(), "direct[neon[128]:3/4]");
}

#[test]
fn it_should_keep_everything_scalar_without_vector_registers() {
    let catalog = preset("scalar");
    let recipe = Decomposer::with_default_policy(&catalog)
        .decompose(ElementType::U16, 5)
        .unwrap();
    assert_eq!(chunk_lanes(&recipe), [1, 1, 1, 1, 1]);
    assert_eq!(recipe.kind(), RecipeKind::HomogeneousArray);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn it_should_reject_zero_and_oversized_lane_counts() {
    let catalog = four_two_one();
    let decomposer = Decomposer::with_default_policy(&catalog);
    assert_eq!(decomposer.decompose(ElementType::F32, 0), Err(AbiError::ZeroLanes));
    assert_eq!(
        decomposer.decompose(ElementType::F32, 257),
        Err(AbiError::TooManyLanes { lanes: 257, max: 256 })
    );
}

#[test]
fn it_should_reject_elements_no_register_holds() {
    let floats_only = RegisterClass {
        alignment: 1,
        ..RegisterClass::new("scalar", Isa::Scalar, 0, ElementSupport::FLOATS, Capabilities::FULL)
    };
    let catalog = NativeChunkCatalog::from_registers(vec![floats_only]).unwrap();
    assert_eq!(
        Decomposer::with_default_policy(&catalog).decompose(ElementType::I8, 4),
        Err(AbiError::UnsupportedElement(ElementType::I8))
    );
}

#[test]
fn it_should_report_missing_shapes_in_catalogs_without_an_int_scalar() {
    let catalog = NativeChunkCatalog::from_registers(vec![
        RegisterClass::new("v128", Isa::Generic, 16, ElementSupport::all(), Capabilities::FULL),
        RegisterClass {
            alignment: 1,
            ..RegisterClass::new("scalar", Isa::Scalar, 0, ElementSupport::FLOATS, Capabilities::FULL)
        },
    ])
    .unwrap();
    assert_eq!(
        Decomposer::with_default_policy(&catalog).decompose(ElementType::I8, 3),
        Err(AbiError::NoShape {
            element: ElementType::I8,
            lanes: 1
        })
    );
}

#[test]
fn it_should_reject_invalid_policies() {
    let catalog = four_two_one();
    let policy = DecomposePolicy {
        padding_ratio: 0,
        ..DecomposePolicy::default()
    };
    assert!(matches!(
        Decomposer::new(&catalog, policy),
        Err(AbiError::InvalidPolicy(_))
    ));
}

// ============================================================================
// Recipe queries
// ============================================================================

#[test]
fn it_should_lay_out_chunks_at_aligned_byte_offsets() {
    let catalog = four_two_one();
    let recipe = Decomposer::with_default_policy(&catalog)
        .decompose(ElementType::F32, 7)
        .unwrap();
    let layout = recipe.layout();
    let offsets: Vec<_> = layout.chunks.iter().map(|c| c.byte_offset).collect();
    assert_eq!(offsets, [0, 16, 24]);
    assert_eq!(layout.alignment, 16);
    assert_eq!(layout.size_bytes, 32);

    let lane_five = recipe.chunk_at_lane(5).unwrap();
    assert_eq!((lane_five.index, lane_five.offset), (1, 4));
    assert!(recipe.chunk_at_lane(7).is_none());
    assert_eq!(recipe.chunk_shape(2).unwrap().lanes, 1);
    assert!(recipe.chunk_shape(3).is_none());
}

#[test]
fn it_should_serialize_recipes_as_tagged_json() {
    let catalog = four_two_one();
    let recipe = Decomposer::with_default_policy(&catalog)
        .decompose(ElementType::F32, 8)
        .unwrap();
    let json = serde_json::to_value(&recipe).unwrap();
    assert_eq!(json["homogeneous_array"]["count"], 2);
    assert_eq!(json["homogeneous_array"]["shape"]["lanes"], 4);
    assert_eq!(json["homogeneous_array"]["shape"]["element"], "f32");
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn it_should_cover_exactly_n_lanes_on_every_preset() {
    for name in TargetFeatures::PRESETS {
        let catalog = preset(name);
        let decomposer = Decomposer::with_default_policy(&catalog);
        for ty in ElementType::ALL {
            for lanes in 1..=MAX_LANES {
                let recipe = decomposer.decompose(ty, lanes).unwrap();
                assert_eq!(recipe.lanes(), lanes, "{} {} x {}", name, ty, lanes);
                assert_eq!(chunk_lanes(&recipe).iter().sum::<usize>(), lanes);
                if let Recipe::Tuple(chunks) = &recipe {
                    assert!(chunks.windows(2).all(|w| w[0].lanes >= w[1].lanes));
                }
                assert_eq!(decomposer.decompose(ty, lanes).unwrap(), recipe);
            }
        }
    }
}

#[test]
fn it_should_memoize_recipes() {
    let catalog = preset("x86-64-v3");
    let cache = RecipeCache::new(Decomposer::with_default_policy(&catalog));
    assert!(cache.is_empty());
    let first = cache.get(ElementType::F32, 13).unwrap();
    let second = cache.get(ElementType::F32, 13).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
    assert!(cache.get(ElementType::F32, 0).is_err());
    assert_eq!(cache.len(), 1);
}

#[test]
fn it_should_share_cached_recipes_across_threads() {
    let catalog = preset("x86-64-v4");
    let cache = RecipeCache::new(Decomposer::with_default_policy(&catalog));
    let recipes: Vec<Arc<Recipe>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| cache.get(ElementType::F64, 21).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for r in &recipes[1..] {
        assert_eq!(**r, *recipes[0]);
    }
    assert_eq!(cache.len(), 1);
}

#[test]
fn it_should_hand_out_one_static_recipe_per_key() {
    let a = recipe_for(ElementType::I32, 19).unwrap();
    let b = recipe_for(ElementType::I32, 19).unwrap();
    assert!(core::ptr::eq(a, b));
    assert_eq!(*a, decompose(ElementType::I32, 19).unwrap());

    let shared: Vec<&'static Recipe> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| recipe_for(ElementType::U16, 37).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(shared.iter().all(|r| core::ptr::eq(*r, shared[0])));
}

#[test]
fn it_should_report_out_of_range_static_recipes() {
    assert_eq!(recipe_for(ElementType::F32, 0), Err(AbiError::ZeroLanes));
    assert_eq!(
        recipe_for(ElementType::F32, MAX_LANES + 1),
        Err(AbiError::TooManyLanes {
            lanes: MAX_LANES + 1,
            max: MAX_LANES
        })
    );
    assert_eq!(recipe_for(ElementType::F32, MAX_LANES).unwrap().lanes(), MAX_LANES);
}
