// src/compose/tests.rs

use super::*;
use crate::catalog::{Capabilities, ElementSupport, Isa, MaskRepr, NativeChunkCatalog, RegisterClass};
use crate::decompose::Decomposer;
use crate::element::{Complex, ElementType};
use crate::mask::MAX_CHUNK_LANES;
use test_log::test;

/// f32 registers of 4 and 2 lanes plus the automatic scalar class.
fn small_catalog() -> NativeChunkCatalog {
    NativeChunkCatalog::from_registers(vec![
        RegisterClass::new("v128", Isa::Generic, 16, ElementSupport::FLOATS, Capabilities::FULL),
        RegisterClass::new("v64", Isa::Generic, 8, ElementSupport::FLOATS, Capabilities::FULL),
    ])
    .unwrap()
}

fn small_recipe(lanes: usize) -> Recipe {
    let catalog = small_catalog();
    Decomposer::with_default_policy(&catalog)
        .decompose(ElementType::F32, lanes)
        .unwrap()
}

// ============================================================================
// Chunk traversal
// ============================================================================

#[test]
fn it_should_visit_chunks_in_ascending_offset_covering_every_lane() {
    let v = SimdValue::<f32, 13>::from_fn(|i| i as f32);
    let mut next = 0;
    let mut visits = 0;
    v.for_each(|c| {
        assert_eq!(c.descriptor.offset, next);
        assert_eq!(c.descriptor.index, visits);
        assert_eq!(c.lanes.len(), c.descriptor.lanes());
        assert_eq!(c.lanes[0], next as f32);
        next += c.lanes.len();
        visits += 1;
    });
    assert_eq!(next, 13);
    assert_eq!(visits, v.chunk_count());
}

#[test]
fn it_should_write_through_mutable_chunks() {
    let mut v = SimdValue::<i32, 11>::splat(1);
    v.for_each_mut(|c| {
        for lane in c.lanes.iter_mut() {
            *lane += c.descriptor.offset as i32;
        }
    });
    let expected = SimdValue::<i32, 11>::recipe()
        .chunks()
        .flat_map(|c| core::iter::repeat(1 + c.offset as i32).take(c.lanes()))
        .collect::<Vec<_>>();
    assert_eq!(v.as_slice(), expected.as_slice());
}

#[test]
fn it_should_place_each_chunk_mask_at_its_offset() {
    let v = SimdValue::<f32, 7>::from_fn(|i| i as f32);
    let mask = v.test(|c| {
        let bits = c
            .lanes
            .iter()
            .enumerate()
            .fold(0, |acc, (i, x)| acc | (((*x as usize) % 3 == 0) as u64) << i);
        KMask::new(c.lanes.len(), bits | !0 << c.lanes.len())
    });
    assert_eq!(mask, BitMask::<7>::from_fn(|i| i % 3 == 0));
    assert!(mask.is_sanitized());
}

#[test]
fn it_should_accept_vector_style_chunk_masks() {
    let v = SimdValue::<u8, 37>::from_fn(|i| i as u8);
    let mask = v.test(|c| LaneMask::from_fn(c.lanes.len(), |i| c.lanes[i] >= 30));
    assert_eq!(mask.count(), 7);
    assert_eq!(mask.first_set(), Some(30));
}

// ============================================================================
// Construction and memory
// ============================================================================

#[test]
fn it_should_round_trip_through_slices() {
    let src: Vec<f64> = (0..9).map(|i| i as f64 * 0.5).collect();
    let v = SimdValue::<f64, 9>::from_slice(&src);
    let mut out = vec![0.0; 12];
    v.write_to_slice(&mut out);
    assert_eq!(&out[..9], src.as_slice());
    assert_eq!(&out[9..], &[0.0; 3]);
    assert_eq!(v.get(4), 2.0);
    assert_eq!(v[8], 4.0);
}

#[test]
fn it_should_only_touch_masked_lanes() {
    let src = [10i16, 11, 12, 13, 14];
    let mask = BitMask::<5>::from_bits(0b10101);
    let v = SimdValue::<i16, 5>::load_masked(&src, &mask, SimdValue::splat(-1));
    assert_eq!(v.to_array(), [10, -1, 12, -1, 14]);

    let mut dst = [0i16; 5];
    SimdValue::<i16, 5>::splat(7).store_masked(&mut dst, &(!mask).sanitize());
    assert_eq!(dst, [0, 7, 0, 7, 0]);
}

#[test]
fn it_should_allow_short_buffers_when_the_tail_is_masked_off() {
    let src = [1u32, 2, 3];
    let mask = BitMask::<6>::from_bits(0b011);
    let v = SimdValue::<u32, 6>::load_masked(&src, &mask, SimdValue::default());
    assert_eq!(v.to_array(), [1, 2, 0, 0, 0, 0]);
}

// ============================================================================
// Arithmetic, comparisons, selection
// ============================================================================

#[test]
fn it_should_apply_arithmetic_lane_wise() {
    let a = SimdValue::<f32, 6>::from_fn(|i| i as f32 + 1.0);
    let b = SimdValue::<f32, 6>::splat(2.0);
    assert_eq!((a + b).to_array(), [3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    assert_eq!((a - b).to_array(), [-1.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
    assert_eq!((a * b).to_array(), [2.0, 4.0, 6.0, 8.0, 10.0, 12.0]);
    assert_eq!((a / b).to_array(), [0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
    assert_eq!(a.map(|x| x * x).get(5), 36.0);
}

#[test]
fn it_should_support_complex_lanes() {
    let a = SimdValue::<Complex<f32>, 3>::splat(Complex::new(1.0, 2.0));
    let b = SimdValue::<Complex<f32>, 3>::splat(Complex::new(3.0, -1.0));
    let p = a * b;
    assert_eq!(p.get(2), Complex::new(5.0, 5.0));
    assert!(a.simd_eq(&a).all());
    assert!(a.simd_ne(&b).all());
}

#[test]
fn it_should_compare_lanes_into_masks() {
    let a = SimdValue::<i32, 10>::from_fn(|i| i as i32);
    let five = SimdValue::<i32, 10>::splat(5);
    assert_eq!(a.simd_lt(&five), BitMask::<10>::from_bits(0b00000_11111));
    assert_eq!(a.simd_le(&five), BitMask::<10>::from_bits(0b00001_11111));
    assert_eq!(a.simd_gt(&five), BitMask::<10>::from_bits(0b11110_00000));
    assert_eq!(a.simd_ge(&five), BitMask::<10>::from_bits(0b11111_00000));
    assert_eq!(a.simd_eq(&five).reduce_min_index(), 5);
    assert_eq!(a.simd_ne(&five).count(), 9);
}

#[test]
fn it_should_classify_float_lanes() {
    let v = SimdValue::<f64, 5>::from_array([1.0, f64::NAN, f64::INFINITY, -0.0, f64::NEG_INFINITY]);
    assert_eq!(v.is_nan(), BitMask::<5>::from_bits(0b00010));
    assert_eq!(v.is_infinite(), BitMask::<5>::from_bits(0b10100));
    assert_eq!(v.is_finite(), BitMask::<5>::from_bits(0b01001));
}

#[test]
fn it_should_select_between_values() {
    let a = SimdValue::<u16, 9>::splat(1);
    let b = SimdValue::<u16, 9>::splat(2);
    let mask = BitMask::<9>::from_fn(|i| i % 2 == 1);
    assert_eq!(
        SimdValue::select(&mask, a, b).to_array(),
        [2, 1, 2, 1, 2, 1, 2, 1, 2]
    );
}

// ============================================================================
// Reductions
// ============================================================================

#[test]
fn it_should_reduce_every_lane_once() {
    let v = SimdValue::<i64, 23>::from_fn(|i| i as i64 + 1);
    assert_eq!(v.reduce_sum(), 23 * 24 / 2);
    assert_eq!(v.reduce_min(), 1);
    assert_eq!(v.reduce_max(), 23);

    let single = SimdValue::<f32, 1>::splat(4.5);
    assert_eq!(single.reduce_sum(), 4.5);
}

#[test]
fn it_should_skip_nan_in_min_and_max() {
    let v = SimdValue::<f32, 5>::from_array([3.0, f32::NAN, -2.0, 8.0, f32::NAN]);
    assert_eq!(v.reduce_min(), -2.0);
    assert_eq!(v.reduce_max(), 8.0);
}

#[test]
fn it_should_tree_reduce_mismatched_tuple_chunks() {
    // 7 lanes -> 4 + 2 + 1
    let recipe = small_recipe(7);
    assert_eq!(recipe.chunk_count(), 3);
    let mut lanes: Vec<f32> = (1..=7).map(|i| i as f32).collect();
    assert_eq!(tree_reduce::<f32, PortableKernel>(&recipe, &mut lanes, |a, b| a + b), 28.0);

    // 6 lanes -> 4 + 2
    let recipe = small_recipe(6);
    let mut lanes = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
    let max = tree_reduce::<f32, PortableKernel>(&recipe, &mut lanes, |a, b| a.max(b));
    assert_eq!(max, 6.0);
}

#[test]
fn it_should_tree_reduce_homogeneous_arrays() {
    // 12 lanes -> 3 x 4
    let recipe = small_recipe(12);
    assert_eq!(recipe.chunk_count(), 3);
    let mut lanes: Vec<f32> = (0..12).map(|i| i as f32).collect();
    assert_eq!(tree_reduce::<f32, PortableKernel>(&recipe, &mut lanes, |a, b| a + b), 66.0);
}

#[test]
fn it_should_carry_the_odd_chunk_through_every_round() {
    // 20 lanes -> 5 x 4: rounds of 5, 3, 2, 1 chunks
    let recipe = small_recipe(20);
    assert_eq!(recipe.chunk_count(), 5);
    let mut lanes: Vec<f32> = (0..20).map(|i| i as f32).collect();
    assert_eq!(tree_reduce::<f32, PortableKernel>(&recipe, &mut lanes, |a, b| a + b), 190.0);

    let v = SimdValue::<i64, 200>::from_fn(|i| i as i64);
    assert_eq!(v.reduce_sum(), 199 * 200 / 2);
    assert_eq!(v.reduce_max(), 199);
}

#[test]
fn it_should_reduce_every_lane_of_the_widest_chunks() {
    let catalog = NativeChunkCatalog::from_registers(vec![RegisterClass::new(
        "v512",
        Isa::Generic,
        64,
        ElementSupport::all(),
        Capabilities::FULL,
    )])
    .unwrap();
    let recipe = Decomposer::with_default_policy(&catalog)
        .decompose(ElementType::U8, 128)
        .unwrap();
    assert_eq!(recipe.to_string(), "array[2 x generic[512]:64]");
    let mut lanes: Vec<u8> = (0..128).collect();
    assert_eq!(tree_reduce::<u8, PortableKernel>(&recipe, &mut lanes, |a, b| a.max(b)), 127);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "violated at")]
fn it_should_refuse_to_reduce_more_lanes_than_one_chunk_holds() {
    let shape = small_recipe(4).chunks().next().unwrap().shape;
    let lanes = [1u8; MAX_CHUNK_LANES + 1];
    PortableKernel::reduce(&shape, &lanes, |a, b| a.max(b));
}

// ============================================================================
// Leaf masks
// ============================================================================

#[test]
fn it_should_clear_k_mask_bits_past_the_chunk() {
    let k = KMask::new(4, 0xFF);
    assert_eq!(k.to_bits(), 0b1111);
    assert_eq!(k.lanes(), 4);
}

#[test]
fn it_should_pack_lane_masks_from_the_top_bit_of_each_lane() {
    let m = LaneMask::from_fn(6, |i| i == 1 || i == 4);
    assert_eq!(m.to_bits(), 0b010010);
    assert!(m.lane(4));
    assert!(!m.lane(5));
}

#[test]
fn it_should_pick_the_mask_repr_from_the_shape() {
    let catalog = NativeChunkCatalog::from_registers(vec![RegisterClass::new(
        "k512",
        Isa::Generic,
        64,
        ElementSupport::all(),
        Capabilities::FULL | Capabilities::BITMASK_REGISTER,
    )])
    .unwrap();
    let shape = catalog.preferred_shape(ElementType::F32).unwrap();
    assert_eq!(shape.mask, MaskRepr::Bitmask);
    let mask = ChunkMask::for_shape(&shape, |i| i < 3);
    assert!(matches!(mask, ChunkMask::Bitmask(_)));
    assert_eq!(mask.to_bits(), 0b111);
    assert_eq!(mask.lanes(), 16);
}
