use std::sync::Arc;

use rand::Rng;
use rand::distr::{Distribution, StandardUniform};

use llkv_row_encoding::{RowChunk, RowCursors, SortKey, serialize_vector_sortable, sortable_width};
use llkv_storage::BufferManager;
use llkv_test_utils::{init_tracing_for_tests, seeded_rng};
use llkv_types::{HashValue, IntervalValue, NativeType, PhysicalType, Vector};

/// Encode every row of `vector` as a sortable key through a `RowChunk`.
fn encode_keys(vector: &Vector, has_null: bool, invert: bool) -> Vec<Vec<u8>> {
    let width = sortable_width(vector.physical_type(), has_null).unwrap();
    let bm = Arc::new(BufferManager::new());
    let mut chunk = RowChunk::new(bm, 64, width).unwrap();
    {
        let mut res = chunk.build(vector.len()).unwrap();
        let mut cursors = RowCursors::for_keys(res.slots_mut());
        let sel: Vec<usize> = (0..vector.len()).collect();
        serialize_vector_sortable(vector, &sel, &mut cursors, has_null, invert)
            .unwrap();
    }
    chunk.pinned_rows().iter().map(<[u8]>::to_vec).collect()
}

/// Sorting by value and sorting by key bytes must agree.
fn assert_order_preserved<T: SortKey>(values: Vec<T>) {
    let vector = Vector::from_options(values.iter().copied().map(Some));
    let keys = encode_keys(&vector, false, false);
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap());
    for w in idx.windows(2) {
        let (a, b) = (w[0], w[1]);
        if values[a] < values[b] {
            assert!(
                keys[a] < keys[b],
                "{:?} < {:?} but keys {:?} >= {:?}",
                values[a],
                values[b],
                keys[a],
                keys[b]
            );
        } else {
            assert_eq!(keys[a], keys[b], "{:?} == {:?}", values[a], values[b]);
        }
    }
}

fn random_values<T: SortKey>(n: usize, seed: u64, extremes: &[T]) -> Vec<T>
where
    StandardUniform: Distribution<T>,
{
    let mut rng = seeded_rng(seed);
    let mut out: Vec<T> = (0..n).map(|_| rng.random()).collect();
    out.extend_from_slice(extremes);
    out
}

#[test]
fn integers_preserve_order() {
    init_tracing_for_tests();
    assert_order_preserved(random_values::<i8>(500, 1, &[i8::MIN, -1, 0, 1, i8::MAX]));
    assert_order_preserved(random_values::<i16>(500, 2, &[i16::MIN, -1, 0, i16::MAX]));
    assert_order_preserved(random_values::<i32>(500, 3, &[i32::MIN, -1, 0, i32::MAX]));
    assert_order_preserved(random_values::<i64>(500, 4, &[i64::MIN, -1, 0, i64::MAX]));
    assert_order_preserved(random_values::<u8>(500, 5, &[0, u8::MAX]));
    assert_order_preserved(random_values::<u16>(500, 6, &[0, u16::MAX]));
    assert_order_preserved(random_values::<u32>(500, 7, &[0, u32::MAX]));
    assert_order_preserved(random_values::<u64>(500, 8, &[0, u64::MAX]));
    assert_order_preserved(vec![true, false, true]);
}

#[test]
fn small_ranges_produce_duplicates_with_equal_keys() {
    let mut rng = seeded_rng(9);
    let values: Vec<i16> = (0..300).map(|_| rng.random_range(-3..=3)).collect();
    assert_order_preserved(values);
}

#[test]
fn floats_preserve_order() {
    let mut rng = seeded_rng(10);
    let mut doubles: Vec<f64> = (0..1000)
        .map(|_| (rng.random::<f64>() - 0.5) * 10f64.powi(rng.random_range(-300..300)))
        .collect();
    doubles.extend([
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::MAX,
        -f64::MAX,
        f64::MIN_POSITIVE,
        -f64::MIN_POSITIVE,
        0.0,
        -0.0,
        1.0,
        -1.0,
    ]);
    assert_order_preserved(doubles);

    let mut floats: Vec<f32> = (0..1000)
        .map(|_| (rng.random::<f32>() - 0.5) * 10f32.powi(rng.random_range(-30..30)))
        .collect();
    floats.extend([f32::INFINITY, f32::NEG_INFINITY, f32::MAX, -f32::MAX]);
    floats.extend([0.0, -0.0]);
    assert_order_preserved(floats);
}

#[test]
fn nan_sorts_with_positive_infinity() {
    let keys = encode_keys(
        &Vector::from_options([Some(f64::NAN), Some(f64::INFINITY), Some(f64::MAX)]),
        false,
        false,
    );
    assert_eq!(keys[0], keys[1]);
    assert!(keys[2] < keys[1]);
}

#[test]
fn interval_and_hash_preserve_order() {
    let mut rng = seeded_rng(11);
    let intervals: Vec<IntervalValue> = (0..400)
        .map(|_| {
            IntervalValue::new(
                rng.random_range(-3..=3),
                rng.random_range(-40..=40),
                rng.random_range(-1_000..=1_000),
            )
        })
        .chain([
            IntervalValue::new(i32::MIN, i32::MIN, i64::MIN),
            IntervalValue::new(i32::MAX, i32::MAX, i64::MAX),
        ])
        .collect();
    assert_order_preserved(intervals);

    let hashes: Vec<HashValue> = random_values::<u64>(300, 12, &[0, u64::MAX])
        .into_iter()
        .map(HashValue)
        .collect();
    assert_order_preserved(hashes);
}

#[test]
fn nulls_sort_low_or_high() {
    let vector = Vector::from_options([Some(i64::MIN), None, Some(i64::MAX)]);

    let low = encode_keys(&vector, true, false);
    assert!(low[1] < low[0] && low[0] < low[2], "nulls first");

    // `invert` flips only the validity flag; value bytes keep ascending order.
    let high = encode_keys(&vector, true, true);
    assert!(high[0] < high[2] && high[2] < high[1], "nulls last");
}

#[test]
fn null_keys_are_deterministic() {
    let a = Vector::from_options([None, Some(1.0f32)]);
    let b = Vector::from_options([Some(2.0f32), None]);
    let ka = encode_keys(&a, true, false);
    let kb = encode_keys(&b, true, false);
    assert_eq!(ka[0], kb[1]);
    assert_eq!(ka[0], vec![0, 0, 0, 0, 0]);
}

#[test]
fn composite_keys_compare_column_by_column() {
    // (i32, u16) pairs: concatenated keys sort like tuples.
    let mut rng = seeded_rng(13);
    let firsts: Vec<i32> = (0..200).map(|_| rng.random_range(-4..4)).collect();
    let seconds: Vec<u16> = (0..200).map(|_| rng.random()).collect();
    let c0 = Vector::from_options(firsts.iter().copied().map(Some));
    let c1 = Vector::from_options(seconds.iter().copied().map(Some));

    let width = i32::WIDTH + u16::WIDTH;
    let bm = Arc::new(BufferManager::new());
    let mut chunk = RowChunk::new(bm, 50, width).unwrap();
    {
        let mut res = chunk.build(200).unwrap();
        let mut cursors = RowCursors::for_keys(res.slots_mut());
        let sel: Vec<usize> = (0..200).collect();
        for column in [&c0, &c1] {
            serialize_vector_sortable(column, &sel, &mut cursors, false, false)
                .unwrap();
        }
        assert!((0..200).all(|i| cursors.position(i) == width));
    }
    let keys: Vec<Vec<u8>> = chunk.pinned_rows().iter().map(<[u8]>::to_vec).collect();

    let mut by_tuple: Vec<usize> = (0..200).collect();
    by_tuple.sort_by_key(|&i| (firsts[i], seconds[i]));
    let mut by_key: Vec<usize> = (0..200).collect();
    by_key.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
    let tuples = |order: &[usize]| -> Vec<(i32, u16)> {
        order.iter().map(|&i| (firsts[i], seconds[i])).collect()
    };
    assert_eq!(tuples(&by_tuple), tuples(&by_key));
}

#[test]
fn key_widths_follow_physical_types() {
    for ty in PhysicalType::ALL {
        match ty {
            PhysicalType::Int128 | PhysicalType::Varchar => {
                assert_eq!(sortable_width(ty, false), None)
            }
            _ => {
                let expected = ty.fixed_width().map(|w| w + 1);
                assert_eq!(sortable_width(ty, true), expected);
            }
        }
    }
}
