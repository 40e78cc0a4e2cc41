use std::sync::Arc;

use rand::Rng;
use rand::rngs::StdRng;

use llkv_result::Error;
use llkv_row_encoding::{
    RowChunk, RowCursors, RowReaders, deserialize_into_vector, serialize_indices,
    serialize_vector, serialize_vector_sortable, skip_over_type, validity_bytes,
};
use llkv_storage::BufferManager;
use llkv_test_utils::{init_tracing_for_tests, seeded_rng};
use llkv_types::{HashValue, IntervalValue, NativeType, PhysicalType, Vector};

fn column<T: NativeType>(
    rng: &mut StdRng,
    n: usize,
    mut value: impl FnMut(&mut StdRng) -> T,
) -> Vector {
    let rows: Vec<Option<T>> = (0..n)
        .map(|_| {
            let valid = rng.random_bool(0.8);
            let v = value(rng);
            valid.then_some(v)
        })
        .collect();
    Vector::from_options(rows)
}

/// One nullable column of every physical type, `n` rows, roughly a fifth null.
fn sample_columns(n: usize, seed: u64) -> Vec<Vector> {
    let rng = &mut seeded_rng(seed);
    let mut cols = vec![
        column(rng, n, |r| r.random::<bool>()),
        column(rng, n, |r| r.random::<i8>()),
        column(rng, n, |r| r.random::<i16>()),
        column(rng, n, |r| r.random::<i32>()),
        column(rng, n, |r| r.random::<i64>()),
        column(rng, n, |r| r.random::<i128>()),
        column(rng, n, |r| r.random::<u8>()),
        column(rng, n, |r| r.random::<u16>()),
        column(rng, n, |r| r.random::<u32>()),
        column(rng, n, |r| r.random::<u64>()),
        column(rng, n, |r| r.random::<f32>() * 1e6),
        column(rng, n, |r| r.random::<f64>() * -1e9),
        column(rng, n, |r| IntervalValue::new(r.random(), r.random(), r.random())),
        column(rng, n, |r| HashValue(r.random())),
    ];
    let strings: Vec<Option<String>> = (0..n)
        .map(|i| {
            rng.random_bool(0.8).then(|| {
                let len = rng.random_range(0..12);
                "abcdefghijklmnopqrstuvwxyz"[..len].repeat(i % 3 + 1)
            })
        })
        .collect();
    cols.push(Vector::from_strings(strings));
    cols
}

fn row_width(cols: &[Vector]) -> usize {
    validity_bytes(cols.len())
        + cols
            .iter()
            .map(|c| match c.physical_type().fixed_width() {
                Some(w) => w,
                None => {
                    let strings = c.strings().unwrap();
                    4 + strings.iter().map(String::len).max().unwrap_or(0)
                }
            })
            .sum::<usize>()
}

#[test]
fn every_type_round_trips_with_validity() {
    init_tracing_for_tests();
    let n = 257;
    let cols = sample_columns(n, 21);
    assert_eq!(cols.len(), PhysicalType::ALL.len());

    let bm = Arc::new(BufferManager::new());
    let mut chunk = RowChunk::new(bm, 100, row_width(&cols)).unwrap();
    {
        let mut res = chunk.build(n).unwrap();
        let mut cursors = RowCursors::for_payload(res.slots_mut(), cols.len())
            .unwrap();
        let sel: Vec<usize> = (0..n).collect();
        for (col_idx, col) in cols.iter().enumerate() {
            serialize_vector(col, &sel, col_idx, &mut cursors).unwrap();
        }
    }

    let rows = chunk.pinned_rows();
    let slots = rows.iter().collect();
    let mut readers = RowReaders::for_payload(slots, cols.len()).unwrap();
    for (col_idx, col) in cols.iter().enumerate() {
        let got = deserialize_into_vector(col.physical_type(), n, col_idx, &mut readers)
            .unwrap();
        assert_eq!(&got, col, "column {col_idx} ({})", col.physical_type());
    }
}

#[test]
fn selection_reorders_rows() {
    let col = Vector::from_options([Some(1u32), None, Some(3), Some(4)]);
    let sel = [3usize, 1, 0];
    let mut rows = vec![[0u8; 1 + 4]; 3];
    {
        let slots = rows.iter_mut().map(|r| &mut r[..]).collect();
        let mut cursors = RowCursors::for_payload(slots, 1).unwrap();
        serialize_vector(&col, &sel, 0, &mut cursors).unwrap();
    }
    let slots = rows.iter().map(|r| &r[..]).collect();
    let mut readers = RowReaders::for_payload(slots, 1).unwrap();
    let got = deserialize_into_vector(PhysicalType::UInt32, 3, 0, &mut readers)
        .unwrap();
    assert_eq!(got, Vector::from_options([Some(4u32), None, Some(1)]));
}

#[test]
fn skipping_lands_on_the_same_offsets_as_decoding() {
    let n = 40;
    let cols = sample_columns(n, 22);
    let width = row_width(&cols);
    let mut rows = vec![vec![0u8; width]; n];
    {
        let slots = rows.iter_mut().map(Vec::as_mut_slice).collect();
        let mut cursors = RowCursors::for_payload(slots, cols.len()).unwrap();
        let sel: Vec<usize> = (0..n).collect();
        for (c, col) in cols.iter().enumerate() {
            serialize_vector(col, &sel, c, &mut cursors).unwrap();
        }
    }
    let slices: Vec<&[u8]> = rows.iter().map(Vec::as_slice).collect();
    let mut decoded = RowReaders::for_payload(slices.clone(), cols.len()).unwrap();
    let mut skipped = RowReaders::for_payload(slices, cols.len()).unwrap();
    for (c, col) in cols.iter().enumerate() {
        let ty = col.physical_type();
        deserialize_into_vector(ty, n, c, &mut decoded).unwrap();
        skip_over_type(ty, n, &mut skipped).unwrap();
        for i in 0..n {
            assert_eq!(decoded.position(i), skipped.position(i), "row {i} col {c}");
        }
    }
}

#[test]
fn truncated_varchar_reports_overrun() {
    // Length prefix claims far more bytes than the row holds.
    let row = [0xFFu8, 0xFF, 0xFF, 0xFF, 0x7F];
    let mut readers = RowReaders::for_payload(vec![&row[..]], 1).unwrap();
    let err = deserialize_into_vector(PhysicalType::Varchar, 1, 0, &mut readers)
        .unwrap_err();
    assert!(matches!(err, Error::InvariantViolation(_)), "{err}");
}

#[test]
fn sort_keys_carry_row_indices_back_to_payload() {
    // Build payload rows, then keys of (value, row index); sorting the keys
    // and following the indices yields the payload in value order.
    let values = [30i32, -2, 17, -2, 0];
    let col = Vector::from_options(values.map(Some));
    let sel: Vec<usize> = (0..values.len()).collect();
    let bm = Arc::new(BufferManager::new());

    let mut payload = RowChunk::new(Arc::clone(&bm), 2, 1 + 4).unwrap();
    let start = {
        let mut res = payload.build(values.len()).unwrap();
        let start = res.start();
        let mut cursors = RowCursors::for_payload(res.slots_mut(), 1).unwrap();
        serialize_vector(&col, &sel, 0, &mut cursors).unwrap();
        start
    };

    let mut keys = RowChunk::new(bm, 4, 4 + 8).unwrap();
    {
        let mut res = keys.build(values.len()).unwrap();
        let mut cursors = RowCursors::for_keys(res.slots_mut());
        serialize_vector_sortable(&col, &sel, &mut cursors, false, false)
            .unwrap();
        serialize_indices(&mut cursors, start).unwrap();
    }

    let mut sorted: Vec<Vec<u8>> = keys.pinned_rows().iter().map(<[u8]>::to_vec).collect();
    sorted.sort();
    let order: Vec<usize> = sorted
        .iter()
        .map(|k| u64::from_ne_bytes(k[4..12].try_into().unwrap()) as usize)
        .collect();

    let payload_rows = payload.pinned_rows();
    let picked: Vec<&[u8]> = order
        .iter()
        .map(|&i| payload_rows.row(i).unwrap())
        .collect();
    let mut readers = RowReaders::for_payload(picked, 1).unwrap();
    let got = deserialize_into_vector(PhysicalType::Int32, values.len(), 0, &mut readers)
        .unwrap();
    let mut expected = values.to_vec();
    expected.sort();
    assert_eq!(got.values::<i32>().unwrap(), expected.as_slice());
}
