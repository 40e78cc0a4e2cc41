//! Order-preserving ("sortable") key encoding.
//!
//! Every supported value becomes a fixed-width byte string whose unsigned
//! lexicographic order matches the natural order of the value:
//!
//! | Type | Encoding |
//! |---|---|
//! | `BOOL`, `UINT8` | the byte as-is |
//! | unsigned integers, `HASH` | big-endian |
//! | signed integers | big-endian with the sign bit flipped |
//! | `FLOAT`, `DOUBLE` | see [`f32_sort_bits`] / [`f64_sort_bits`], big-endian |
//! | `INTERVAL` | months, days, micros, each as a signed integer (16 bytes) |
//!
//! `INT128` and `VARCHAR` keys are not implemented and fail with
//! [`Error::UnsupportedOperation`].
//!
//! When a key column may contain nulls a one-byte validity flag precedes the
//! value: `1` for valid and `0` for null, or the reverse when `invert` is set so
//! nulls sort after every value. A null row writes an all-zero value so equal
//! keys stay byte-identical.

use llkv_result::{Error, Result};
use llkv_types::{HashValue, IntervalValue, NativeType, Vector};

use crate::cursors::RowCursors;
use crate::dispatch;

/// A native type with an order-preserving fixed-width encoding.
pub trait SortKey: NativeType {
    /// Width in bytes of the encoded key (without the validity flag).
    const KEY_WIDTH: usize = Self::WIDTH;

    /// Write the key into `out`, which is exactly `KEY_WIDTH` bytes.
    fn encode_sort_key(self, out: &mut [u8]);
}

/// Sortable bit pattern of an `f32`.
///
/// Both zeros map to the midpoint `1 << 31`. Values above `f32::MAX` (and NaN)
/// map to all ones; values below `-f32::MAX` map to zero. Other non-negative
/// values get the sign bit set and negative values are complemented, which
/// turns IEEE-754 sign-magnitude order into unsigned order.
#[inline]
pub fn f32_sort_bits(x: f32) -> u32 {
    if x == 0.0 {
        return 1 << 31;
    }
    if x.is_nan() || x > f32::MAX {
        return u32::MAX;
    }
    if x < -f32::MAX {
        return 0;
    }
    let bits = x.to_bits();
    if bits & (1 << 31) == 0 {
        bits | (1 << 31)
    } else {
        !bits
    }
}

/// Sortable bit pattern of an `f64`. Same rules as [`f32_sort_bits`].
#[inline]
pub fn f64_sort_bits(x: f64) -> u64 {
    if x == 0.0 {
        return 1 << 63;
    }
    if x.is_nan() || x > f64::MAX {
        return u64::MAX;
    }
    if x < -f64::MAX {
        return 0;
    }
    let bits = x.to_bits();
    if bits & (1 << 63) == 0 {
        bits | (1 << 63)
    } else {
        !bits
    }
}

macro_rules! impl_sort_key_unsigned {
    ($($t:ty),*) => {$(
        impl SortKey for $t {
            #[inline]
            fn encode_sort_key(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_be_bytes());
            }
        }
    )*};
}

macro_rules! impl_sort_key_signed {
    ($($t:ty),*) => {$(
        impl SortKey for $t {
            #[inline]
            fn encode_sort_key(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_be_bytes());
                out[0] ^= 0x80;
            }
        }
    )*};
}

impl_sort_key_unsigned!(u8, u16, u32, u64);
impl_sort_key_signed!(i8, i16, i32, i64);

impl SortKey for bool {
    #[inline]
    fn encode_sort_key(self, out: &mut [u8]) {
        out[0] = u8::from(self);
    }
}

impl SortKey for f32 {
    #[inline]
    fn encode_sort_key(self, out: &mut [u8]) {
        out.copy_from_slice(&f32_sort_bits(self).to_be_bytes());
    }
}

impl SortKey for f64 {
    #[inline]
    fn encode_sort_key(self, out: &mut [u8]) {
        out.copy_from_slice(&f64_sort_bits(self).to_be_bytes());
    }
}

impl SortKey for HashValue {
    #[inline]
    fn encode_sort_key(self, out: &mut [u8]) {
        self.0.encode_sort_key(out);
    }
}

impl SortKey for IntervalValue {
    const KEY_WIDTH: usize = IntervalValue::WIDTH;

    #[inline]
    fn encode_sort_key(self, out: &mut [u8]) {
        self.months.encode_sort_key(&mut out[0..4]);
        self.days.encode_sort_key(&mut out[4..8]);
        self.micros.encode_sort_key(&mut out[8..16]);
    }
}

/// Encode the rows `sel` of `vector` as sortable keys, one key per cursor.
///
/// `sel[i]` is the source position written through cursor `i`. With
/// `has_null` a validity flag precedes each value; `invert` makes nulls sort
/// high.
pub fn serialize_vector_sortable(
    vector: &Vector,
    sel: &[usize],
    cursors: &mut RowCursors<'_>,
    has_null: bool,
    invert: bool,
) -> Result<()> {
    let ty = vector.physical_type();
    let encode = dispatch::ops(ty)
        .sortable
        .ok_or_else(|| Error::unsupported(format!("sortable key encoding for {ty}")))?;
    check_selection(vector, sel, cursors.len())?;
    encode(vector, sel, cursors, has_null, invert)
}

/// Encoded key width for `ty` including the optional validity flag, or `None`
/// when the type has no sortable encoding.
pub fn sortable_width(ty: llkv_types::PhysicalType, has_null: bool) -> Option<usize> {
    let ops = dispatch::ops(ty);
    ops.sortable?;
    ops.width.map(|w| w + usize::from(has_null))
}

pub(crate) fn check_selection(vector: &Vector, sel: &[usize], rows: usize) -> Result<()> {
    if sel.len() != rows {
        return Err(Error::invariant(format!(
            "selection has {} entries for {rows} rows",
            sel.len()
        )));
    }
    if let Some(&bad) = sel.iter().find(|&&idx| idx >= vector.len()) {
        return Err(Error::invariant(format!(
            "selection index {bad} outside a {}-row vector",
            vector.len()
        )));
    }
    Ok(())
}

pub(crate) fn type_mismatch(vector: &Vector, expected: llkv_types::PhysicalType) -> Error {
    Error::invariant(format!(
        "vector holds {} data but {expected} was dispatched",
        vector.physical_type()
    ))
}

pub(crate) fn encode_sortable<T: SortKey>(
    vector: &Vector,
    sel: &[usize],
    cursors: &mut RowCursors<'_>,
    has_null: bool,
    invert: bool,
) -> Result<()> {
    let values = vector
        .values::<T>()
        .ok_or_else(|| type_mismatch(vector, T::PHYSICAL_TYPE))?;
    let (valid_flag, null_flag) = if invert { (0u8, 1u8) } else { (1u8, 0u8) };
    for (i, &src) in sel.iter().enumerate() {
        let valid = vector.is_valid(src);
        if has_null {
            cursors.next_bytes(i, 1)?[0] = if valid { valid_flag } else { null_flag };
        }
        let out = cursors.next_bytes(i, T::KEY_WIDTH)?;
        if valid {
            values[src].encode_sort_key(out);
        } else {
            out.fill(0);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use llkv_types::PhysicalType;

    fn key<T: SortKey>(v: T) -> Vec<u8> {
        let mut out = vec![0u8; T::KEY_WIDTH];
        v.encode_sort_key(&mut out);
        out
    }

    #[test]
    fn signed_integers_flip_sign_byte() {
        assert_eq!(key(-5i32), vec![0x7F, 0xFF, 0xFF, 0xFB]);
        assert_eq!(key(0i32), vec![0x80, 0x00, 0x00, 0x00]);
        assert_eq!(key(5i32), vec![0x80, 0x00, 0x00, 0x05]);
        assert_eq!(key(i8::MIN), vec![0x00]);
        assert_eq!(key(i8::MAX), vec![0xFF]);
    }

    #[test]
    fn unsigned_integers_are_big_endian() {
        assert_eq!(key(0x0102u16), vec![0x01, 0x02]);
        assert_eq!(key(HashValue(1)), vec![0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(key(200u8), vec![200]);
        assert_eq!(key(true), vec![1]);
        assert_eq!(key(false), vec![0]);
    }

    #[test]
    fn float_zeros_share_the_midpoint() {
        assert_eq!(f64_sort_bits(0.0), 1 << 63);
        assert_eq!(f64_sort_bits(-0.0), 1 << 63);
        assert_eq!(f32_sort_bits(-0.0), f32_sort_bits(0.0));
    }

    #[test]
    fn float_extremes() {
        assert_eq!(f64_sort_bits(f64::INFINITY), u64::MAX);
        assert_eq!(f64_sort_bits(f64::NEG_INFINITY), 0);
        assert_eq!(f32_sort_bits(f32::NAN), u32::MAX);
        assert!(f64_sort_bits(f64::MAX) < u64::MAX);
        assert!(f64_sort_bits(-f64::MAX) > 0);
    }

    #[test]
    fn double_example_orders() {
        let ks: Vec<_> = [-1.0f64, -0.0, 0.0, 1.0].into_iter().map(key).collect();
        assert!(ks[0] < ks[1]);
        assert_eq!(ks[1], ks[2]);
        assert!(ks[2] < ks[3]);
    }

    #[test]
    fn interval_orders_field_wise() {
        let a = key(IntervalValue::new(0, 400, 0));
        let b = key(IntervalValue::new(1, 0, 0));
        let c = key(IntervalValue::new(1, 0, -1));
        assert_eq!(a.len(), 16);
        assert!(a < b);
        assert!(c < b);
    }

    #[test]
    fn unsupported_types_are_rejected_by_type() {
        let mut slot = [0u8; 32];
        for vector in [
            Vector::from_options([Some(1i128)]),
            Vector::from_strings([Some("a")]),
        ] {
            let selections: [&[usize]; 3] = [&[0], &[5], &[0, 0]];
            for sel in selections {
                let mut cursors = RowCursors::for_keys(vec![&mut slot[..]]);
                let err = serialize_vector_sortable(&vector, sel, &mut cursors, false, false)
                    .unwrap_err();
                assert!(matches!(err, Error::UnsupportedOperation(_)), "{err}");
            }
        }
        assert_eq!(sortable_width(PhysicalType::Int128, false), None);
        assert_eq!(sortable_width(PhysicalType::Varchar, true), None);
        assert_eq!(sortable_width(PhysicalType::Interval, true), Some(17));
    }

    #[test]
    fn validity_flag_polarity() {
        let vector = Vector::from_options([Some(7i16), None]);
        for (invert, valid, null) in [(false, 1u8, 0u8), (true, 0, 1)] {
            let (mut a, mut b) = ([0xAAu8; 3], [0xAAu8; 3]);
            let mut cursors = RowCursors::for_keys(vec![&mut a[..], &mut b[..]]);
            serialize_vector_sortable(&vector, &[0, 1], &mut cursors, true, invert)
                .unwrap();
            drop(cursors);
            assert_eq!(a, [valid, 0x80, 0x07]);
            assert_eq!(b, [null, 0x00, 0x00]);
        }
    }

    #[test]
    fn selection_picks_source_rows() {
        let vector = Vector::from_options([Some(10u32), Some(20), Some(30)]);
        let (mut a, mut b) = ([0u8; 4], [0u8; 4]);
        let mut cursors = RowCursors::for_keys(vec![&mut a[..], &mut b[..]]);
        serialize_vector_sortable(&vector, &[2, 0], &mut cursors, false, false)
            .unwrap();
        drop(cursors);
        assert_eq!(u32::from_be_bytes(a), 30);
        assert_eq!(u32::from_be_bytes(b), 10);
    }

    #[test]
    fn bad_selection_is_an_invariant_violation() {
        let vector = Vector::from_options([Some(1u8)]);
        let mut a = [0u8; 1];
        let mut cursors = RowCursors::for_keys(vec![&mut a[..]]);
        let err = serialize_vector_sortable(&vector, &[3], &mut cursors, false, false)
            .unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }
}
