//! Row ("payload") encoding.
//!
//! Values are stored in native host layout with no byte swapping, so a payload
//! row is only meaningful on the machine that wrote it. Text is a native `u32`
//! length prefix followed by the raw bytes. Nullability lives in the per-row
//! validity bitmap maintained by payload [`RowCursors`]; a null value still
//! occupies its slot (zeroed, or a zero length prefix for text) so every column
//! can be skipped without consulting the bitmap.

use std::mem::size_of;

use llkv_result::{Error, Result};
use llkv_types::{
    HashValue, IntervalValue, NativeType, PhysicalType, ValidityMask, Vector, VectorData,
};

use crate::cursors::{RowCursors, RowReaders};
use crate::dispatch;
use crate::sortable::{check_selection, type_mismatch};

const LEN_PREFIX: usize = size_of::<u32>();

/// A native type with a host-layout row encoding.
pub trait RowNative: NativeType {
    /// Write `self` into `out`, which is exactly `WIDTH` bytes.
    fn write_row(self, out: &mut [u8]);
    /// Read a value from exactly `WIDTH` bytes.
    fn read_row(bytes: &[u8]) -> Self;
}

macro_rules! impl_row_native {
    ($($t:ty),*) => {$(
        impl RowNative for $t {
            #[inline]
            fn write_row(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_ne_bytes());
            }

            #[inline]
            fn read_row(bytes: &[u8]) -> Self {
                let mut buf = [0u8; size_of::<$t>()];
                buf.copy_from_slice(bytes);
                <$t>::from_ne_bytes(buf)
            }
        }
    )*};
}

impl_row_native!(i8, i16, i32, i64, i128, u8, u16, u32, u64, f32, f64);

impl RowNative for bool {
    #[inline]
    fn write_row(self, out: &mut [u8]) {
        out[0] = u8::from(self);
    }

    #[inline]
    fn read_row(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

impl RowNative for HashValue {
    #[inline]
    fn write_row(self, out: &mut [u8]) {
        self.0.write_row(out);
    }

    #[inline]
    fn read_row(bytes: &[u8]) -> Self {
        HashValue(u64::read_row(bytes))
    }
}

impl RowNative for IntervalValue {
    #[inline]
    fn write_row(self, out: &mut [u8]) {
        self.months.write_row(&mut out[0..4]);
        self.days.write_row(&mut out[4..8]);
        self.micros.write_row(&mut out[8..16]);
    }

    #[inline]
    fn read_row(bytes: &[u8]) -> Self {
        IntervalValue::new(
            i32::read_row(&bytes[0..4]),
            i32::read_row(&bytes[4..8]),
            i64::read_row(&bytes[8..16]),
        )
    }
}

/// Append column `col_idx` of the rows `sel` of `vector` to payload rows.
///
/// Null values clear bit `col_idx % 8` of bitmap byte `col_idx / 8`.
pub fn serialize_vector(
    vector: &Vector,
    sel: &[usize],
    col_idx: usize,
    cursors: &mut RowCursors<'_>,
) -> Result<()> {
    check_selection(vector, sel, cursors.len())?;
    cursors.check_column(col_idx)?;
    let encode = dispatch::ops(vector.physical_type()).encode_row;
    encode(vector, sel, col_idx, cursors)
}

/// Decode column `col_idx` of the first `count` payload rows into a vector of
/// type `ty`, advancing each reader past the value.
pub fn deserialize_into_vector(
    ty: PhysicalType,
    count: usize,
    col_idx: usize,
    readers: &mut RowReaders<'_>,
) -> Result<Vector> {
    readers.check_column(col_idx)?;
    if count > readers.len() {
        return Err(Error::invariant(format!(
            "decoding {count} rows from {} readers",
            readers.len()
        )));
    }
    let decode = dispatch::ops(ty).decode_row;
    decode(count, col_idx, readers)
}

/// Advance the first `count` readers past one encoded value of type `ty`.
pub fn skip_over_type(ty: PhysicalType, count: usize, readers: &mut RowReaders<'_>) -> Result<()> {
    if count > readers.len() {
        return Err(Error::invariant(format!(
            "skipping {count} rows over {} readers",
            readers.len()
        )));
    }
    match dispatch::ops(ty).width {
        Some(width) => {
            for i in 0..count {
                readers.next_bytes(i, width)?;
            }
        }
        None => {
            for i in 0..count {
                let len = u32::read_row(readers.next_bytes(i, LEN_PREFIX)?) as usize;
                readers.next_bytes(i, len)?;
            }
        }
    }
    Ok(())
}

/// Write the global row index `start + i` (native `u64`) through cursor `i`.
///
/// Sort keys carry this index so sorted keys can be joined back to their
/// payload rows.
pub fn serialize_indices(cursors: &mut RowCursors<'_>, start: u64) -> Result<()> {
    for i in 0..cursors.len() {
        (start + i as u64).write_row(cursors.next_bytes(i, size_of::<u64>())?);
    }
    Ok(())
}

pub(crate) fn encode_row_fixed<T: RowNative>(
    vector: &Vector,
    sel: &[usize],
    col_idx: usize,
    cursors: &mut RowCursors<'_>,
) -> Result<()> {
    let values = vector
        .values::<T>()
        .ok_or_else(|| type_mismatch(vector, T::PHYSICAL_TYPE))?;
    for (i, &src) in sel.iter().enumerate() {
        let out = cursors.next_bytes(i, T::WIDTH)?;
        if vector.is_valid(src) {
            values[src].write_row(out);
        } else {
            out.fill(0);
            cursors.clear_valid(i, col_idx)?;
        }
    }
    Ok(())
}

pub(crate) fn decode_row_fixed<T: RowNative>(
    count: usize,
    col_idx: usize,
    readers: &mut RowReaders<'_>,
) -> Result<Vector> {
    let mut values = Vec::with_capacity(count);
    let mut valid = Vec::with_capacity(count);
    for i in 0..count {
        values.push(T::read_row(readers.next_bytes(i, T::WIDTH)?));
        valid.push(readers.is_valid(i, col_idx)?);
    }
    Vector::with_validity(T::into_data(values), ValidityMask::from_bools(valid))
}

pub(crate) fn encode_varchar(
    vector: &Vector,
    sel: &[usize],
    col_idx: usize,
    cursors: &mut RowCursors<'_>,
) -> Result<()> {
    let strings = vector
        .strings()
        .ok_or_else(|| type_mismatch(vector, PhysicalType::Varchar))?;
    for (i, &src) in sel.iter().enumerate() {
        let bytes: &[u8] = if vector.is_valid(src) {
            strings[src].as_bytes()
        } else {
            cursors.clear_valid(i, col_idx)?;
            &[]
        };
        let len = u32::try_from(bytes.len()).map_err(|_| {
            Error::unsupported(format!("VARCHAR value of {} bytes", bytes.len()))
        })?;
        len.write_row(cursors.next_bytes(i, LEN_PREFIX)?);
        cursors.next_bytes(i, bytes.len())?.copy_from_slice(bytes);
    }
    Ok(())
}

pub(crate) fn decode_varchar(
    count: usize,
    col_idx: usize,
    readers: &mut RowReaders<'_>,
) -> Result<Vector> {
    let mut values = Vec::with_capacity(count);
    let mut valid = Vec::with_capacity(count);
    for i in 0..count {
        let len = u32::read_row(readers.next_bytes(i, LEN_PREFIX)?) as usize;
        let bytes = readers.next_bytes(i, len)?;
        let s = std::str::from_utf8(bytes)
            .map_err(|e| Error::invariant(format!("row {i}: VARCHAR payload is not UTF-8: {e}")))?;
        values.push(s.to_owned());
        valid.push(readers.is_valid(i, col_idx)?);
    }
    Vector::with_validity(VectorData::Varchar(values), ValidityMask::from_bools(valid))
}
