//! Static per-type dispatch table.
//!
//! One [`TypeOps`] per [`PhysicalType`], stored at `ty.index()`. Each entry
//! carries the fixed width and the monomorphized encode/decode functions, so
//! choosing a code path is a single array lookup instead of a `match` in every
//! operation.

use std::mem::size_of;

use llkv_result::Result;
use llkv_types::{HashValue, IntervalValue, PhysicalType, Vector};

use crate::cursors::{RowCursors, RowReaders};
use crate::payload::{decode_row_fixed, decode_varchar, encode_row_fixed, encode_varchar};
use crate::sortable::encode_sortable;

pub(crate) type SortableFn = fn(&Vector, &[usize], &mut RowCursors<'_>, bool, bool) -> Result<()>;
pub(crate) type RowEncodeFn = fn(&Vector, &[usize], usize, &mut RowCursors<'_>) -> Result<()>;
pub(crate) type RowDecodeFn = fn(usize, usize, &mut RowReaders<'_>) -> Result<Vector>;

pub(crate) struct TypeOps {
    pub ty: PhysicalType,
    /// Encoded width of one value; `None` for length-prefixed types.
    pub width: Option<usize>,
    /// `None` when the type has no order-preserving encoding.
    pub sortable: Option<SortableFn>,
    pub encode_row: RowEncodeFn,
    pub decode_row: RowDecodeFn,
}

macro_rules! fixed_ops {
    ($variant:ident, $native:ty) => {
        TypeOps {
            ty: PhysicalType::$variant,
            width: Some(size_of::<$native>()),
            sortable: Some(encode_sortable::<$native> as SortableFn),
            encode_row: encode_row_fixed::<$native> as RowEncodeFn,
            decode_row: decode_row_fixed::<$native> as RowDecodeFn,
        }
    };
    ($variant:ident, $native:ty, unsortable) => {
        TypeOps {
            ty: PhysicalType::$variant,
            width: Some(size_of::<$native>()),
            sortable: None,
            encode_row: encode_row_fixed::<$native> as RowEncodeFn,
            decode_row: decode_row_fixed::<$native> as RowDecodeFn,
        }
    };
}

static TYPE_OPS: [TypeOps; PhysicalType::ALL.len()] = [
    fixed_ops!(Bool, bool),
    fixed_ops!(Int8, i8),
    fixed_ops!(Int16, i16),
    fixed_ops!(Int32, i32),
    fixed_ops!(Int64, i64),
    fixed_ops!(Int128, i128, unsortable),
    fixed_ops!(UInt8, u8),
    fixed_ops!(UInt16, u16),
    fixed_ops!(UInt32, u32),
    fixed_ops!(UInt64, u64),
    fixed_ops!(Float, f32),
    fixed_ops!(Double, f64),
    fixed_ops!(Interval, IntervalValue),
    fixed_ops!(Hash, HashValue),
    TypeOps {
        ty: PhysicalType::Varchar,
        width: None,
        sortable: None,
        encode_row: encode_varchar as RowEncodeFn,
        decode_row: decode_varchar as RowDecodeFn,
    },
];

#[inline]
pub(crate) fn ops(ty: PhysicalType) -> &'static TypeOps {
    &TYPE_OPS[ty.index()]
}
