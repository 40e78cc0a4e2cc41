//! Owned, typed single values.

use std::cmp::Ordering;

use crate::interval::IntervalValue;
use crate::physical_type::PhysicalType;

/// A 64-bit hash stored in a `HASH` column.
///
/// A newtype rather than a bare `u64` so `HASH` and `UINT64` columns stay
/// distinct at the type level even though they share a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(transparent)]
pub struct HashValue(pub u64);

/// One non-null value of any physical type.
///
/// Nulls are represented out-of-band (`Option<ScalarValue>` or a
/// [`ValidityMask`](crate::ValidityMask)), never as a variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int128(i128),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Interval(IntervalValue),
    Hash(HashValue),
    Varchar(String),
}

impl ScalarValue {
    pub fn physical_type(&self) -> PhysicalType {
        match self {
            ScalarValue::Bool(_) => PhysicalType::Bool,
            ScalarValue::Int8(_) => PhysicalType::Int8,
            ScalarValue::Int16(_) => PhysicalType::Int16,
            ScalarValue::Int32(_) => PhysicalType::Int32,
            ScalarValue::Int64(_) => PhysicalType::Int64,
            ScalarValue::Int128(_) => PhysicalType::Int128,
            ScalarValue::UInt8(_) => PhysicalType::UInt8,
            ScalarValue::UInt16(_) => PhysicalType::UInt16,
            ScalarValue::UInt32(_) => PhysicalType::UInt32,
            ScalarValue::UInt64(_) => PhysicalType::UInt64,
            ScalarValue::Float(_) => PhysicalType::Float,
            ScalarValue::Double(_) => PhysicalType::Double,
            ScalarValue::Interval(_) => PhysicalType::Interval,
            ScalarValue::Hash(_) => PhysicalType::Hash,
            ScalarValue::Varchar(_) => PhysicalType::Varchar,
        }
    }

    /// Numeric value widened to `f64`; `None` for non-numeric types.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ScalarValue::Int8(v) => Some(v as f64),
            ScalarValue::Int16(v) => Some(v as f64),
            ScalarValue::Int32(v) => Some(v as f64),
            ScalarValue::Int64(v) => Some(v as f64),
            ScalarValue::Int128(v) => Some(v as f64),
            ScalarValue::UInt8(v) => Some(v as f64),
            ScalarValue::UInt16(v) => Some(v as f64),
            ScalarValue::UInt32(v) => Some(v as f64),
            ScalarValue::UInt64(v) => Some(v as f64),
            ScalarValue::Float(v) => Some(v as f64),
            ScalarValue::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_nan(&self) -> bool {
        match *self {
            ScalarValue::Float(v) => v.is_nan(),
            ScalarValue::Double(v) => v.is_nan(),
            _ => false,
        }
    }
}

/// Values of different physical types are unordered, as are NaNs.
impl PartialOrd for ScalarValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use ScalarValue::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a.partial_cmp(b),
            (Int8(a), Int8(b)) => a.partial_cmp(b),
            (Int16(a), Int16(b)) => a.partial_cmp(b),
            (Int32(a), Int32(b)) => a.partial_cmp(b),
            (Int64(a), Int64(b)) => a.partial_cmp(b),
            (Int128(a), Int128(b)) => a.partial_cmp(b),
            (UInt8(a), UInt8(b)) => a.partial_cmp(b),
            (UInt16(a), UInt16(b)) => a.partial_cmp(b),
            (UInt32(a), UInt32(b)) => a.partial_cmp(b),
            (UInt64(a), UInt64(b)) => a.partial_cmp(b),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Double(a), Double(b)) => a.partial_cmp(b),
            (Interval(a), Interval(b)) => a.partial_cmp(b),
            (Hash(a), Hash(b)) => a.partial_cmp(b),
            (Varchar(a), Varchar(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

macro_rules! impl_from_for_scalar {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for ScalarValue {
                fn from(v: $t) -> Self {
                    ScalarValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_scalar!(
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    i128 => Int128,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    IntervalValue => Interval,
    HashValue => Hash,
    String => Varchar,
);

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Varchar(v.to_string())
    }
}
