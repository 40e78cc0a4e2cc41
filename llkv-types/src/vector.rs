//! Columnar value containers: typed data plus a validity mask.
//!
//! A [`Vector`] is the unit the row encoder consumes and produces. Null slots
//! still occupy a (default-valued) position in the typed data so positions line
//! up with the validity mask.

use std::fmt;

use llkv_result::{Error, Result};

use crate::interval::IntervalValue;
use crate::physical_type::PhysicalType;
use crate::scalar::{HashValue, ScalarValue};

/// Invokes `$macro!(Variant, native_ty)` for every fixed-width physical type.
///
/// Used to generate per-type impls and dispatch arms without repeating the
/// variant/native pairing in every crate.
#[macro_export]
macro_rules! llkv_for_each_fixed_width {
    ($macro:ident) => {
        $macro!(Bool, bool);
        $macro!(Int8, i8);
        $macro!(Int16, i16);
        $macro!(Int32, i32);
        $macro!(Int64, i64);
        $macro!(Int128, i128);
        $macro!(UInt8, u8);
        $macro!(UInt16, u16);
        $macro!(UInt32, u32);
        $macro!(UInt64, u64);
        $macro!(Float, f32);
        $macro!(Double, f64);
        $macro!(Interval, $crate::IntervalValue);
        $macro!(Hash, $crate::HashValue);
    };
}

/// Bit-packed validity: bit set means valid. An all-valid mask allocates nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidityMask {
    bits: Option<Vec<u64>>,
    len: usize,
}

impl ValidityMask {
    pub fn all_valid(len: usize) -> Self {
        Self { bits: None, len }
    }

    pub fn from_bools<I: IntoIterator<Item = bool>>(valid: I) -> Self {
        let mut mask = Self::default();
        for v in valid {
            mask.len += 1;
            mask.set_valid(mask.len - 1, v);
        }
        mask
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len);
        match &self.bits {
            None => true,
            Some(words) => (words[idx / 64] >> (idx % 64)) & 1 == 1,
        }
    }

    pub fn set_valid(&mut self, idx: usize, valid: bool) {
        debug_assert!(idx < self.len);
        if valid && self.bits.is_none() {
            return;
        }
        let len = self.len;
        let words = self
            .bits
            .get_or_insert_with(|| vec![u64::MAX; len.div_ceil(64)]);
        if words.len() < len.div_ceil(64) {
            words.resize(len.div_ceil(64), u64::MAX);
        }
        let bit = 1u64 << (idx % 64);
        if valid {
            words[idx / 64] |= bit;
        } else {
            words[idx / 64] &= !bit;
        }
    }

    pub fn null_count(&self) -> usize {
        match &self.bits {
            None => 0,
            Some(_) => (0..self.len).filter(|&i| !self.is_valid(i)).count(),
        }
    }

    #[inline]
    pub fn has_nulls(&self) -> bool {
        self.null_count() > 0
    }
}

/// Typed storage for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorData {
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Int128(Vec<i128>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Interval(Vec<IntervalValue>),
    Hash(Vec<HashValue>),
    Varchar(Vec<String>),
}

impl VectorData {
    pub fn physical_type(&self) -> PhysicalType {
        macro_rules! arm {
            ($($variant:ident),*) => {
                match self {
                    $(VectorData::$variant(_) => PhysicalType::$variant,)*
                }
            };
        }
        arm![
            Bool, Int8, Int16, Int32, Int64, Int128, UInt8, UInt16, UInt32, UInt64, Float, Double,
            Interval, Hash, Varchar
        ]
    }

    pub fn len(&self) -> usize {
        macro_rules! arm {
            ($($variant:ident),*) => {
                match self {
                    $(VectorData::$variant(v) => v.len(),)*
                }
            };
        }
        arm![
            Bool, Int8, Int16, Int32, Int64, Int128, UInt8, UInt16, UInt32, UInt64, Float, Double,
            Interval, Hash, Varchar
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rust types that back a fixed-width [`PhysicalType`].
pub trait NativeType: Copy + Default + PartialOrd + fmt::Debug + Send + Sync + 'static {
    const PHYSICAL_TYPE: PhysicalType;
    const WIDTH: usize = std::mem::size_of::<Self>();

    fn values(data: &VectorData) -> Option<&[Self]>;
    fn into_data(values: Vec<Self>) -> VectorData;
    fn into_scalar(self) -> ScalarValue;
}

macro_rules! impl_native_type {
    ($variant:ident, $native:ty) => {
        impl NativeType for $native {
            const PHYSICAL_TYPE: PhysicalType = PhysicalType::$variant;

            #[inline]
            fn values(data: &VectorData) -> Option<&[Self]> {
                match data {
                    VectorData::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }

            #[inline]
            fn into_data(values: Vec<Self>) -> VectorData {
                VectorData::$variant(values)
            }

            #[inline]
            fn into_scalar(self) -> ScalarValue {
                ScalarValue::$variant(self)
            }
        }
    };
}

llkv_for_each_fixed_width!(impl_native_type);

/// A column of values with its validity mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    data: VectorData,
    validity: ValidityMask,
}

impl Vector {
    /// A vector with every row valid.
    pub fn new(data: VectorData) -> Self {
        let validity = ValidityMask::all_valid(data.len());
        Self { data, validity }
    }

    pub fn with_validity(data: VectorData, validity: ValidityMask) -> Result<Self> {
        if data.len() != validity.len() {
            return Err(Error::invariant(format!(
                "validity mask covers {} rows but vector has {}",
                validity.len(),
                data.len()
            )));
        }
        Ok(Self { data, validity })
    }

    /// Build from optional natives; `None` becomes a null slot holding `T::default()`.
    pub fn from_options<T: NativeType>(values: impl IntoIterator<Item = Option<T>>) -> Self {
        let mut data = Vec::new();
        let mut valid = Vec::new();
        for v in values {
            valid.push(v.is_some());
            data.push(v.unwrap_or_default());
        }
        Self {
            data: T::into_data(data),
            validity: ValidityMask::from_bools(valid),
        }
    }

    pub fn from_strings<S: Into<String>>(values: impl IntoIterator<Item = Option<S>>) -> Self {
        let mut data = Vec::new();
        let mut valid = Vec::new();
        for v in values {
            valid.push(v.is_some());
            data.push(v.map(Into::into).unwrap_or_default());
        }
        Self {
            data: VectorData::Varchar(data),
            validity: ValidityMask::from_bools(valid),
        }
    }

    #[inline]
    pub fn physical_type(&self) -> PhysicalType {
        self.data.physical_type()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &VectorData {
        &self.data
    }

    #[inline]
    pub fn validity(&self) -> &ValidityMask {
        &self.validity
    }

    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity.is_valid(idx)
    }

    /// Typed view of the data, or `None` if `T` does not match the physical type.
    #[inline]
    pub fn values<T: NativeType>(&self) -> Option<&[T]> {
        T::values(&self.data)
    }

    #[inline]
    pub fn strings(&self) -> Option<&[String]> {
        match &self.data {
            VectorData::Varchar(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Value at `idx`, `None` when the slot is null.
    pub fn value(&self, idx: usize) -> Option<ScalarValue> {
        if !self.is_valid(idx) {
            return None;
        }
        macro_rules! arm {
            ($($variant:ident),*) => {
                match &self.data {
                    $(VectorData::$variant(v) => ScalarValue::$variant(v[idx].clone()),)*
                }
            };
        }
        Some(arm![
            Bool, Int8, Int16, Int32, Int64, Int128, UInt8, UInt16, UInt32, UInt64, Float, Double,
            Interval, Hash, Varchar
        ])
    }
}
