//! Closed enumeration of the physical layouts understood by the storage layer.

use std::fmt;

/// Underlying fixed-shape in-memory representation of a column, independent of
/// its SQL type.
///
/// The discriminants are dense and start at zero so the enum can index static
/// dispatch tables (see `PhysicalType::index`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PhysicalType {
    Bool = 0,
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    Int128 = 5,
    UInt8 = 6,
    UInt16 = 7,
    UInt32 = 8,
    UInt64 = 9,
    Float = 10,
    Double = 11,
    Interval = 12,
    Hash = 13,
    Varchar = 14,
}

impl PhysicalType {
    /// Every physical type, in discriminant order.
    pub const ALL: [PhysicalType; 15] = [
        PhysicalType::Bool,
        PhysicalType::Int8,
        PhysicalType::Int16,
        PhysicalType::Int32,
        PhysicalType::Int64,
        PhysicalType::Int128,
        PhysicalType::UInt8,
        PhysicalType::UInt16,
        PhysicalType::UInt32,
        PhysicalType::UInt64,
        PhysicalType::Float,
        PhysicalType::Double,
        PhysicalType::Interval,
        PhysicalType::Hash,
        PhysicalType::Varchar,
    ];

    /// Position of this type in [`PhysicalType::ALL`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Width in bytes of one value, or `None` for variable-length types.
    #[inline]
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            PhysicalType::Bool | PhysicalType::Int8 | PhysicalType::UInt8 => Some(1),
            PhysicalType::Int16 | PhysicalType::UInt16 => Some(2),
            PhysicalType::Int32 | PhysicalType::UInt32 | PhysicalType::Float => Some(4),
            PhysicalType::Int64
            | PhysicalType::UInt64
            | PhysicalType::Double
            | PhysicalType::Hash => Some(8),
            PhysicalType::Int128 | PhysicalType::Interval => Some(16),
            PhysicalType::Varchar => None,
        }
    }

    #[inline]
    pub const fn is_constant_size(self) -> bool {
        self.fixed_width().is_some()
    }

    /// Integer and floating point types; the ones statistics keep a sum for.
    #[inline]
    pub const fn is_numeric(self) -> bool {
        !matches!(
            self,
            PhysicalType::Bool
                | PhysicalType::Interval
                | PhysicalType::Hash
                | PhysicalType::Varchar
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            PhysicalType::Bool => "BOOL",
            PhysicalType::Int8 => "INT8",
            PhysicalType::Int16 => "INT16",
            PhysicalType::Int32 => "INT32",
            PhysicalType::Int64 => "INT64",
            PhysicalType::Int128 => "INT128",
            PhysicalType::UInt8 => "UINT8",
            PhysicalType::UInt16 => "UINT16",
            PhysicalType::UInt32 => "UINT32",
            PhysicalType::UInt64 => "UINT64",
            PhysicalType::Float => "FLOAT",
            PhysicalType::Double => "DOUBLE",
            PhysicalType::Interval => "INTERVAL",
            PhysicalType::Hash => "HASH",
            PhysicalType::Varchar => "VARCHAR",
        }
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_indexed_by_discriminant() {
        for (i, ty) in PhysicalType::ALL.iter().enumerate() {
            assert_eq!(ty.index(), i, "{ty} out of place");
        }
    }

    #[test]
    fn widths() {
        assert_eq!(PhysicalType::Bool.fixed_width(), Some(1));
        assert_eq!(PhysicalType::Hash.fixed_width(), Some(8));
        assert_eq!(PhysicalType::Interval.fixed_width(), Some(16));
        assert!(!PhysicalType::Varchar.is_constant_size());
        assert!(PhysicalType::Double.is_numeric());
        assert!(!PhysicalType::Hash.is_numeric());
    }
}
