//! Physical types, scalar values, and columnar vectors shared by the LLKV
//! row-encoding and checkpoint crates.

pub mod interval;
pub mod physical_type;
pub mod scalar;
pub mod vector;

pub use interval::IntervalValue;
pub use physical_type::PhysicalType;
pub use scalar::{HashValue, ScalarValue};
pub use vector::{NativeType, ValidityMask, Vector, VectorData};
