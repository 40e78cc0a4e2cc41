use crate::error::Error;

/// Result type alias used throughout LLKV.
///
/// Shorthand for `std::result::Result<T, Error>`. All LLKV operations that can
/// fail return this type.
pub type Result<T> = std::result::Result<T, Error>;
