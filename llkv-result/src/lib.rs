//! Error types and result definitions shared by the LLKV row-encoding and
//! checkpoint crates.
//!
//! Every crate in the workspace returns [`Result<T>`], whose error variant is the
//! single [`Error`] enum. Keeping one enum lets failures cross crate boundaries
//! with `?` and lets callers match on the category they care about.
//!
//! # Error Categories
//!
//! - **Unsupported paths** ([`Error::UnsupportedOperation`]): a physical type the
//!   requested encoding does not cover
//! - **Defects** ([`Error::InvariantViolation`], [`Error::Internal`]): a broken
//!   internal contract; never retried
//! - **Statistics** ([`Error::RangeError`]): an aggregate left the valid range
//! - **Resources** ([`Error::OutOfMemory`], [`Error::Io`], [`Error::NotFound`])

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
