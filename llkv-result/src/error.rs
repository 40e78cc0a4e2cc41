use std::{fmt, io};
use thiserror::Error;

/// Unified error type for the row-encoding and checkpoint crates.
///
/// Every fallible operation in the workspace returns this enum. Nothing in these
/// crates validates user input: values arrive from upstream engine stages that
/// already validated them, so most variants describe defects rather than bad
/// requests.
///
/// # Error Handling Strategy
///
/// Errors propagate upward through the call stack using Rust's `?` operator. Any
/// failure aborts the current allocation, flush, or checkpoint pass. There is no
/// internal retry and no partial-success path.
///
/// # Thread Safety
///
/// `Error` implements `Send` and `Sync` so checkpoint workers running on a thread
/// pool can hand failures back to the coordinating thread.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading or writing blocks.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Storage key or block not found.
    ///
    /// Raised by pagers when a block id has no stored bytes, and by buffer
    /// lookups for buffers that were already released.
    #[error("Storage key not found")]
    NotFound,

    /// The requested type or code path is not implemented.
    ///
    /// Determined purely by the physical type involved, never by the values
    /// being encoded. Examples:
    /// - sortable keys for variable-length text
    /// - sortable keys for 128-bit integers
    /// - a compression function that was never registered
    ///
    /// # Recovery
    ///
    /// None inside this workspace. The caller must pick a different plan.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// An internal contract was broken.
    ///
    /// Indicates a defect either upstream or in this workspace:
    /// - flushing a partial block that was already flushed
    /// - an allocation offset that does not match its reuse/new outcome
    /// - a segment larger than the block it must fit into
    /// - vector data that does not match its declared physical type
    ///
    /// Fatal. Callers must not retry.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A statistics merge produced a non-finite or otherwise invalid aggregate.
    ///
    /// Surfaced as a failed checkpoint for the affected column.
    #[error("Out of range: {0}")]
    RangeError(String),

    /// The buffer manager refused an allocation because it would exceed the
    /// configured memory limit.
    #[error("out of memory: requested {requested} bytes with limit {limit} bytes")]
    OutOfMemory { requested: usize, limit: usize },

    /// Internal error indicating a bug or unexpected state outside the
    /// categories above (e.g. key space exhaustion in a pager).
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Create an [`Error::UnsupportedOperation`] from any displayable message.
    ///
    /// # Examples
    ///
    /// ```
    /// use llkv_result::Error;
    ///
    /// let err = Error::unsupported("sortable encoding for VARCHAR");
    /// assert!(matches!(err, Error::UnsupportedOperation(msg) if msg.contains("VARCHAR")));
    /// ```
    #[inline]
    pub fn unsupported<E: fmt::Display>(what: E) -> Self {
        Error::UnsupportedOperation(what.to_string())
    }

    /// Create an [`Error::InvariantViolation`] from any displayable message.
    #[inline]
    pub fn invariant<E: fmt::Display>(what: E) -> Self {
        Error::InvariantViolation(what.to_string())
    }

    /// Create an [`Error::RangeError`] from any displayable message.
    ///
    /// # Examples
    ///
    /// ```
    /// use llkv_result::Error;
    ///
    /// fn checked_sum(a: f64, b: f64) -> Result<f64, Error> {
    ///     let sum = a + b;
    ///     if !sum.is_finite() {
    ///         return Err(Error::range(format!("{a} + {b} overflows")));
    ///     }
    ///     Ok(sum)
    /// }
    ///
    /// assert_eq!(checked_sum(1.0, 2.0).unwrap(), 3.0);
    /// assert!(matches!(checked_sum(f64::MAX, f64::MAX), Err(Error::RangeError(_))));
    /// ```
    #[inline]
    pub fn range<E: fmt::Display>(what: E) -> Self {
        Error::RangeError(what.to_string())
    }

    /// Whether the error denotes a defect (as opposed to a resource problem).
    #[inline]
    pub fn is_defect(&self) -> bool {
        matches!(self, Error::InvariantViolation(_) | Error::Internal(_))
    }
}
