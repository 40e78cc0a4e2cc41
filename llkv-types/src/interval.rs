//! Interval value stored as calendar months, whole days, and microseconds.

/// Interval value stored as a combination of calendar months, whole days, and
/// microseconds.
///
/// Months capture both month and year components (12 months == 1 year). Days
/// represent whole 24-hour periods and microseconds account for sub-day
/// precision. The three fields are kept independent: `1 month` and `30 days` are
/// distinct values, and ordering compares months, then days, then micros.
///
/// The in-memory layout is 16 bytes (`i32`, `i32`, `i64`), which is also the
/// width of both its row-mode and sortable encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct IntervalValue {
    pub months: i32,
    pub days: i32,
    pub micros: i64,
}

impl IntervalValue {
    /// Encoded width in bytes.
    pub const WIDTH: usize = 16;

    pub const fn new(months: i32, days: i32, micros: i64) -> Self {
        Self {
            months,
            days,
            micros,
        }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0, 0)
    }
}
