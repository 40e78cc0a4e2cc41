//! Per-segment statistics and their merge.

use std::cmp::Ordering;

use llkv_result::{Error, Result};
use llkv_types::{PhysicalType, ScalarValue, Vector};

/// Min/max bounds, null and row counts, and (for numeric types) a running sum.
///
/// A NaN value poisons the bound it touches so the next [`merge`] rejects it.
///
/// [`merge`]: SegmentStatistics::merge
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentStatistics {
    physical_type: PhysicalType,
    min: Option<ScalarValue>,
    max: Option<ScalarValue>,
    null_count: u64,
    row_count: u64,
    sum: Option<f64>,
}

impl SegmentStatistics {
    /// Empty statistics: no rows, no bounds.
    pub fn new(physical_type: PhysicalType) -> Self {
        Self {
            physical_type,
            min: None,
            max: None,
            null_count: 0,
            row_count: 0,
            sum: physical_type.is_numeric().then_some(0.0),
        }
    }

    /// Statistics over every row of `vector`.
    pub fn from_vector(vector: &Vector) -> Self {
        let mut stats = Self::new(vector.physical_type());
        for idx in 0..vector.len() {
            stats.update(vector.value(idx).as_ref());
        }
        stats
    }

    /// Account for one row; `None` is a null.
    pub fn update(&mut self, value: Option<&ScalarValue>) {
        self.row_count += 1;
        let Some(value) = value else {
            self.null_count += 1;
            return;
        };
        widen(&mut self.min, value, Ordering::Less);
        widen(&mut self.max, value, Ordering::Greater);
        if let (Some(sum), Some(v)) = (self.sum.as_mut(), value.as_f64()) {
            *sum += v;
        }
    }

    #[inline]
    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    #[inline]
    pub fn min(&self) -> Option<&ScalarValue> {
        self.min.as_ref()
    }

    #[inline]
    pub fn max(&self) -> Option<&ScalarValue> {
        self.max.as_ref()
    }

    #[inline]
    pub fn null_count(&self) -> u64 {
        self.null_count
    }

    #[inline]
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    #[inline]
    pub fn sum(&self) -> Option<f64> {
        self.sum
    }

    /// Every row holds the same value, or every row is null.
    pub fn is_constant(&self) -> bool {
        if self.row_count == 0 {
            return false;
        }
        if self.null_count == self.row_count {
            return true;
        }
        self.null_count == 0
            && matches!(
                (&self.min, &self.max),
                (Some(lo), Some(hi)) if !lo.is_nan() && bound_cmp(lo, hi) == Some(Ordering::Equal)
            )
    }

    /// The single value of a constant segment; `None` for all-null or
    /// non-constant statistics.
    pub fn constant_value(&self) -> Option<&ScalarValue> {
        self.min.as_ref().filter(|_| self.is_constant())
    }

    /// Fold `other` into `self`.
    ///
    /// Fails with `RangeError` when either side carries a NaN bound or the
    /// combined sum is not finite, and with `InvariantViolation` when the
    /// physical types differ. On error `self` is unchanged.
    pub fn merge(&mut self, other: &SegmentStatistics) -> Result<()> {
        if self.physical_type != other.physical_type {
            return Err(Error::invariant(format!(
                "cannot merge {} statistics into {}",
                other.physical_type, self.physical_type
            )));
        }
        for bound in [&self.min, &self.max, &other.min, &other.max]
            .into_iter()
            .flatten()
        {
            if bound.is_nan() {
                return Err(Error::range(format!(
                    "{} statistics hold a NaN bound",
                    self.physical_type
                )));
            }
        }
        let sum = match (self.sum, other.sum) {
            (Some(a), Some(b)) => {
                let s = a + b;
                if !s.is_finite() {
                    return Err(Error::range(format!(
                        "{} running sum {a} + {b} is not finite",
                        self.physical_type
                    )));
                }
                Some(s)
            }
            _ => None,
        };
        let row_count = self
            .row_count
            .checked_add(other.row_count)
            .ok_or_else(|| Error::range("row count overflow"))?;

        if let Some(v) = &other.min {
            widen(&mut self.min, v, Ordering::Less);
        }
        if let Some(v) = &other.max {
            widen(&mut self.max, v, Ordering::Greater);
        }
        self.null_count += other.null_count;
        self.row_count = row_count;
        self.sum = sum;
        Ok(())
    }
}

/// Replace `bound` with `value` when `value` compares `want` against it. NaN
/// values always win so they stay visible to `merge`.
fn widen(bound: &mut Option<ScalarValue>, value: &ScalarValue, want: Ordering) {
    let replace = match bound {
        None => true,
        Some(current) if current.is_nan() => false,
        Some(_) if value.is_nan() => true,
        Some(current) => bound_cmp(value, current) == Some(want),
    };
    if replace {
        *bound = Some(value.clone());
    }
}

/// Value order, except that floats use the IEEE total order so `-0.0` sorts
/// below `0.0` and the two never collapse into one bound.
fn bound_cmp(a: &ScalarValue, b: &ScalarValue) -> Option<Ordering> {
    match (a, b) {
        (ScalarValue::Float(a), ScalarValue::Float(b)) => Some(a.total_cmp(b)),
        (ScalarValue::Double(a), ScalarValue::Double(b)) => Some(a.total_cmp(b)),
        _ => a.partial_cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vector_tracks_bounds_nulls_and_sum() {
        let v = Vector::from_options([Some(3i32), None, Some(-7), Some(10)]);
        let s = SegmentStatistics::from_vector(&v);
        assert_eq!(s.min(), Some(&ScalarValue::Int32(-7)));
        assert_eq!(s.max(), Some(&ScalarValue::Int32(10)));
        assert_eq!(s.null_count(), 1);
        assert_eq!(s.row_count(), 4);
        assert_eq!(s.sum(), Some(6.0));
        assert!(!s.is_constant());
    }

    #[test]
    fn constant_detection() {
        let same = SegmentStatistics::from_vector(&Vector::from_options([Some(4u16); 5]));
        assert!(same.is_constant());
        assert_eq!(same.constant_value(), Some(&ScalarValue::UInt16(4)));

        let all_null = SegmentStatistics::from_vector(&Vector::from_options([None::<f64>; 3]));
        assert!(all_null.is_constant());
        assert_eq!(all_null.constant_value(), None);

        let with_null = SegmentStatistics::from_vector(&Vector::from_options([Some(1i8), None]));
        assert!(!with_null.is_constant());

        assert!(!SegmentStatistics::new(PhysicalType::Int8).is_constant());
    }

    #[test]
    fn signed_zeros_are_distinct_bounds() {
        let zeros = Vector::from_options([Some(0.0f64), Some(-0.0)]);
        let mixed = SegmentStatistics::from_vector(&zeros);
        assert!(!mixed.is_constant());
        assert_eq!(mixed.constant_value(), None);
        let (Some(ScalarValue::Double(lo)), Some(ScalarValue::Double(hi))) =
            (mixed.min(), mixed.max())
        else {
            panic!("missing bounds");
        };
        assert!(lo.is_sign_negative() && *lo == 0.0);
        assert!(hi.is_sign_positive() && *hi == 0.0);

        let negative = SegmentStatistics::from_vector(&Vector::from_options([Some(-0.0f32); 3]));
        assert!(negative.is_constant());
        assert!(matches!(
            negative.constant_value(),
            Some(ScalarValue::Float(v)) if v.is_sign_negative()
        ));

        let mut merged = SegmentStatistics::from_vector(&Vector::from_options([Some(0.0f32)]));
        merged.merge(&negative).unwrap();
        assert!(!merged.is_constant());
    }

    #[test]
    fn merge_widens_bounds() {
        let mut a = SegmentStatistics::from_vector(&Vector::from_strings([Some("m"), Some("p")]));
        let b = SegmentStatistics::from_vector(&Vector::from_strings([Some("c"), None]));
        a.merge(&b).unwrap();
        assert_eq!(a.min(), Some(&ScalarValue::Varchar("c".into())));
        assert_eq!(a.max(), Some(&ScalarValue::Varchar("p".into())));
        assert_eq!(a.null_count(), 1);
        assert_eq!(a.row_count(), 4);
        assert_eq!(a.sum(), None);
    }

    #[test]
    fn merge_rejects_nan_bounds_and_non_finite_sums() {
        let mut global = SegmentStatistics::new(PhysicalType::Double);
        let with_nan = Vector::from_options([Some(1.0f64), Some(f64::NAN)]);
        let nan = SegmentStatistics::from_vector(&with_nan);
        assert!(matches!(global.merge(&nan), Err(Error::RangeError(_))));
        assert_eq!(global, SegmentStatistics::new(PhysicalType::Double));

        let big = SegmentStatistics::from_vector(&Vector::from_options([Some(f64::MAX)]));
        global.merge(&big).unwrap();
        assert!(matches!(global.merge(&big), Err(Error::RangeError(_))));
        assert_eq!(global.row_count(), 1);
    }

    #[test]
    fn merge_rejects_type_mismatch() {
        let mut a = SegmentStatistics::new(PhysicalType::Int32);
        let b = SegmentStatistics::new(PhysicalType::Int64);
        assert!(matches!(a.merge(&b), Err(Error::InvariantViolation(_))));
    }
}
