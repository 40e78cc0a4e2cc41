//! Per-row write and read positions.
//!
//! Encoders work column by column over a batch of rows: each call appends one
//! column to every row, so every row carries its own cursor. [`RowCursors`]
//! writes and [`RowReaders`] reads. Both come in two layouts:
//!
//! - *keys*: the row is a plain concatenation of encoded columns
//! - *payload*: the row starts with a validity bitmap of `ceil(columns / 8)`
//!   bytes, one bit per column, set when the column is valid

use llkv_result::{Error, Result};

/// Number of bitmap bytes at the start of a payload row.
#[inline]
pub const fn validity_bytes(column_count: usize) -> usize {
    column_count.div_ceil(8)
}

#[inline]
fn bit_of(col_idx: usize) -> (usize, u8) {
    (col_idx / 8, 1u8 << (col_idx % 8))
}

fn overflow(row: usize, pos: usize, n: usize, len: usize) -> Error {
    Error::invariant(format!(
        "row {row}: writing {n} bytes at {pos} overruns a {len}-byte slot"
    ))
}

/// Mutable cursors over a batch of row slots.
pub struct RowCursors<'a> {
    rows: Vec<&'a mut [u8]>,
    pos: Vec<usize>,
    column_count: Option<usize>,
}

impl<'a> RowCursors<'a> {
    /// Cursors for sort keys: no validity bitmap, every cursor at 0.
    pub fn for_keys(rows: Vec<&'a mut [u8]>) -> Self {
        let pos = vec![0; rows.len()];
        Self {
            rows,
            pos,
            column_count: None,
        }
    }

    /// Cursors for payload rows of `column_count` columns. Writes an all-valid
    /// bitmap into each row and positions the cursors just past it.
    pub fn for_payload(mut rows: Vec<&'a mut [u8]>, column_count: usize) -> Result<Self> {
        let header = validity_bytes(column_count);
        for (i, row) in rows.iter_mut().enumerate() {
            let len = row.len();
            let bitmap = row
                .get_mut(..header)
                .ok_or_else(|| overflow(i, 0, header, len))?;
            bitmap.fill(0xFF);
        }
        let pos = vec![header; rows.len()];
        Ok(Self {
            rows,
            pos,
            column_count: Some(column_count),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Current write offset of row `i`.
    #[inline]
    pub fn position(&self, i: usize) -> usize {
        self.pos[i]
    }

    /// Claim the next `n` bytes of row `i` and advance its cursor.
    #[inline]
    pub fn next_bytes(&mut self, i: usize, n: usize) -> Result<&mut [u8]> {
        let start = self.pos[i];
        let row = &mut self.rows[i];
        let len = row.len();
        let out = start
            .checked_add(n)
            .and_then(|end| row.get_mut(start..end))
            .ok_or_else(|| overflow(i, start, n, len))?;
        self.pos[i] = start + n;
        Ok(out)
    }

    /// Mark column `col_idx` of row `i` as null in the payload bitmap.
    pub fn clear_valid(&mut self, i: usize, col_idx: usize) -> Result<()> {
        self.check_column(col_idx)?;
        let (byte, mask) = bit_of(col_idx);
        self.rows[i][byte] &= !mask;
        Ok(())
    }

    /// Fails unless these are payload cursors covering `col_idx`.
    pub(crate) fn check_column(&self, col_idx: usize) -> Result<()> {
        match self.column_count {
            Some(n) if col_idx < n => Ok(()),
            Some(n) => Err(Error::invariant(format!(
                "column {col_idx} outside a {n}-column payload layout"
            ))),
            None => Err(Error::invariant(
                "payload encoding requires cursors created with for_payload",
            )),
        }
    }
}

/// Read cursors over a batch of encoded rows.
pub struct RowReaders<'a> {
    rows: Vec<&'a [u8]>,
    pos: Vec<usize>,
    column_count: Option<usize>,
}

impl<'a> RowReaders<'a> {
    pub fn for_keys(rows: Vec<&'a [u8]>) -> Self {
        let pos = vec![0; rows.len()];
        Self {
            rows,
            pos,
            column_count: None,
        }
    }

    /// Readers for payload rows of `column_count` columns, positioned past the
    /// validity bitmap.
    pub fn for_payload(rows: Vec<&'a [u8]>, column_count: usize) -> Result<Self> {
        let header = validity_bytes(column_count);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() < header) {
            return Err(overflow(i, 0, header, row.len()));
        }
        let pos = vec![header; rows.len()];
        Ok(Self {
            rows,
            pos,
            column_count: Some(column_count),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn position(&self, i: usize) -> usize {
        self.pos[i]
    }

    /// Take the next `n` bytes of row `i` and advance its cursor.
    #[inline]
    pub fn next_bytes(&mut self, i: usize, n: usize) -> Result<&'a [u8]> {
        let start = self.pos[i];
        let row: &'a [u8] = self.rows[i];
        let out = start
            .checked_add(n)
            .and_then(|end| row.get(start..end))
            .ok_or_else(|| overflow(i, start, n, row.len()))?;
        self.pos[i] = start + n;
        Ok(out)
    }

    /// Whether column `col_idx` of row `i` is marked valid.
    pub fn is_valid(&self, i: usize, col_idx: usize) -> Result<bool> {
        self.check_column(col_idx)?;
        let (byte, mask) = bit_of(col_idx);
        Ok(self.rows[i][byte] & mask != 0)
    }

    pub(crate) fn check_column(&self, col_idx: usize) -> Result<()> {
        match self.column_count {
            Some(n) if col_idx < n => Ok(()),
            Some(n) => Err(Error::invariant(format!(
                "column {col_idx} outside a {n}-column payload layout"
            ))),
            None => Err(Error::invariant(
                "payload decoding requires readers created with for_payload",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_cursors_start_past_bitmap() {
        let mut a = [0u8; 12];
        let mut b = [0u8; 12];
        let cursors = RowCursors::for_payload(vec![&mut a[..], &mut b[..]], 9)
            .unwrap();
        assert_eq!(cursors.position(0), 2);
        assert_eq!(cursors.position(1), 2);
        drop(cursors);
        assert_eq!(&a[..2], &[0xFF, 0xFF]);
    }

    #[test]
    fn clearing_a_bit_touches_one_column() {
        let mut a = [0u8; 4];
        let mut cursors = RowCursors::for_payload(vec![&mut a[..]], 10).unwrap();
        cursors.clear_valid(0, 9).unwrap();
        drop(cursors);
        assert_eq!(&a[..2], &[0xFF, 0xFD]);

        let readers = RowReaders::for_payload(vec![&a[..]], 10).unwrap();
        assert!(readers.is_valid(0, 8).unwrap());
        assert!(!readers.is_valid(0, 9).unwrap());
    }

    #[test]
    fn overrun_is_reported() {
        let mut a = [0u8; 4];
        let mut cursors = RowCursors::for_keys(vec![&mut a[..]]);
        cursors.next_bytes(0, 3).unwrap();
        let err = cursors.next_bytes(0, 2).err().unwrap();
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert_eq!(cursors.position(0), 3);
    }

    #[test]
    fn key_cursors_reject_payload_operations() {
        let mut a = [0u8; 4];
        let mut cursors = RowCursors::for_keys(vec![&mut a[..]]);
        assert!(cursors.clear_valid(0, 0).is_err());
    }
}
