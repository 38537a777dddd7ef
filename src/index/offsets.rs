//! Compact text encoding of record byte ranges.
//!
//! # Format
//!
//! ```text
//! +---------+-------+---------+-------+----
//! | start#0 | len#0 | start#1 | len#1 | ...
//! | 6 chars |4 chars| 6 chars |4 chars|
//! +---------+-------+---------+-------+----
//! ```
//!
//! Each number is lower-case base 36, zero padded. Ordinal `n` lives at
//! `[10n, 10n + 10)`.

use std::ops::Range;

const START_DIGITS: usize = 6;
const LEN_DIGITS: usize = 4;
const CELL: usize = START_DIGITS + LEN_DIGITS;

/// Largest encodable start offset.
pub const MAX_START: usize = 36usize.pow(START_DIGITS as u32) - 1;
/// Largest encodable record length.
pub const MAX_LEN: usize = 36usize.pow(LEN_DIGITS as u32) - 1;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Ordinal → byte range table stored as one opaque string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetTable {
    encoded: String,
}

impl OffsetTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a range, returning its ordinal.
    ///
    /// Returns `None` if the range does not fit the cell width.
    pub fn push(&mut self, range: Range<usize>) -> Option<u32> {
        let len = range.end.checked_sub(range.start)?;
        if range.start > MAX_START || len > MAX_LEN {
            return None;
        }
        let ordinal = self.len() as u32;
        encode_into(&mut self.encoded, range.start, START_DIGITS);
        encode_into(&mut self.encoded, len, LEN_DIGITS);
        Some(ordinal)
    }

    /// Decode the range of an ordinal.
    pub fn get(&self, ordinal: u32) -> Option<Range<usize>> {
        let at = (ordinal as usize).checked_mul(CELL)?;
        let cell = self.encoded.get(at..at + CELL)?;
        let start = decode(&cell[..START_DIGITS])?;
        let len = decode(&cell[START_DIGITS..])?;
        Some(start..start + len)
    }

    /// Number of records in the table.
    pub fn len(&self) -> usize {
        self.encoded.len() / CELL
    }

    /// Check if the table has no records.
    pub fn is_empty(&self) -> bool {
        self.encoded.is_empty()
    }

    /// The encoded form.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

fn encode_into(out: &mut String, mut value: usize, width: usize) {
    let mut buf = [b'0'; START_DIGITS];
    for slot in buf[..width].iter_mut().rev() {
        *slot = DIGITS[value % 36];
        value /= 36;
    }
    for &b in &buf[..width] {
        out.push(b as char);
    }
}

fn decode(digits: &str) -> Option<usize> {
    usize::from_str_radix(digits, 36).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_get() {
        let mut table = OffsetTable::new();
        assert_eq!(table.push(0..15), Some(0));
        assert_eq!(table.push(20..1300), Some(1));
        assert_eq!(table.push(70_000..70_001), Some(2));

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0), Some(0..15));
        assert_eq!(table.get(1), Some(20..1300));
        assert_eq!(table.get(2), Some(70_000..70_001));
        assert_eq!(table.get(3), None);
    }

    #[test]
    fn test_encoding_is_fixed_width_text() {
        let mut table = OffsetTable::new();
        table.push(35..45);
        table.push(36..36);
        assert_eq!(table.as_str(), "00000z000a0000100000");
    }

    #[test]
    fn test_limits() {
        let mut table = OffsetTable::new();
        assert!(table.push(MAX_START..MAX_START + MAX_LEN).is_some());
        assert!(table.push(MAX_START + 1..MAX_START + 2).is_none());
        assert!(table.push(0..MAX_LEN + 1).is_none());
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0), Some(MAX_START..MAX_START + MAX_LEN));
    }

    #[test]
    fn test_empty() {
        let table = OffsetTable::new();
        assert!(table.is_empty());
        assert_eq!(table.get(0), None);
    }
}
