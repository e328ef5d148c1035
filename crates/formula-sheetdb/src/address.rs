use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Row number of the header in every grid.
pub const HEADER_ROW: u32 = 1;

/// Offset from a zero-based data index to its physical row number.
///
/// Row 1 is the header, so data index `0` lives on physical row `2`.
pub const DATA_ROW_OFFSET: u32 = 2;

/// Largest addressable row number (1,048,576).
pub const MAX_ROWS: u32 = 1_048_576;

/// Largest addressable column number (16,384, column `XFD`).
pub const MAX_COLS: u32 = 16_384;

/// Physical row number of the zero-based data index `idx`.
#[inline]
pub fn data_row_number(idx: usize) -> u32 {
    idx as u32 + DATA_ROW_OFFSET
}

/// Address of a single physical cell.
///
/// Unlike in-memory coordinates, rows and columns are **1-based**, matching what
/// a user sees in the grid:
/// - `row = 1` is the header row
/// - `col = 1` is column `A`
///
/// Addresses order row-major, so a `BTreeMap<CellAddress, _>` iterates top to bottom.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    #[inline]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Convert to A1 notation (e.g. `A1`, `BC32`).
    pub fn to_a1(self) -> String {
        format!("{}{}", col_to_name(self.col), self.row)
    }

    /// Parse an A1-style reference (e.g. `C7`, `$B$2`, `bc32`).
    pub fn from_a1(a1: &str) -> Result<Self, A1ParseError> {
        let s = a1.trim();
        if s.is_empty() {
            return Err(A1ParseError::Empty);
        }

        let bytes = s.as_bytes();
        let mut idx = 0usize;
        if bytes.get(idx) == Some(&b'$') {
            idx += 1;
        }

        let col_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_alphabetic() {
            idx += 1;
        }
        if idx == col_start {
            return Err(A1ParseError::MissingColumn);
        }
        let col = name_to_col(&s[col_start..idx])?;
        if col > MAX_COLS {
            return Err(A1ParseError::InvalidColumn);
        }

        if bytes.get(idx) == Some(&b'$') {
            idx += 1;
        }
        let row_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_digit() {
            idx += 1;
        }
        if idx == row_start {
            return Err(A1ParseError::MissingRow);
        }
        if idx != bytes.len() {
            return Err(A1ParseError::TrailingCharacters);
        }

        let row: u32 = s[row_start..idx]
            .parse()
            .map_err(|_| A1ParseError::InvalidRow)?;
        if row == 0 || row > MAX_ROWS {
            return Err(A1ParseError::InvalidRow);
        }

        Ok(Self { row, col })
    }
}

impl FromStr for CellAddress {
    type Err = A1ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_a1(s)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// Errors that can occur when parsing an A1 cell address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum A1ParseError {
    #[error("empty A1 reference")]
    Empty,
    #[error("missing column in A1 reference")]
    MissingColumn,
    #[error("missing row in A1 reference")]
    MissingRow,
    #[error("invalid column in A1 reference")]
    InvalidColumn,
    #[error("invalid row in A1 reference")]
    InvalidRow,
    #[error("trailing characters in A1 reference")]
    TrailingCharacters,
}

fn col_to_name(col: u32) -> String {
    let mut n = col;
    let mut out = Vec::<char>::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    out.iter().rev().collect()
}

fn name_to_col(s: &str) -> Result<u32, A1ParseError> {
    let mut col: u32 = 0;
    for b in s.bytes() {
        let v = (b.to_ascii_uppercase() - b'A') as u32 + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(v))
            .ok_or(A1ParseError::InvalidColumn)?;
    }
    Ok(col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a1_roundtrip_is_one_based() {
        let a1 = CellAddress::new(1, 1);
        assert_eq!(a1.to_a1(), "A1");
        assert_eq!(CellAddress::from_a1("A1").unwrap(), a1);
        assert_eq!(CellAddress::from_a1("$A$1").unwrap(), a1);

        let bc32 = CellAddress::new(32, 55);
        assert_eq!(bc32.to_a1(), "BC32");
        assert_eq!("bc32".parse::<CellAddress>().unwrap(), bc32);
        assert_eq!(CellAddress::new(3, 26).to_a1(), "Z3");
        assert_eq!(CellAddress::new(3, 27).to_a1(), "AA3");
    }

    #[test]
    fn a1_rejects_malformed_input() {
        assert_eq!(CellAddress::from_a1(""), Err(A1ParseError::Empty));
        assert_eq!(CellAddress::from_a1("12"), Err(A1ParseError::MissingColumn));
        assert_eq!(CellAddress::from_a1("B"), Err(A1ParseError::MissingRow));
        assert_eq!(CellAddress::from_a1("B0"), Err(A1ParseError::InvalidRow));
        assert_eq!(CellAddress::from_a1("B2:C3"), Err(A1ParseError::TrailingCharacters));
    }

    #[test]
    fn a1_rejects_out_of_range_addresses() {
        assert_eq!(
            CellAddress::from_a1("XFD1048576").unwrap(),
            CellAddress::new(MAX_ROWS, MAX_COLS)
        );
        assert_eq!(CellAddress::from_a1("A1048577"), Err(A1ParseError::InvalidRow));
        assert_eq!(CellAddress::from_a1("A4000000000"), Err(A1ParseError::InvalidRow));
        assert_eq!(CellAddress::from_a1("A4294967295"), Err(A1ParseError::InvalidRow));
        assert_eq!(CellAddress::from_a1("XFE1"), Err(A1ParseError::InvalidColumn));
        assert_eq!(CellAddress::from_a1("ZZZZZZZ1"), Err(A1ParseError::InvalidColumn));
    }

    #[test]
    fn data_index_maps_past_header() {
        assert_eq!(data_row_number(0), 2);
        assert_eq!(data_row_number(9), 11);
    }

    #[test]
    fn addresses_order_row_major() {
        let mut addrs = vec![
            CellAddress::new(3, 1),
            CellAddress::new(2, 5),
            CellAddress::new(2, 1),
        ];
        addrs.sort();
        assert_eq!(
            addrs,
            vec![
                CellAddress::new(2, 1),
                CellAddress::new(2, 5),
                CellAddress::new(3, 1),
            ]
        );
    }
}
