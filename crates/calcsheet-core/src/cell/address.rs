//! A1 addresses and rectangular ranges

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell address (e.g. "A1", "$B$2")
///
/// Column letters are case-insensitive. The `$` absolute markers are accepted
/// when parsing but are not stored: `$A$1` and `a1` are the same address.
///
/// Addresses order row-major (by row, then by column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// 0-based row (row 1 in A1 notation is 0)
    pub row: u32,
    /// 0-based column (A = 0, XFD = 16383)
    pub col: u16,
}

impl CellAddress {
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Parse A1 notation, with optional `$` before the letters and the digits
    ///
    /// ```rust
    /// use calcsheet_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("A1").unwrap();
    /// assert_eq!(addr.row, 0);
    /// assert_eq!(addr.col, 0);
    ///
    /// let addr = CellAddress::parse("$ab$12").unwrap();
    /// assert_eq!(addr.row, 11);
    /// assert_eq!(addr.col, 27);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let text = s.trim();
        let invalid = |why: &str| Error::InvalidAddress(format!("{} in '{}'", why, text));

        let rest = text.strip_prefix('$').unwrap_or(text);
        let split = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let (letters, rest) = rest.split_at(split);
        let digits = rest.strip_prefix('$').unwrap_or(rest);

        if letters.is_empty() {
            return Err(invalid("no column letters"));
        }
        if digits.is_empty() {
            return Err(invalid("no row number"));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("invalid row number"));
        }

        let col = Self::column_index(letters)?;
        let row = match digits.parse::<u32>() {
            Ok(0) => return Err(invalid("row number must be >= 1")),
            Ok(n) if n > MAX_ROWS => return Err(Error::RowOutOfBounds(n - 1, MAX_ROWS - 1)),
            Ok(n) => n - 1,
            Err(_) => return Err(invalid("invalid row number")),
        };

        Ok(Self { row, col })
    }

    /// Column letters for a 0-based column (0 = A, 26 = AA)
    pub fn column_name(col: u16) -> String {
        let mut letters = Vec::new();
        let mut n = u32::from(col) + 1;
        while n > 0 {
            let digit = (n - 1) % 26;
            letters.push(b'A' + digit as u8);
            n = (n - 1) / 26;
        }
        letters.iter().rev().map(|&b| char::from(b)).collect()
    }

    /// 0-based column for a run of letters, any case (A = 0, AA = 26)
    pub fn column_index(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let value = letters.chars().try_fold(0u32, |acc, c| {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!("invalid column letter '{}'", c)));
            }
            let digit = u32::from(c.to_ascii_uppercase()) - u32::from('A') + 1;
            acc.checked_mul(26)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| Error::InvalidAddress(format!("column too large: '{}'", letters)))
        })?;

        let col = value - 1;
        u16::try_from(col)
            .ok()
            .filter(|&c| c < MAX_COLS)
            .ok_or(Error::ColumnOutOfBounds(col, MAX_COLS - 1))
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::column_name(self.col), self.row + 1)
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CellAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for CellAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        CellAddress::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// A rectangular block of cells (e.g. "A1:B10"), stored top-left to
/// bottom-right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    /// Range spanning two corners given in any order
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Parse `A1:B10`; a lone address is a one-cell range
    pub fn parse(s: &str) -> Result<Self> {
        let text = s.trim();
        let Some((a, b)) = text.split_once(':') else {
            let addr = CellAddress::parse(text)?;
            return Ok(Self::new(addr, addr));
        };
        let corner = |part: &str| {
            CellAddress::parse(part).map_err(|e| Error::InvalidRange(format!("{}: {}", text, e)))
        };
        Ok(Self::new(corner(a)?, corner(b)?))
    }

    pub fn contains(&self, addr: &CellAddress) -> bool {
        (self.start.row..=self.end.row).contains(&addr.row)
            && (self.start.col..=self.end.col).contains(&addr.col)
    }

    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Number of cells covered
    pub fn cell_count(&self) -> u64 {
        u64::from(self.row_count()) * u64::from(self.col_count())
    }

    /// Every address in the range, row by row
    pub fn cells(&self) -> Cells {
        Cells {
            range: *self,
            next: 0,
            total: self.cell_count(),
        }
    }

    /// The rows of the range, each an iterator over its addresses
    pub fn rows(&self) -> impl Iterator<Item = impl Iterator<Item = CellAddress>> {
        let (first_col, last_col) = (self.start.col, self.end.col);
        (self.start.row..=self.end.row)
            .map(move |row| (first_col..=last_col).map(move |col| CellAddress::new(row, col)))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Row-major iterator over the addresses of a [`CellRange`]
#[derive(Debug, Clone)]
pub struct Cells {
    range: CellRange,
    next: u64,
    total: u64,
}

impl Iterator for Cells {
    type Item = CellAddress;

    fn next(&mut self) -> Option<CellAddress> {
        if self.next >= self.total {
            return None;
        }
        let width = u64::from(self.range.col_count());
        let row = self.range.start.row + (self.next / width) as u32;
        let col = self.range.start.col + (self.next % width) as u16;
        self.next += 1;
        Some(CellAddress::new(row, col))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.total - self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Cells {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(cells: impl Iterator<Item = CellAddress>) -> Vec<String> {
        cells.map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_column_names() {
        for (col, name) in [(0, "A"), (25, "Z"), (26, "AA"), (701, "ZZ"), (702, "AAA"), (16383, "XFD")] {
            assert_eq!(CellAddress::column_name(col), name);
            assert_eq!(CellAddress::column_index(name).unwrap(), col);
        }
        assert_eq!(CellAddress::column_index("ab").unwrap(), 27);
        assert!(CellAddress::column_index("XFE").is_err());
        assert!(CellAddress::column_index("ZZZZZZZZZZZZ").is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!(CellAddress::parse("B2").unwrap(), CellAddress::new(1, 1));
        assert_eq!(CellAddress::parse(" b2 ").unwrap(), CellAddress::new(1, 1));

        // Absolute markers are syntax only
        for text in ["$A$1", "$A1", "a$1"] {
            assert_eq!(CellAddress::parse(text).unwrap(), CellAddress::new(0, 0));
        }

        let last: CellAddress = "XFD1048576".parse().unwrap();
        assert_eq!((last.row, last.col), (1_048_575, 16_383));
    }

    #[test]
    fn test_parse_errors() {
        for text in ["", "A", "1", "A0", "A1B", "A$$1", "$$A1", "A1048577", "XFE1", "A-1"] {
            assert!(CellAddress::parse(text).is_err(), "{:?} parsed", text);
        }
    }

    #[test]
    fn test_ordering_is_row_major() {
        let mut addrs: Vec<CellAddress> =
            ["B1", "A2", "A1"].iter().map(|s| s.parse().unwrap()).collect();
        addrs.sort();
        assert_eq!(names(addrs.into_iter()), vec!["A1", "B1", "A2"]);
    }

    #[test]
    fn test_range_parse_normalizes() {
        let range = CellRange::parse("B2:A1").unwrap();
        assert_eq!(range.start, CellAddress::new(0, 0));
        assert_eq!(range.end, CellAddress::new(1, 1));
        assert_eq!(range.to_string(), "A1:B2");

        let range = CellRange::parse("C3").unwrap();
        assert_eq!(range.start, range.end);
        assert_eq!(range.to_string(), "C3");
        assert!(CellRange::parse("A1:").is_err());
    }

    #[test]
    fn test_range_cells_cross_multi_letter_columns() {
        let range = CellRange::parse("Z1:AB2").unwrap();
        assert_eq!(
            names(range.cells()),
            vec!["Z1", "AA1", "AB1", "Z2", "AA2", "AB2"]
        );
        assert_eq!(range.cells().len(), 6);
        assert_eq!(CellRange::parse("A1:XFD1048576").unwrap().cell_count(), 17_179_869_184);
    }

    #[test]
    fn test_range_rows() {
        let range = CellRange::parse("A1:B2").unwrap();
        let rows: Vec<Vec<String>> = range.rows().map(names).collect();
        assert_eq!(rows, vec![vec!["A1", "B1"], vec!["A2", "B2"]]);
    }

    #[test]
    fn test_range_contains() {
        let range = CellRange::parse("B2:D4").unwrap();
        assert!(range.contains(&CellAddress::new(2, 2)));
        assert!(!range.contains(&CellAddress::new(0, 0)));
        assert!(!range.contains(&CellAddress::new(4, 1)));
    }
}
