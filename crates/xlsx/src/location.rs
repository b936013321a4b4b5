//! Cell references and cell locations.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// `A1`-style reference, optionally with `$` anchors.
static CELL_REF_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]{1,7})$").unwrap());

/// A cell coordinate. Row and column are 1-based, as in `A1` notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse an `A1`-style reference.
    pub fn parse(reference: &str) -> Option<Self> {
        let caps = CELL_REF_REGEX.captures(reference)?;
        let col = caps[1]
            .bytes()
            .map(|b| u32::from(b.to_ascii_uppercase() - b'A') + 1)
            .fold(0, |acc, digit| acc * 26 + digit);
        let row: u32 = caps[2].parse().ok()?;
        (row > 0).then_some(Self { row, col })
    }

    /// Column letters (`1` → `A`, `28` → `AB`).
    pub fn column_name(&self) -> String {
        let mut letters = Vec::new();
        let mut n = self.col;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push(char::from(b'A' + rem as u8));
            n = (n - 1) / 26;
        }
        letters.iter().rev().collect()
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_name(), self.row)
    }
}

/// A string cell in a named worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellLocation {
    pub sheet: String,
    pub cell: CellRef,
}

impl CellLocation {
    pub fn new(sheet: impl Into<String>, cell: CellRef) -> Self {
        Self {
            sheet: sheet.into(),
            cell,
        }
    }
}

impl fmt::Display for CellLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sheet.chars().all(|c| c.is_alphanumeric() || c == '_') {
            write!(f, "{}!{}", self.sheet, self.cell)
        } else {
            write!(f, "'{}'!{}", self.sheet.replace('\'', "''"), self.cell)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(CellRef::parse("A1"), Some(CellRef::new(1, 1)));
        assert_eq!(CellRef::parse("B12"), Some(CellRef::new(12, 2)));
        assert_eq!(CellRef::parse("$AB$3"), Some(CellRef::new(3, 28)));
        assert_eq!(CellRef::parse("xfd1048576"), Some(CellRef::new(1048576, 16384)));
        assert_eq!(CellRef::parse("A0"), None);
        assert_eq!(CellRef::parse("1A"), None);
        assert_eq!(CellRef::parse(""), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(CellRef::new(1, 1).to_string(), "A1");
        assert_eq!(CellRef::new(7, 26).to_string(), "Z7");
        assert_eq!(CellRef::new(3, 28).to_string(), "AB3");
        assert_eq!(CellRef::new(1, 16384).to_string(), "XFD1");
        assert_eq!(CellLocation::new("Sheet1", CellRef::new(1, 2)).to_string(), "Sheet1!B1");
        assert_eq!(
            CellLocation::new("税金 2024", CellRef::new(1, 1)).to_string(),
            "'税金 2024'!A1"
        );
    }
}
