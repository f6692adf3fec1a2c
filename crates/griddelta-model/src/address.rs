use core::fmt;

use serde::{Deserialize, Serialize};

/// A reference to a single cell within a sheet.
///
/// Rows and columns are **0-indexed**:
/// - `row = 0` is A1-notation row `1`
/// - `col = 0` is A1-notation column `A`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    /// 0-indexed row.
    pub row: u32,
    /// 0-indexed column.
    pub col: u32,
}

impl CellRef {
    /// Construct a new [`CellRef`].
    #[inline]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Convert to A1 notation (e.g. `A1`, `BC32`).
    pub fn to_a1(self) -> String {
        format!("{}{}", col_to_name(self.col), self.row + 1)
    }

    /// Parse an A1-style reference (e.g. `A1`, `bc32`).
    pub fn from_a1(a1: &str) -> Result<Self, A1ParseError> {
        let s = a1.trim();
        if s.is_empty() {
            return Err(A1ParseError::Empty);
        }

        let bytes = s.as_bytes();
        let mut idx = 0usize;
        while idx < bytes.len() && bytes[idx].is_ascii_alphabetic() {
            idx += 1;
        }
        if idx == 0 {
            return Err(A1ParseError::MissingColumn);
        }

        let col = name_to_col(&s[..idx])?;

        let row_str = &s[idx..];
        if row_str.is_empty() {
            return Err(A1ParseError::MissingRow);
        }
        if !row_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(A1ParseError::TrailingCharacters);
        }

        let row_1_based: u32 = row_str.parse().map_err(|_| A1ParseError::InvalidRow)?;
        if row_1_based == 0 {
            return Err(A1ParseError::InvalidRow);
        }

        Ok(Self {
            row: row_1_based - 1,
            col,
        })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// Render a sheet-qualified cell reference (e.g. `Sheet1!B2`).
///
/// Titles that are not plain identifiers are single-quoted, with embedded
/// quotes doubled (`'Bob''s sheet'!A1`) — the quoting grammar grid APIs use
/// for range strings.
pub fn qualify_cell(sheet_title: &str, cell: CellRef) -> String {
    if needs_quoting(sheet_title) {
        format!("'{}'!{}", sheet_title.replace('\'', "''"), cell.to_a1())
    } else {
        format!("{}!{}", sheet_title, cell.to_a1())
    }
}

fn needs_quoting(title: &str) -> bool {
    title.is_empty()
        || !title
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        || title.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Errors that can occur when parsing an A1 cell reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum A1ParseError {
    Empty,
    MissingColumn,
    MissingRow,
    InvalidColumn,
    InvalidRow,
    TrailingCharacters,
}

impl fmt::Display for A1ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            A1ParseError::Empty => "empty A1 reference",
            A1ParseError::MissingColumn => "missing column in A1 reference",
            A1ParseError::MissingRow => "missing row in A1 reference",
            A1ParseError::InvalidColumn => "invalid column in A1 reference",
            A1ParseError::InvalidRow => "invalid row in A1 reference",
            A1ParseError::TrailingCharacters => "trailing characters in A1 reference",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for A1ParseError {}

fn col_to_name(col: u32) -> String {
    // Columns are 1-based in A1 notation. We store 0-based internally.
    let mut n = col + 1;
    let mut out = Vec::<u8>::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).expect("column letters are always valid UTF-8")
}

fn name_to_col(s: &str) -> Result<u32, A1ParseError> {
    let mut col: u32 = 0;
    for b in s.bytes() {
        if !b.is_ascii_alphabetic() {
            return Err(A1ParseError::InvalidColumn);
        }
        let v = (b.to_ascii_uppercase() - b'A') as u32 + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(v))
            .ok_or(A1ParseError::InvalidColumn)?;
    }
    if col == 0 {
        return Err(A1ParseError::InvalidColumn);
    }
    Ok(col - 1)
}
