//! A1-style addressing
//!
//! Column labels use bijective base-26: there is no zero digit, so
//! `1 -> A`, `26 -> Z`, `27 -> AA`. Every range string sent to the remote
//! resource is rendered by [`Region`]'s `Display` impl, which is the only
//! place the worksheet title gets quoted.

use std::fmt;

const RADIX: u32 = 26;

/// Convert a 1-based column index to its letter label.
///
/// # Panics
///
/// Panics if `column` is 0. Column indexes are validated when the
/// configuration is loaded, so a zero here is a caller bug.
pub fn column_to_label(column: u32) -> String {
    assert!(column >= 1, "column index is 1-based, got 0");

    let mut n = column;
    let mut letters = Vec::with_capacity(3);
    while n >= 1 {
        n -= 1;
        letters.push(b'A' + (n % RADIX) as u8);
        n /= RADIX;
    }
    letters.reverse();

    letters.into_iter().map(char::from).collect()
}

/// A worksheet title, rendered quoted and escaped for range strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetName(String);

impl SheetName {
    pub fn new(title: impl Into<String>) -> Self {
        Self(title.into())
    }

    /// The raw, unescaped title
    pub fn title(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SheetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.0.replace('\'', "''"))
    }
}

/// A rectangular cell area: worksheet, column span, first row and an
/// optional last row (open-ended when `None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub sheet: SheetName,
    pub start_column: u32,
    pub end_column: u32,
    pub start_row: u32,
    pub end_row: Option<u32>,
}

impl Region {
    /// Number of columns spanned
    pub fn column_count(&self) -> u32 {
        self.end_column - self.start_column + 1
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}!{}{}:{}",
            self.sheet,
            column_to_label(self.start_column),
            self.start_row,
            column_to_label(self.end_column)
        )?;
        if let Some(end_row) = self.end_row {
            write!(f, "{}", end_row)?;
        }
        Ok(())
    }
}
