//! Range cursor: where the next batch lands
//!
//! The cursor is an offset, in rows, from the configured start row. It only
//! moves forward, so consecutive batches tile the worksheet without gaps
//! or overlaps.

use crate::address::{Region, SheetName};
use crate::error::SinkResult;
use crate::sheets::SheetsApi;

#[derive(Debug, Clone)]
pub struct RangeCursor {
    sheet: SheetName,
    start_column: u32,
    start_row: u32,
    offset: u32,
}

impl RangeCursor {
    /// A fresh cursor at offset 0. `start_column` and `start_row` are 1-based.
    pub fn new(sheet: SheetName, start_column: u32, start_row: u32) -> Self {
        Self {
            sheet,
            start_column,
            start_row,
            offset: 0,
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn start_row(&self) -> u32 {
        self.start_row
    }

    /// Row the next batch will be written at
    pub fn next_row(&self) -> u32 {
        self.start_row + self.offset
    }

    /// Set the starting offset: the number of populated rows the remote
    /// reports for the full region when `discover_existing`, otherwise 0.
    ///
    /// Returns the resulting offset.
    pub async fn initialize<A>(
        &mut self,
        api: &A,
        column_count: u32,
        discover_existing: bool,
    ) -> SinkResult<u32>
    where
        A: SheetsApi + ?Sized,
    {
        self.offset = if discover_existing {
            let existing = api.get_values(&self.full_region(column_count)).await?;
            existing.row_count()
        } else {
            0
        };
        Ok(self.offset)
    }

    /// Claim `rows` rows without producing a region (used for a header
    /// line written at the start row of a fresh region).
    pub fn reserve(&mut self, rows: u32) {
        self.offset += rows;
    }

    /// Region for a batch of `record_count` rows, then advance past it.
    ///
    /// Call exactly once per flushed batch, in flush order: the advance
    /// cannot be undone.
    pub fn next_region(&mut self, record_count: u32, column_count: u32) -> Region {
        let row = self.next_row();
        self.offset += record_count;

        Region {
            sheet: self.sheet.clone(),
            start_column: self.start_column,
            end_column: self.end_column(column_count),
            start_row: row,
            end_row: Some(row + record_count.saturating_sub(1)),
        }
    }

    /// Single-row region at the start row for the header line; never advances.
    pub fn header_region(&self, column_count: u32) -> Region {
        Region {
            sheet: self.sheet.clone(),
            start_column: self.start_column,
            end_column: self.end_column(column_count),
            start_row: self.start_row,
            end_row: Some(self.start_row),
        }
    }

    /// Every row from the start row down, across the schema's columns.
    pub fn full_region(&self, column_count: u32) -> Region {
        Region {
            sheet: self.sheet.clone(),
            start_column: self.start_column,
            end_column: self.end_column(column_count),
            start_row: self.start_row,
            end_row: None,
        }
    }

    fn end_column(&self, column_count: u32) -> u32 {
        self.start_column + column_count.max(1) - 1
    }
}
