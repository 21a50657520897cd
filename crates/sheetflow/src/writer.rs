//! Spreadsheet writer
//!
//! Turns formatted records into remote calls and enforces the per-session
//! ordering:
//!
//! ```text
//! Idle -> [Cleared] -> [HeaderWritten] -> WritingBatches(0..N) -> Finished
//! ```
//!
//! No transition leads back to an earlier state.

use crate::config::WriteMode;
use crate::cursor::RangeCursor;
use crate::error::{SinkError, SinkResult};
use crate::record::{CellValue, Record};
use crate::sheets::{SheetsApi, ValueRange};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Idle,
    Cleared,
    HeaderWritten,
    /// Number of batches written so far
    WritingBatches(u64),
    Finished,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriterState::Idle => write!(f, "idle"),
            WriterState::Cleared => write!(f, "cleared"),
            WriterState::HeaderWritten => write!(f, "header-written"),
            WriterState::WritingBatches(n) => write!(f, "writing batches ({} written)", n),
            WriterState::Finished => write!(f, "finished"),
        }
    }
}

pub struct SheetWriter {
    api: Arc<dyn SheetsApi>,
    cursor: RangeCursor,
    columns: Vec<String>,
    state: WriterState,
    positioned: bool,
    span: Span,
}

impl SheetWriter {
    pub fn new(api: Arc<dyn SheetsApi>, cursor: RangeCursor, columns: Vec<String>, span: Span) -> Self {
        Self {
            api,
            cursor,
            columns,
            state: WriterState::Idle,
            positioned: false,
            span,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn cursor(&self) -> &RangeCursor {
        &self.cursor
    }

    fn column_count(&self) -> u32 {
        self.columns.len() as u32
    }

    fn invalid(&self, action: &'static str) -> SinkError {
        SinkError::InvalidState {
            from: self.state.to_string(),
            action,
        }
    }

    /// Clear the full region. Only legal before anything else happened.
    pub async fn clear(&mut self) -> SinkResult<()> {
        if self.state != WriterState::Idle {
            return Err(self.invalid("clear"));
        }

        let region = self.cursor.full_region(self.column_count());
        debug!(parent: &self.span, "clearing {}", region);
        self.api.clear_values(&region).await?;

        self.state = WriterState::Cleared;
        Ok(())
    }

    /// Write the column names as one row at the start row.
    pub async fn write_header(&mut self) -> SinkResult<()> {
        if !matches!(self.state, WriterState::Idle | WriterState::Cleared) {
            return Err(self.invalid("write header"));
        }

        let region = self.cursor.header_region(self.column_count());
        let header: Record = self
            .columns
            .iter()
            .map(|name| CellValue::Text(name.clone()))
            .collect();

        debug!(parent: &self.span, "writing header line at {}", region);
        self.api
            .update_values(&region, &ValueRange::from_record(&header))
            .await?;

        self.state = WriterState::HeaderWritten;
        Ok(())
    }

    /// Place the cursor before the first batch.
    ///
    /// Append mode counts the rows already in the full region, a header
    /// written by this session included. Replace mode starts from zero and
    /// skips the header row if one was written.
    pub async fn position(&mut self, mode: WriteMode) -> SinkResult<u32> {
        if self.positioned || !matches!(
            self.state,
            WriterState::Idle | WriterState::Cleared | WriterState::HeaderWritten
        ) {
            return Err(self.invalid("position cursor"));
        }

        let column_count = self.column_count();
        let offset = match mode {
            WriteMode::Append => {
                let existing = self
                    .cursor
                    .initialize(self.api.as_ref(), column_count, true)
                    .await?;
                info!(
                    parent: &self.span,
                    "found {} existing rows (header line included), next row is {}",
                    existing,
                    self.cursor.next_row()
                );
                existing
            }
            WriteMode::Replace => {
                self.cursor
                    .initialize(self.api.as_ref(), column_count, false)
                    .await?;
                if self.state == WriterState::HeaderWritten {
                    self.cursor.reserve(1);
                }
                self.cursor.offset()
            }
        };

        self.positioned = true;
        Ok(offset)
    }

    /// Write one buffered chunk at the cursor's next region.
    ///
    /// Call once per chunk in drain order. An empty chunk issues no call.
    pub async fn write_batch(&mut self, records: &[Record]) -> SinkResult<()> {
        let written = match self.state {
            WriterState::Finished => return Err(self.invalid("write batch")),
            _ if !self.positioned => return Err(self.invalid("write batch before positioning")),
            WriterState::WritingBatches(n) => n,
            _ => 0,
        };
        if records.is_empty() {
            return Ok(());
        }

        let region = self
            .cursor
            .next_region(records.len() as u32, self.column_count());
        debug!(parent: &self.span, "writing {} records to {}", records.len(), region);
        self.api
            .append_values(&region, &ValueRange::from_records(records))
            .await?;

        self.state = WriterState::WritingBatches(written + 1);
        Ok(())
    }

    /// Number of batches written so far
    pub fn batches(&self) -> u64 {
        match self.state {
            WriterState::WritingBatches(n) => n,
            _ => 0,
        }
    }

    /// Terminal transition; nothing may be written afterwards.
    pub fn finish(&mut self) -> SinkResult<u64> {
        if self.state == WriterState::Finished {
            return Err(self.invalid("finish"));
        }
        let batches = self.batches();
        self.state = WriterState::Finished;
        Ok(batches)
    }
}

impl fmt::Debug for SheetWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetWriter")
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("columns", &self.columns)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Region, SheetName};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Calls {
        log: Mutex<Vec<String>>,
        existing_rows: usize,
    }

    #[async_trait]
    impl SheetsApi for Calls {
        async fn get_values(&self, region: &Region) -> SinkResult<ValueRange> {
            self.log.lock().unwrap().push(format!("get {}", region));
            Ok(ValueRange::with_values(vec![vec![]; self.existing_rows]))
        }

        async fn clear_values(&self, region: &Region) -> SinkResult<()> {
            self.log.lock().unwrap().push(format!("clear {}", region));
            Ok(())
        }

        async fn update_values(&self, region: &Region, values: &ValueRange) -> SinkResult<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("update {} {}", region, serde_json::to_string(&values.values).unwrap()));
            Ok(())
        }

        async fn append_values(&self, region: &Region, values: &ValueRange) -> SinkResult<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("append {} x{}", region, values.row_count()));
            Ok(())
        }
    }

    fn writer(api: Arc<Calls>) -> SheetWriter {
        SheetWriter::new(
            api,
            RangeCursor::new(SheetName::new("S"), 1, 1),
            vec!["a".into(), "b".into(), "c".into()],
            Span::none(),
        )
    }

    fn rows(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::new(vec![CellValue::Integer(i as i64); 3]))
            .collect()
    }

    #[tokio::test]
    async fn test_replace_sequence() {
        let api = Arc::new(Calls::default());
        let mut writer = writer(api.clone());

        writer.clear().await.unwrap();
        writer.write_header().await.unwrap();
        assert_eq!(writer.position(WriteMode::Replace).await.unwrap(), 1);
        writer.write_batch(&rows(2)).await.unwrap();
        writer.write_batch(&rows(1)).await.unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        assert_eq!(
            api.log.lock().unwrap().as_slice(),
            [
                "clear 'S'!A1:C",
                r#"update 'S'!A1:C1 [["a","b","c"]]"#,
                "append 'S'!A2:C3 x2",
                "append 'S'!A4:C4 x1",
            ]
        );
    }

    #[tokio::test]
    async fn test_append_counts_existing_rows_including_header() {
        let api = Arc::new(Calls {
            existing_rows: 4,
            ..Default::default()
        });
        let mut writer = writer(api.clone());

        writer.write_header().await.unwrap();
        assert_eq!(writer.position(WriteMode::Append).await.unwrap(), 4);
        writer.write_batch(&rows(3)).await.unwrap();

        assert_eq!(
            api.log.lock().unwrap().last().unwrap(),
            "append 'S'!A5:C7 x3"
        );
    }

    #[tokio::test]
    async fn test_no_transition_backwards() {
        let api = Arc::new(Calls::default());
        let mut writer = writer(api);

        writer.write_header().await.unwrap();
        assert!(matches!(
            writer.clear().await,
            Err(SinkError::InvalidState { action: "clear", .. })
        ));

        writer.position(WriteMode::Replace).await.unwrap();
        writer.write_batch(&rows(1)).await.unwrap();
        assert!(writer.write_header().await.is_err());
        assert!(writer.position(WriteMode::Replace).await.is_err());

        writer.finish().unwrap();
        assert!(writer.write_batch(&rows(1)).await.is_err());
        assert!(writer.finish().is_err());
    }

    #[tokio::test]
    async fn test_batch_requires_positioned_cursor() {
        let api = Arc::new(Calls::default());
        let mut writer = writer(api.clone());

        let err = writer.write_batch(&rows(1)).await.unwrap_err();
        assert!(matches!(err, SinkError::InvalidState { .. }));
        assert!(api.log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_issues_no_call() {
        let api = Arc::new(Calls::default());
        let mut writer = writer(api.clone());
        writer.position(WriteMode::Replace).await.unwrap();

        writer.write_batch(&[]).await.unwrap();
        assert_eq!(writer.state(), WriterState::Idle);
        assert_eq!(writer.cursor().offset(), 0);
        assert!(api.log.lock().unwrap().is_empty());
    }
}
