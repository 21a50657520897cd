//! Output session: one worksheet, buffered then flushed
//!
//! ```ignore
//! let mut session = OutputSession::open(task, schema, api)?;
//! session.prepare().await?;
//! session.add(&rows)?;
//! let report = session.finish().await?;
//! ```
//!
//! Each session owns its write buffer exclusively. The buffer is released
//! on every exit path: `finish`, `abort`, or dropping the session after an
//! error.

use crate::buffer::WriteBuffer;
use crate::config::{SinkTask, WriteMode};
use crate::cursor::RangeCursor;
use crate::error::{SinkError, SinkResult};
use crate::schema::{Schema, Value};
use crate::sheets::SheetsApi;
use crate::writer::SheetWriter;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Span};

/// Outcome of a finished session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    /// Records flushed to the worksheet
    pub records: u64,
    /// Remote write calls issued for those records
    pub batches: u64,
    /// Row the first batch was written at
    pub first_row: u32,
    /// Row the next record would have been written at
    pub next_row: u32,
}

pub struct OutputSession {
    task: SinkTask,
    schema: Schema,
    buffer: WriteBuffer,
    writer: SheetWriter,
    prepared: bool,
    span: Span,
}

impl OutputSession {
    /// Allocate the session's buffer and writer. No remote call is made.
    pub fn open(task: SinkTask, schema: Schema, api: Arc<dyn SheetsApi>) -> SinkResult<Self> {
        if schema.is_empty() {
            return Err(SinkError::config("schema must have at least one column"));
        }

        let span = info_span!(
            "sheetflow_session",
            spreadsheet = %task.spreadsheet_id,
            worksheet = %task.worksheet,
            mode = %task.mode,
        );

        let buffer = match &task.spool_dir {
            Some(dir) => WriteBuffer::open_in(dir, span.clone())?,
            None => WriteBuffer::open(span.clone())?,
        };

        let cursor = RangeCursor::new(
            task.worksheet.clone(),
            task.start_column,
            task.start_row,
        );
        let writer = SheetWriter::new(api, cursor, schema.names(), span.clone());

        info!(parent: &span, "opened session: {}", task.summary());

        Ok(Self {
            task,
            schema,
            buffer,
            writer,
            prepared: false,
            span,
        })
    }

    pub fn task(&self) -> &SinkTask {
        &self.task
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Records buffered and not yet flushed
    pub fn buffered(&self) -> u64 {
        self.buffer.len()
    }

    /// Clear (replace mode), write the header line (if enabled) and
    /// position the cursor. Runs once; `finish` calls it if needed.
    pub async fn prepare(&mut self) -> SinkResult<()> {
        if self.prepared {
            return Ok(());
        }

        if self.task.mode == WriteMode::Replace {
            self.writer.clear().await?;
        }
        if self.task.header_line {
            self.writer.write_header().await?;
        }
        self.writer.position(self.task.mode).await?;

        self.prepared = true;
        Ok(())
    }

    /// Format and buffer a batch of typed rows.
    pub fn add(&mut self, rows: &[Vec<Value>]) -> SinkResult<()> {
        debug!(parent: &self.span, "buffering {} records", rows.len());

        for row in rows {
            if row.len() != self.schema.len() {
                return Err(SinkError::InvalidRecord(format!(
                    "expected {} values, got {}",
                    self.schema.len(),
                    row.len()
                )));
            }
            let record = self.task.formatter.format_record(&self.schema, row);
            self.buffer.append(&record)?;
        }
        Ok(())
    }

    /// Decode JSON rows against the schema, then buffer them
    pub fn add_json(&mut self, rows: &[serde_json::Value]) -> SinkResult<()> {
        let decoded = rows
            .iter()
            .map(|row| self.schema.decode_row(row))
            .collect::<SinkResult<Vec<_>>>()?;
        self.add(&decoded)
    }

    /// Flush every buffered record, one remote call per chunk, then
    /// release the buffer.
    pub async fn finish(mut self) -> SinkResult<SessionReport> {
        let result = self.flush().await;
        self.buffer.close();

        match &result {
            Ok(report) => info!(
                parent: &self.span,
                "flushed {} records in {} batches, rows {}..{}",
                report.records,
                report.batches,
                report.first_row,
                report.next_row
            ),
            Err(e) => error!(parent: &self.span, "session failed: {}", e.redacted()),
        }
        result
    }

    async fn flush(&mut self) -> SinkResult<SessionReport> {
        self.prepare().await?;

        let first_row = self.writer.cursor().next_row();
        let records = self.buffer.len();
        let chunk_size = self.task.chunk_size;
        let span = self.span.clone();

        for chunk in self.buffer.drain(chunk_size)? {
            let chunk = chunk?;
            self.writer.write_batch(&chunk).await?;
            let batches = self.writer.batches();
            debug!(parent: &span, "flushed batch {} ({} records)", batches, chunk.len());
        }

        let batches = self.writer.finish()?;
        Ok(SessionReport {
            records,
            batches,
            first_row,
            next_row: self.writer.cursor().next_row(),
        })
    }

    /// Discard buffered records and release the buffer.
    pub fn abort(mut self) {
        warn!(
            parent: &self.span,
            "aborting session, discarding {} buffered records",
            self.buffer.len()
        );
        self.buffer.close();
    }
}

impl std::fmt::Debug for OutputSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSession")
            .field("task", &self.task)
            .field("buffer", &self.buffer)
            .field("writer", &self.writer)
            .finish()
    }
}
