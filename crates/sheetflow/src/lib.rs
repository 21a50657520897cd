//! Stream pipeline records into a Google Sheets worksheet
//!
//! # Features
//! - Disk-spooled write buffer, drained in fixed-size chunks
//! - Range cursor producing gap-free, non-overlapping batch regions
//! - A1 addressing with quoted worksheet names
//! - Append (after existing rows) and replace (clear first) modes
//! - Typed value formatting with configurable null sentinel and time zone

pub mod address;
pub mod auth;
pub mod buffer;
pub mod config;
pub mod cursor;
pub mod error;
pub mod formatter;
pub mod record;
pub mod schema;
pub mod session;
pub mod sheets;
pub mod writer;

pub use address::{column_to_label, Region, SheetName};
pub use buffer::WriteBuffer;
pub use config::{SinkConfig, SinkTask, ValueInputOption, WriteMode};
pub use cursor::RangeCursor;
pub use error::{SinkError, SinkResult};
pub use formatter::RecordFormatter;
pub use record::{CellValue, Record};
pub use schema::{Column, ColumnType, Schema, Value};
pub use session::{OutputSession, SessionReport};
pub use sheets::{SheetsApi, SheetsClient, ValueRange};
pub use writer::{SheetWriter, WriterState};
