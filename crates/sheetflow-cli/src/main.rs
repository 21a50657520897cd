//! sheetflow CLI
//!
//! Usage:
//!   sheetflow write --config task.yml --schema schema.yml [--input rows.jsonl]
//!   sheetflow write --config task.yml --schema schema.yml --input -    Read rows from stdin
//!   sheetflow check --config task.yml --schema schema.yml              Show target ranges, no network
//!
//! Input is JSON Lines: one row per line, either a positional array or an
//! object keyed by column name.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sheetflow::{
    OutputSession, RangeCursor, Schema, SheetsClient, SinkConfig, SinkTask,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Rows handed to the session per `add` call
const PAGE_SIZE: usize = 500;

#[derive(Parser)]
#[command(name = "sheetflow")]
#[command(about = "Stream records into a Google Sheets worksheet", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Buffer rows from a JSON Lines input and write them to the worksheet
    Write {
        /// Task configuration (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Column list (YAML): [{name, type}, ...]
        #[arg(short, long)]
        schema: PathBuf,

        /// JSON Lines input, `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Log level (trace, debug, info, warn, error)
        #[arg(long, default_value = "info")]
        log_level: String,
    },
    /// Validate configuration and print the ranges a session would target
    Check {
        /// Task configuration (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Column list (YAML): [{name, type}, ...]
        #[arg(short, long)]
        schema: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Write {
            config,
            schema,
            input,
            log_level,
        } => {
            init_logging(&log_level)?;
            run_write(&config, &schema, &input)?;
        }
        Commands::Check { config, schema } => {
            run_check(&config, &schema)?;
        }
    }

    Ok(())
}

fn load_task(path: &Path) -> Result<SinkTask> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: SinkConfig = serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    Ok(config.into_task()?)
}

fn load_schema(path: &Path) -> Result<Schema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema {}", path.display()))?;
    let schema: Schema = serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse schema {}", path.display()))?;
    if schema.is_empty() {
        bail!("Schema {} has no columns", path.display());
    }
    Ok(schema)
}

fn open_input(input: &str) -> Result<Box<dyn BufRead>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(input).with_context(|| format!("Failed to open input {}", input))?;
    Ok(Box::new(BufReader::new(file)))
}

fn run_write(config: &Path, schema: &Path, input: &str) -> Result<()> {
    let task = load_task(config)?;
    let schema = load_schema(schema)?;
    let reader = open_input(input)?;

    let rt = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    let api = Arc::new(SheetsClient::from_task(&task)?);
    let mut session = OutputSession::open(task, schema, api)?;
    rt.block_on(session.prepare())?;

    // Blocking reads stay on this thread; the runtime only drives the
    // remote calls in prepare and finish.
    let total = buffer_rows(&mut session, reader)?;
    debug!("read {} rows from {}", total, input);

    let report = rt.block_on(session.finish())?;

    println!(
        "Wrote {} records in {} batches starting at row {}, next row is {}",
        report.records, report.batches, report.first_row, report.next_row
    );
    Ok(())
}

/// Feed JSON Lines into the session a page at a time. Blank lines are
/// skipped. Returns the number of rows buffered.
fn buffer_rows(session: &mut OutputSession, reader: impl BufRead) -> Result<usize> {
    let mut page = Vec::with_capacity(PAGE_SIZE);
    let mut total = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        let row: serde_json::Value = serde_json::from_str(&line)
            .with_context(|| format!("Invalid JSON on input line {}", index + 1))?;
        page.push(row);
        total += 1;

        if page.len() == PAGE_SIZE {
            session
                .add_json(&page)
                .with_context(|| format!("Rejected row near input line {}", index + 1))?;
            page.clear();
        }
    }
    session.add_json(&page).context("Rejected row at end of input")?;
    Ok(total)
}

fn run_check(config: &Path, schema: &Path) -> Result<()> {
    let task = load_task(config)?;
    let schema = load_schema(schema)?;
    for line in check_lines(&task, &schema)? {
        println!("{}", line);
    }
    Ok(())
}

/// What `check` prints: the task summary and the ranges a session on an
/// empty worksheet would touch.
fn check_lines(task: &SinkTask, schema: &Schema) -> Result<Vec<String>> {
    let columns = u32::try_from(schema.len()).context("Schema has too many columns")?;
    let batch_rows = u32::try_from(task.chunk_size)
        .with_context(|| format!("chunk_size {} does not fit in a row count", task.chunk_size))?;

    let mut cursor = RangeCursor::new(task.worksheet.clone(), task.start_column, task.start_row);
    let mut lines = vec![
        task.summary(),
        format!("  columns:     {}", schema.names().join(", ")),
        format!("  full range:  {}", cursor.full_region(columns)),
    ];
    if task.header_line {
        lines.push(format!("  header:      {}", cursor.header_region(columns)));
        cursor.reserve(1);
    }
    lines.push(format!(
        "  first batch: {} (on an empty worksheet)",
        cursor.next_region(batch_rows, columns)
    ));
    Ok(lines)
}

fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init()
        .ok(); // Ignore error if already initialized

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetflow::{Column, ColumnType};

    fn task(header_line: bool) -> SinkTask {
        serde_yaml::from_str::<SinkConfig>(&format!(
            r#"
spreadsheets_url: https://docs.google.com/spreadsheets/d/sheet-id/edit
worksheet_title: Data
access_token: ya29.cli
header_line: {}
chunk_size: 2
"#,
            header_line
        ))
        .unwrap()
        .into_task()
        .unwrap()
    }

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("id", ColumnType::Long),
            Column::new("name", ColumnType::String),
        ])
    }

    #[test]
    fn test_check_lines_show_header_and_first_batch() {
        let lines = check_lines(&task(true), &schema()).unwrap();
        assert!(lines.contains(&"  header:      'Data'!A1:B1".to_string()));
        assert!(lines.contains(&"  first batch: 'Data'!A2:B3 (on an empty worksheet)".to_string()));
    }

    #[test]
    fn test_check_rejects_chunk_size_beyond_row_range() {
        let Some(too_many_rows) = (u32::MAX as usize).checked_add(1) else {
            return;
        };
        let mut task = task(false);
        task.chunk_size = too_many_rows;
        let err = check_lines(&task, &schema()).unwrap_err();
        assert!(err.to_string().contains("does not fit in a row count"));
    }

    #[test]
    fn test_rows_are_buffered_without_a_runtime() {
        let task = task(false);
        let api = Arc::new(SheetsClient::from_task(&task).unwrap());
        let mut session = OutputSession::open(task, schema(), api).unwrap();

        let input = "[1, \"a\"]\n\n{\"id\": 2, \"name\": \"b\"}\n[3, null]\n";
        let total = buffer_rows(&mut session, input.as_bytes()).unwrap();

        assert_eq!(total, 3);
        assert_eq!(session.buffered(), 3);
        session.abort();
    }

    #[test]
    fn test_invalid_json_names_the_line() {
        let task = task(false);
        let api = Arc::new(SheetsClient::from_task(&task).unwrap());
        let mut session = OutputSession::open(task, schema(), api).unwrap();

        let err = buffer_rows(&mut session, "[1, \"a\"]\n{oops\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("input line 2"));
        session.abort();
    }
}
