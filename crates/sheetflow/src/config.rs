//! Task configuration
//!
//! [`SinkConfig`] is the raw, deserializable surface. [`SinkConfig::into_task`]
//! validates it in one place and yields a [`SinkTask`]; every configuration
//! error surfaces there, before any network call.

use crate::address::SheetName;
use crate::auth::{AuthMethod, KeyfileSource};
use crate::error::{SinkError, SinkResult};
use crate::formatter::{
    parse_utc_offset, RecordFormatter, DEFAULT_NULL_STRING, DEFAULT_TIMESTAMP_FORMAT,
    DEFAULT_TIMEZONE,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com";

const SPREADSHEETS_URL_PATTERN: &str = r"https://docs\.google\.com/spreadsheets/d/([^/]+)";

/// How existing worksheet content is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Discover existing rows and write after them
    Append,
    /// Clear the full region, then write from the start row
    Replace,
}

impl FromStr for WriteMode {
    type Err = SinkError;

    fn from_str(s: &str) -> SinkResult<Self> {
        match s {
            "append" => Ok(WriteMode::Append),
            "replace" => Ok(WriteMode::Replace),
            other => Err(SinkError::config(format!("unsupported mode: {:?}", other))),
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Append => write!(f, "append"),
            WriteMode::Replace => write!(f, "replace"),
        }
    }
}

/// How the remote interprets written strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueInputOption {
    /// Stored as-is
    #[default]
    Raw,
    /// Parsed as if typed by a user (numbers, dates, formulas)
    UserEntered,
}

impl ValueInputOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInputOption::Raw => "RAW",
            ValueInputOption::UserEntered => "USER_ENTERED",
        }
    }
}

impl FromStr for ValueInputOption {
    type Err = SinkError;

    fn from_str(s: &str) -> SinkResult<Self> {
        match s {
            "RAW" => Ok(ValueInputOption::Raw),
            "USER_ENTERED" => Ok(ValueInputOption::UserEntered),
            other => Err(SinkError::config(format!(
                "unsupported value_input_option: {:?}",
                other
            ))),
        }
    }
}

fn default_auth_method() -> String {
    "authorized_user".to_string()
}

fn default_mode() -> String {
    "append".to_string()
}

fn default_one() -> u32 {
    1
}

fn default_null_string() -> String {
    DEFAULT_NULL_STRING.to_string()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_value_input_option() -> String {
    "RAW".to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

/// Raw task configuration as written in a task file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub json_keyfile: Option<KeyfileSource>,

    #[serde(default)]
    pub access_token: Option<String>,

    pub spreadsheets_url: String,

    pub worksheet_title: String,

    #[serde(default = "default_auth_method")]
    pub auth_method: String,

    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default)]
    pub header_line: bool,

    #[serde(default = "default_one")]
    pub start_column: u32,

    #[serde(default = "default_one")]
    pub start_row: u32,

    #[serde(default = "default_null_string")]
    pub null_string: String,

    #[serde(default = "default_timezone")]
    pub default_timezone: String,

    #[serde(default = "default_timestamp_format")]
    pub default_timestamp_format: String,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_value_input_option")]
    pub value_input_option: String,

    #[serde(default)]
    pub spool_dir: Option<PathBuf>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl SinkConfig {
    /// Config with every optional key at its default
    pub fn new(spreadsheets_url: impl Into<String>, worksheet_title: impl Into<String>) -> Self {
        Self {
            json_keyfile: None,
            access_token: None,
            spreadsheets_url: spreadsheets_url.into(),
            worksheet_title: worksheet_title.into(),
            auth_method: default_auth_method(),
            mode: default_mode(),
            header_line: false,
            start_column: 1,
            start_row: 1,
            null_string: default_null_string(),
            default_timezone: default_timezone(),
            default_timestamp_format: default_timestamp_format(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            value_input_option: default_value_input_option(),
            spool_dir: None,
            api_base_url: default_api_base_url(),
        }
    }

    /// Validate and resolve into a task
    pub fn into_task(self) -> SinkResult<SinkTask> {
        let spreadsheet_id = spreadsheet_id_from_url(&self.spreadsheets_url)?;
        let mode: WriteMode = self.mode.parse()?;
        let auth_method: AuthMethod = self.auth_method.parse()?;
        let value_input_option: ValueInputOption = self.value_input_option.parse()?;

        if self.start_column == 0 {
            return Err(SinkError::config("start_column is 1-based and must be at least 1"));
        }
        if self.start_row == 0 {
            return Err(SinkError::config("start_row is 1-based and must be at least 1"));
        }
        if self.chunk_size == 0 {
            return Err(SinkError::config("chunk_size must be at least 1"));
        }
        if u32::try_from(self.chunk_size).is_err() {
            return Err(SinkError::config(format!(
                "chunk_size {} exceeds the worksheet row range",
                self.chunk_size
            )));
        }
        if self.json_keyfile.is_none() && self.access_token.is_none() {
            return Err(SinkError::config(
                "either json_keyfile or access_token is required",
            ));
        }

        let offset = parse_utc_offset(&self.default_timezone)?;
        let formatter = RecordFormatter::new(
            self.null_string,
            offset,
            self.default_timestamp_format,
        )?;

        Ok(SinkTask {
            spreadsheet_id,
            worksheet: SheetName::new(self.worksheet_title),
            auth_method,
            json_keyfile: self.json_keyfile,
            access_token: self.access_token,
            mode,
            header_line: self.header_line,
            start_column: self.start_column,
            start_row: self.start_row,
            formatter,
            chunk_size: self.chunk_size,
            value_input_option,
            spool_dir: self.spool_dir,
            api_base_url: self.api_base_url,
        })
    }
}

/// Extract the spreadsheet id from a `https://docs.google.com/spreadsheets/d/<id>/...` URL
pub fn spreadsheet_id_from_url(url: &str) -> SinkResult<String> {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    let re = URL_RE.get_or_init(|| Regex::new(SPREADSHEETS_URL_PATTERN).expect("valid regex"));

    re.captures(url)
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_string())
        .ok_or_else(|| {
            SinkError::config(format!(
                "failed to extract spreadsheet id from url {:?}, maybe spreadsheets_url is invalid",
                url
            ))
        })
}

/// A validated task
#[derive(Clone)]
pub struct SinkTask {
    pub spreadsheet_id: String,
    pub worksheet: SheetName,
    pub auth_method: AuthMethod,
    pub json_keyfile: Option<KeyfileSource>,
    pub access_token: Option<String>,
    pub mode: WriteMode,
    pub header_line: bool,
    pub start_column: u32,
    pub start_row: u32,
    pub formatter: RecordFormatter,
    pub chunk_size: usize,
    pub value_input_option: ValueInputOption,
    pub spool_dir: Option<PathBuf>,
    pub api_base_url: String,
}

impl SinkTask {
    /// One-line description for logs; credentials are never included
    pub fn summary(&self) -> String {
        format!(
            "spreadsheet={} worksheet={} mode={} header_line={} start={}{} chunk_size={} auth={} value_input={}",
            self.spreadsheet_id,
            self.worksheet,
            self.mode,
            self.header_line,
            crate::address::column_to_label(self.start_column),
            self.start_row,
            self.chunk_size,
            self.auth_method,
            self.value_input_option.as_str(),
        )
    }
}

impl fmt::Debug for SinkTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
