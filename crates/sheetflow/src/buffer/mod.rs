//! Disk-spooled write buffer
//!
//! Records are appended to an anonymous temporary file as they arrive and
//! read back, in arrival order, in fixed-size chunks when the session
//! flushes. Only one chunk is resident at a time.
//!
//! The spool is released by [`WriteBuffer::close`], which is idempotent
//! and also runs on drop, so every exit path of a session frees it.

pub mod codec;

use crate::error::{SinkError, SinkResult};
use crate::record::Record;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn, Span};

const SPOOL_PREFIX: &str = "sheetflow-buffer-";
const WRITE_BUFFER_CAPACITY: usize = 64 * 1024;

/// Append-only record spool backed by a temporary file
pub struct WriteBuffer {
    spool: Option<Spool>,
    records: u64,
    span: Span,
}

struct Spool {
    writer: BufWriter<NamedTempFile>,
    /// Set after a drain moved the file position away from the end
    rewound: bool,
}

impl WriteBuffer {
    /// Allocate a uniquely named spool in the system temp directory
    pub fn open(span: Span) -> SinkResult<Self> {
        Self::allocate(None, span)
    }

    /// Allocate a uniquely named spool inside `dir`
    pub fn open_in(dir: impl AsRef<Path>, span: Span) -> SinkResult<Self> {
        Self::allocate(Some(dir.as_ref()), span)
    }

    fn allocate(dir: Option<&Path>, span: Span) -> SinkResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SPOOL_PREFIX).suffix(".spool");

        let file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| SinkError::Resource(format!("failed to allocate write buffer: {}", e)))?;

        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_CAPACITY, file);
        codec::write_header(&mut writer)
            .map_err(|e| SinkError::Resource(format!("failed to initialize write buffer: {}", e)))?;

        debug!(parent: &span, "opened write buffer at {}", writer.get_ref().path().display());

        Ok(Self {
            spool: Some(Spool {
                writer,
                rewound: false,
            }),
            records: 0,
            span,
        })
    }

    /// Serialize `record` onto the end of the spool.
    ///
    /// A record too large for one buffer entry is rejected with
    /// `InvalidRecord` and leaves the spool untouched.
    pub fn append(&mut self, record: &Record) -> SinkResult<()> {
        let entry = codec::encode_record(record)?;
        let spool = self.spool_mut()?;

        if spool.rewound {
            spool.writer.seek(SeekFrom::End(0))?;
            spool.rewound = false;
        }
        spool.writer.write_all(&entry)?;

        self.records += 1;
        Ok(())
    }

    /// Number of records appended so far
    pub fn len(&self) -> u64 {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    pub fn is_closed(&self) -> bool {
        self.spool.is_none()
    }

    /// Location of the spool file while it exists
    pub fn path(&self) -> Option<PathBuf> {
        self.spool
            .as_ref()
            .map(|spool| spool.writer.get_ref().path().to_path_buf())
    }

    /// Rewind and read the spool back as chunks of at most `chunk_size`
    /// records, in append order.
    ///
    /// The returned iterator is single-pass. Calling `drain` again starts
    /// over from the first record.
    pub fn drain(&mut self, chunk_size: usize) -> SinkResult<Chunks<'_>> {
        if chunk_size == 0 {
            return Err(SinkError::config("chunk size must be at least 1"));
        }
        let remaining = self.records;
        let span = self.span.clone();
        let spool = self.spool_mut()?;

        spool.writer.flush()?;
        spool.rewound = true;

        let file = spool.writer.get_mut().as_file_mut();
        file.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(file);
        codec::read_header(&mut reader)?;

        debug!(parent: &span, "draining {} buffered records in chunks of {}", remaining, chunk_size);

        Ok(Chunks {
            reader,
            chunk_size,
            position: codec::HEADER_LEN,
            finished: false,
        })
    }

    /// Release the spool. Safe to call more than once; failures are
    /// logged and swallowed.
    pub fn close(&mut self) {
        let Some(spool) = self.spool.take() else {
            return;
        };

        // Buffered bytes are discarded, not flushed: the spool is going away.
        let (file, _) = spool.writer.into_parts();
        let path = file.path().to_path_buf();
        match file.close() {
            Ok(()) => debug!(parent: &self.span, "released write buffer {}", path.display()),
            Err(e) => warn!(
                parent: &self.span,
                "failed to release write buffer {}: {}",
                path.display(),
                e
            ),
        }
    }

    fn spool_mut(&mut self) -> SinkResult<&mut Spool> {
        self.spool
            .as_mut()
            .ok_or_else(|| SinkError::Resource("write buffer is closed".to_string()))
    }
}

impl Drop for WriteBuffer {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for WriteBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBuffer")
            .field("path", &self.path())
            .field("records", &self.records)
            .finish()
    }
}

/// Single-pass iterator over buffered records, `chunk_size` at a time
pub struct Chunks<'a> {
    reader: BufReader<&'a mut std::fs::File>,
    chunk_size: usize,
    position: u64,
    finished: bool,
}

impl Iterator for Chunks<'_> {
    type Item = SinkResult<Vec<Record>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut chunk = Vec::with_capacity(self.chunk_size);
        while chunk.len() < self.chunk_size {
            match codec::read_record(&mut self.reader, self.position) {
                Ok(Some((record, consumed))) => {
                    self.position += consumed;
                    chunk.push(record);
                }
                Ok(None) => {
                    self.finished = true;
                    break;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }

        if chunk.is_empty() {
            None
        } else {
            Some(Ok(chunk))
        }
    }
}
