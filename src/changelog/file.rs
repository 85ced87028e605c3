//! File-backed change log.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::entity::MonitoredEntity;
use crate::monitor::ChangeEvent;

use super::{ChangeLogError, ChangeRecord, HEADER, encode_row};

/// Append-only writer for [`ChangeRecord`]s.
///
/// Owns the only handle to the destination. Every record is flushed as
/// soon as it is written, so a crash can lose at most the record being
/// written and never one that was already committed.
///
/// [`ChangeLog::close`] consumes the log, so it can run at most once; a log
/// that is dropped without being closed still releases the handle, but any
/// final flush error goes unreported.
///
/// # Type Parameters
///
/// * `W` - The underlying writer (a buffered file in production)
#[derive(Debug)]
pub struct ChangeLog<W: Write = BufWriter<File>> {
    writer: W,
    destination: PathBuf,
    records_written: u64,
}

impl ChangeLog {
    /// Opens `path` for appending, creating it (and its parent directories)
    /// if needed.
    ///
    /// The header row is written only when the destination is new or
    /// empty. An existing destination keeps its contents and header; if its
    /// last line was cut short, new records start on the next line.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeLogError::Open`] if the file cannot be created or
    /// opened, and [`ChangeLogError::Write`] if the header cannot be written.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ChangeLogError> {
        let destination = path.into();
        let open_error = |source| ChangeLogError::Open {
            path: destination.clone(),
            source,
        };

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(open_error)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&destination)
            .map_err(open_error)?;
        let is_empty = file.metadata().map_err(open_error)?.len() == 0;
        let torn_tail = !is_empty && !ends_with_newline(&mut file).map_err(open_error)?;

        tracing::debug!(
            "Opened change log {} ({})",
            destination.display(),
            if is_empty { "new" } else { "appending" }
        );

        let mut log = Self::from_writer(BufWriter::new(file), destination, is_empty)?;
        if torn_tail {
            tracing::warn!(
                "Change log {} ends mid-line, starting new records on a fresh line",
                log.destination.display()
            );
            log.write_line("\n")?;
            log.flush()?;
        }
        Ok(log)
    }
}

impl<W: Write> ChangeLog<W> {
    /// Wraps an arbitrary writer.
    ///
    /// `destination` is only used in error messages and reports.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeLogError::Write`] if `write_header` is set and the
    /// header cannot be written.
    pub fn from_writer(
        writer: W,
        destination: impl Into<PathBuf>,
        write_header: bool,
    ) -> Result<Self, ChangeLogError> {
        let mut log = Self {
            writer,
            destination: destination.into(),
            records_written: 0,
        };

        if write_header {
            log.write_line(&encode_row(&HEADER))?;
            log.flush()?;
        }

        Ok(log)
    }

    /// Returns the destination this log writes to.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Writes the initial state of an entity captured at session start.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeLogError::Write`] if the record cannot be persisted.
    pub fn write_baseline(
        &mut self,
        entity: &MonitoredEntity,
        state: &str,
        timestamp: &str,
    ) -> Result<(), ChangeLogError> {
        self.append(&ChangeRecord::new(timestamp, entity, state))
    }

    /// Writes a detected transition.
    ///
    /// Only the new state is persisted; the previous value is for the
    /// operator notification alone.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeLogError::Write`] if the record cannot be persisted.
    pub fn write_change(&mut self, change: &ChangeEvent<'_>) -> Result<(), ChangeLogError> {
        self.append(&ChangeRecord::new(
            change.timestamp,
            change.entity,
            &change.current,
        ))
    }

    /// Pushes buffered bytes to the destination.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeLogError::Write`] if the flush fails.
    pub fn flush(&mut self) -> Result<(), ChangeLogError> {
        self.writer.flush().map_err(|source| self.write_error(source))
    }

    /// Flushes and releases the destination.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeLogError::Write`] if the final flush fails. The
    /// handle is released either way.
    pub fn close(mut self) -> Result<(), ChangeLogError> {
        let result = self.flush();
        tracing::debug!(
            "Closed change log {} after {} record(s)",
            self.destination.display(),
            self.records_written
        );
        result
    }

    fn append(&mut self, record: &ChangeRecord<'_>) -> Result<(), ChangeLogError> {
        self.write_line(&record.to_row())?;
        self.flush()?;
        self.records_written += 1;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<(), ChangeLogError> {
        self.writer
            .write_all(line.as_bytes())
            .map_err(|source| self.write_error(source))
    }

    fn write_error(&self, source: std::io::Error) -> ChangeLogError {
        ChangeLogError::Write {
            path: self.destination.clone(),
            source,
        }
    }
}

/// Checks whether a non-empty file ends with a line terminator.
fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
