//! Line-oriented record access.
//!
//! Records are single text lines split on a fixed delimiter character, with
//! no quoting or escaping. An empty line acts as an end-of-data sentinel for
//! the stream it appears in.

use std::io::{BufRead, Seek, SeekFrom, Write};

use crate::error::{Error, Result, Side};

/// One delimited record: an owned line plus the delimiter it was read with.
///
/// Fields are derived views over the line; the record itself is immutable
/// once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    line: String,
    delimiter: char,
}

impl Record {
    pub fn new(line: String, delimiter: char) -> Self {
        Self { line, delimiter }
    }

    /// The raw line backing this record, without any line terminator.
    pub fn as_line(&self) -> &str {
        &self.line
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.line.split(self.delimiter)
    }

    /// 0-based field extraction. `None` if `index` is out of range.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields().nth(index)
    }

    pub fn field_count(&self) -> usize {
        self.fields().count()
    }

    /// Writes the record verbatim (no trailing newline).
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(self.line.as_bytes())?;
        Ok(())
    }

    /// Writes the record with field `skip` and exactly one adjacent
    /// delimiter elided. If `skip` is the last field, the delimiter before
    /// it goes; otherwise the one after it does, so no doubled or trailing
    /// delimiter is left behind. An out-of-range `skip` writes the record
    /// unchanged.
    pub fn write_without_field<W: Write>(&self, out: &mut W, skip: usize) -> Result<()> {
        let mut first = true;
        for (i, field) in self.fields().enumerate() {
            if i == skip {
                continue;
            }
            if !first {
                write!(out, "{}", self.delimiter)?;
            }
            out.write_all(field.as_bytes())?;
            first = false;
        }
        Ok(())
    }
}

/// Emits one joined output row: all of `build`, the delimiter, then `probe`
/// with its join field removed, newline-terminated.
pub fn write_joined<W: Write>(
    out: &mut W,
    build: &Record,
    probe: &Record,
    probe_key_index: usize,
) -> Result<()> {
    build.write_to(out)?;
    write!(out, "{}", build.delimiter())?;
    probe.write_without_field(out, probe_key_index)?;
    writeln!(out)?;
    Ok(())
}

/// Buffered, rewindable reader of delimited records.
///
/// Reads one line per record, stripping `\r\n`/`\n`. Clean end-of-file and
/// an empty line both end the stream; `rewind` restarts it from byte 0.
/// Lines longer than `max_record_len` bytes are rejected rather than split.
pub struct RecordReader<R> {
    inner: R,
    side: Side,
    delimiter: char,
    max_record_len: usize,
    done: bool,
    line_no: u64,
}

impl<R: BufRead + Seek> RecordReader<R> {
    pub fn new(inner: R, side: Side, delimiter: char, max_record_len: usize) -> Self {
        Self {
            inner,
            side,
            delimiter,
            max_record_len,
            done: false,
            line_no: 0,
        }
    }

    /// Number of records handed out since construction or the last rewind.
    pub fn records_read(&self) -> u64 {
        self.line_no
    }

    /// Reads the next record. `Ok(None)` once the stream has ended, and on
    /// every call after that until `rewind`.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        if self.done {
            return Ok(None);
        }

        let mut line = String::new();
        let n = self.inner.read_line(&mut line)?;
        if n == 0 {
            self.done = true;
            return Ok(None);
        }

        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }

        if line.is_empty() {
            // Zero-length record: end-of-data sentinel.
            self.done = true;
            return Ok(None);
        }

        if line.len() > self.max_record_len {
            return Err(Error::RecordAlloc(format!(
                "record {} of {} is {} bytes, above the {}-byte limit",
                self.line_no + 1,
                self.side,
                line.len(),
                self.max_record_len
            )));
        }

        self.line_no += 1;
        Ok(Some(Record::new(line, self.delimiter)))
    }

    /// Seeks back to the start of the input and clears end-of-stream state.
    pub fn rewind(&mut self) -> Result<()> {
        self.inner.seek(SeekFrom::Start(0))?;
        self.done = false;
        self.line_no = 0;
        Ok(())
    }
}
