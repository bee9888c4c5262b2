//! Multi-pass chunked hash join driver.
//!
//! Repeats (build-chunk, full-probe-scan) passes until the build input is
//! exhausted. Each pass fills one [`BoundedTable`] up to its load limit,
//! streams the entire probe input against it, then rewinds the probe input
//! and drops the table. Total work is
//! `O((build_size / capacity) * probe_size)`: repeated probe scans are the
//! deliberate price of the hard per-pass memory ceiling.

use std::fmt;
use std::io::{BufRead, Seek, Write};

use tracing::{debug, info, warn};

use crate::error::{Error, Result, Side};
use crate::record::{write_joined, Record, RecordReader};
use crate::table::BoundedTable;
use crate::JoinConfig;

/// Counters accumulated across all passes of one join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    /// Number of (build-chunk, probe-scan) passes run.
    pub passes: u64,
    /// Build records read, counting superseded duplicates.
    pub build_records: u64,
    /// Probe records read, cumulative across rescans.
    pub probe_records_scanned: u64,
    /// Output rows written.
    pub rows_emitted: u64,
}

impl fmt::Display for JoinStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows emitted from {} build and {} probe records in {} passes",
            self.rows_emitted, self.build_records, self.probe_records_scanned, self.passes
        )
    }
}

/// Joins `build` against `probe`, writing matched rows to `out`.
///
/// For every build record `B` and probe record `P` whose join fields are
/// equal, emits all fields of `B` followed by all fields of `P` except the
/// probe join field. Output rows appear in probe order within a pass, and
/// passes follow build-chunk order. The lookup structure never holds more
/// than `config.memory_budget` bytes of entries.
pub fn hash_join<B, P, W>(
    build: B,
    probe: P,
    out: &mut W,
    config: &JoinConfig,
) -> Result<JoinStats>
where
    B: BufRead + Seek,
    P: BufRead + Seek,
    W: Write,
{
    let entry_size = BoundedTable::entry_size();
    let capacity = config.memory_budget / entry_size;
    if capacity == 0 {
        return Err(Error::BudgetTooSmall {
            budget: config.memory_budget,
            entry_size,
        });
    }

    let mut build = RecordReader::new(build, Side::Build, config.delimiter, config.max_record_len);
    let mut probe = RecordReader::new(probe, Side::Probe, config.delimiter, config.max_record_len);

    validate(&mut build, &mut probe, config)?;

    // Validation was a peek at the first record pair; both streams restart
    // from byte 0 so those records flow through the ordinary join path.
    build.rewind()?;
    probe.rewind()?;

    debug!(
        capacity,
        entry_size,
        budget = config.memory_budget,
        "starting chunked hash join"
    );

    let mut stats = JoinStats::default();
    let mut build_done = false;

    while !build_done {
        // Build phase: fill a fresh table up to its load limit. The table
        // only exists if this chunk has at least one record.
        let first = match build.read_record()? {
            Some(record) => record,
            None => break,
        };
        let mut table = BoundedTable::with_capacity(capacity)?;
        stats.build_records += 1;
        insert_build_record(&mut table, first, &build, config)?;

        while !table.is_at_load_limit() {
            match build.read_record()? {
                Some(record) => {
                    stats.build_records += 1;
                    insert_build_record(&mut table, record, &build, config)?;
                }
                None => {
                    build_done = true;
                    break;
                }
            }
        }

        // Probe phase: one full scan of the probe input against this chunk.
        // Any error propagates with the table dropped on the way out.
        let mut probed = 0u64;
        let mut emitted = 0u64;
        while let Some(record) = probe.read_record()? {
            probed += 1;
            let key = record.field(config.probe_column).ok_or_else(|| {
                Error::KeyAlloc(format!(
                    "record {} of {} has no field {}",
                    probe.records_read(),
                    Side::Probe,
                    config.probe_column
                ))
            })?;
            if let Some(build_record) = table.get(key) {
                write_joined(out, build_record, &record, config.probe_column)?;
                emitted += 1;
            }
        }
        probe.rewind()?;

        stats.passes += 1;
        stats.probe_records_scanned += probed;
        stats.rows_emitted += emitted;
        debug!(
            pass = stats.passes,
            chunk = table.len(),
            probed,
            emitted,
            "pass complete"
        );
    }

    out.flush()?;
    info!(%stats, "join complete");
    Ok(stats)
}

fn insert_build_record<B: BufRead + Seek>(
    table: &mut BoundedTable,
    record: Record,
    build: &RecordReader<B>,
    config: &JoinConfig,
) -> Result<()> {
    let key = match record.field(config.build_column) {
        Some(key) => key.to_string(),
        None => {
            return Err(Error::KeyAlloc(format!(
                "record {} of {} has no field {}",
                build.records_read(),
                Side::Build,
                config.build_column
            )))
        }
    };
    table.insert(key, record);
    Ok(())
}

/// Precondition gate: both inputs must yield a first record, the join
/// columns must resolve on those records, and (unless disabled) the two
/// extracted fields must be byte-equal. The equality test is a heuristic
/// over the first record pair only, kept from the original join for
/// catching obviously misaligned column choices.
fn validate<B, P>(
    build: &mut RecordReader<B>,
    probe: &mut RecordReader<P>,
    config: &JoinConfig,
) -> Result<()>
where
    B: BufRead + Seek,
    P: BufRead + Seek,
{
    let first_build = build.read_record()?.ok_or(Error::NoData(Side::Build))?;
    let first_probe = probe.read_record()?.ok_or(Error::NoData(Side::Probe))?;

    let build_key = first_build.field(config.build_column).ok_or(Error::InvalidIndex {
        side: Side::Build,
        index: config.build_column,
    })?;
    let probe_key = first_probe.field(config.probe_column).ok_or(Error::InvalidIndex {
        side: Side::Probe,
        index: config.probe_column,
    })?;

    if build_key != probe_key {
        if config.first_row_guard {
            warn!(
                build = build_key,
                probe = probe_key,
                "first-row content guard rejecting join"
            );
            return Err(Error::ColumnMismatch {
                build: build_key.to_string(),
                probe: probe_key.to_string(),
            });
        }
        debug!(
            build = build_key,
            probe = probe_key,
            "first-row guard disabled, joining despite differing first fields"
        );
    }

    Ok(())
}
