//! Bounded-memory equality join over delimited text files.
//!
//! The join never holds more than a caller-specified byte budget in its
//! lookup structure: the build input is consumed in chunks sized to the
//! budget, and the probe input is fully rescanned once per chunk.

pub mod error;
pub mod join;
pub mod record;
pub mod table;

pub use error::{Error, Result, Side};
pub use join::{hash_join, JoinStats};
pub use record::{Record, RecordReader};
pub use table::BoundedTable;

#[derive(Debug, Clone)]
pub struct JoinConfig {
    /// 0-based join column in the build input.
    pub build_column: usize,
    /// 0-based join column in the probe input.
    pub probe_column: usize,
    /// Hard ceiling, in bytes, on the per-pass lookup structure.
    pub memory_budget: usize,
    /// Field separator; no quoting or escaping is recognized.
    pub delimiter: char,
    /// Records longer than this many bytes are rejected.
    pub max_record_len: usize,
    /// Reject the join when the first record pair's join fields differ.
    /// A heuristic guard over that pair only, not a schema check.
    pub first_row_guard: bool,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            build_column: 0,
            probe_column: 0,
            memory_budget: 1024 * 1024,
            delimiter: ',',
            max_record_len: 1024 * 1024,
            first_row_guard: true,
        }
    }
}
