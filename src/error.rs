use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Which of the two join inputs an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Build,
    Probe,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Build => write!(f, "build input"),
            Side::Probe => write!(f, "probe input"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not materialize join key: {0}")]
    KeyAlloc(String),

    #[error("Could not materialize record: {0}")]
    RecordAlloc(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No data in {0}")]
    NoData(Side),

    #[error("Join column {index} not present in first record of {side}")]
    InvalidIndex { side: Side, index: usize },

    #[error("Join columns hold different content on the first record pair ({build:?} vs {probe:?})")]
    ColumnMismatch { build: String, probe: String },

    #[error("Memory budget of {budget} bytes is below one table entry ({entry_size} bytes)")]
    BudgetTooSmall { budget: usize, entry_size: usize },

    #[error("Invalid file handle: {0}")]
    InvalidHandle(String),
}

impl Error {
    /// Process status code reported by the CLI. `0` is success; each error
    /// category maps to a distinct non-zero code so scripts driving a join
    /// can tell them apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::KeyAlloc(_) => 2,
            Error::RecordAlloc(_) => 3,
            Error::Io(_) => 4,
            Error::NoData(_) => 5,
            Error::InvalidIndex { .. } => 6,
            Error::ColumnMismatch { .. } => 7,
            Error::BudgetTooSmall { .. } => 8,
            Error::InvalidHandle(_) => 9,
        }
    }
}
