//! Error types
//!
//! The simulation itself never fails; errors only come from building levels
//! out of layouts and from reading or writing persisted files.

use thiserror::Error;

/// Errors produced outside the per-tick simulation
#[derive(Error, Debug)]
pub enum BlammoError {
    /// Reading or writing a file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted file was not valid JSON for the expected type
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Leaderboard on disk had the wrong number of entries
    #[error("Invalid leaderboard: expected {expected} entries, found {found}")]
    InvalidLeaderboard {
        /// Entry count the table must have
        expected: usize,
        /// Entry count that was read
        found: usize,
    },

    /// A level layout could not be turned into a grid
    #[error("Invalid level layout at row {row}: {reason}")]
    InvalidLayout {
        /// Row index counted from the top of the layout
        row: usize,
        /// What was wrong
        reason: String,
    },
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, BlammoError>;
