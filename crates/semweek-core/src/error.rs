//! Typed errors raised at the library boundary.
//!
//! Lookup misses (a year with no table, a week past the end of a table)
//! are not errors: the classifier degrades them to the unclassified
//! label. Only structurally invalid input ends up here.

use std::path::PathBuf;

use thiserror::Error;

/// A date that does not exist in the proleptic Gregorian calendar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidDateError {
    /// Month outside `1..=12`.
    #[error("invalid month {month} (expected 1-12)")]
    Month {
        /// The rejected month.
        month: u32,
    },

    /// Day outside the given month.
    #[error("invalid day {day} for {year:04}-{month:02}")]
    Day {
        /// Year of the rejected date.
        year: i32,
        /// Month of the rejected date.
        month: u32,
        /// The rejected day.
        day: u32,
    },

    /// ISO week outside the weeks of the given ISO year.
    #[error("ISO year {year} has no week {week}")]
    IsoWeek {
        /// The ISO week-numbering year.
        year: i32,
        /// The rejected week.
        week: u32,
    },

    /// Year outside `1..=9999`, or arithmetic that left that range.
    #[error("date outside supported range 0001-01-01..=9999-12-31")]
    OutOfRange,
}

/// Failure to build a week classification table or registry.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("year key {key:?} is not an integer")]
    InvalidYear { key: String },

    #[error("year key {key:?} names {year}, which another key already names")]
    DuplicateYear { year: i32, key: String },

    #[error("table {year} has {len} entries (expected 1-53)")]
    InvalidLength { year: i32, len: usize },

    #[error("table {year}, week {week}: unknown code {code}")]
    InvalidCode { year: i32, week: usize, code: i64 },

    #[error("failed to parse JSON tables")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse TOML tables")]
    Toml(#[from] toml::de::Error),

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
