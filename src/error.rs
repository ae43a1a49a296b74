use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while loading a roster sheet or assembling a report.
#[derive(Error, Debug)]
pub enum AttendanceError {
    /// A session header cell is neither a date nor a finite week index.
    #[error("Cannot decode session header cell {cell}: {reason}")]
    DateDecode { cell: String, reason: String },

    /// The sheet does not follow the expected positional layout.
    #[error("Malformed attendance sheet: {0}")]
    MalformedSheet(String),

    /// A percentage was requested over zero students or zero sessions.
    #[error("Attendance percentage is undefined: no {0}")]
    DivisionUndefined(&'static str),

    #[error("Student not found: {0}")]
    StudentNotFound(String),

    #[error("No active session matches {0}")]
    SessionNotFound(String),

    /// The spreadsheet or CSV file could not be opened or decoded.
    #[error("Failed to read sheet {path}: {reason}")]
    SheetRead { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

impl AttendanceError {
    pub fn session_date(date: NaiveDate) -> Self {
        AttendanceError::SessionNotFound(format!("date {date}"))
    }
}

pub type Result<T> = std::result::Result<T, AttendanceError>;
