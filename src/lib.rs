//! Attendance reports for a class roster spreadsheet.
//!
//! A sheet is read into a raw grid, normalised into a [`models::RosterMatrix`]
//! and summarised into student, session or whole-group reports.

pub mod config;
pub mod dates;
pub mod error;
pub mod models;
pub mod report;
pub mod roster;
pub mod sheet;
pub mod sink;
pub mod stats;
