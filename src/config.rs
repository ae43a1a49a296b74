use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{ArgGroup, Parser, Subcommand};

use crate::dates;
use crate::report::{SessionRef, StudentRef};
use crate::roster::RosterConfig;
use crate::sink::ReportFormat;

#[derive(Parser, Debug)]
#[command(name = "attendance-report")]
#[command(about = "Attendance reports from a class roster spreadsheet", long_about = None)]
pub struct Settings {
    /// Roster workbook (xlsx, xls, ods) or CSV export
    #[arg(long, env = "ATTENDANCE_FILE", default_value = "attendance.xlsx", global = true)]
    pub file: PathBuf,
    /// 0-based worksheet index
    #[arg(long, default_value_t = 0, global = true)]
    pub sheet_index: usize,
    /// Date of week 1 for week-numbered session headers
    #[arg(long, env = "ATTENDANCE_EPOCH", default_value_t = dates::default_epoch(), global = true)]
    pub epoch: NaiveDate,
    /// Treat this date as today when dropping future sessions
    #[arg(long, global = true)]
    pub as_of: Option<NaiveDate>,
    #[arg(long, default_value = ".", global = true)]
    pub out_dir: PathBuf,
    /// Output format; repeat for several
    #[arg(long = "format", value_enum, default_values_t = [ReportFormat::Json], global = true)]
    pub formats: Vec<ReportFormat>,
    /// File name stem; derived from the report when omitted
    #[arg(long, global = true)]
    pub out_name: Option<String>,
    /// Also print the text rendering to stdout
    #[arg(long, global = true)]
    pub print: bool,
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Report on one student
    #[command(group(
        ArgGroup::new("target")
            .args(["index", "number"])
            .required(true)
            .multiple(false)
    ))]
    Student {
        /// 0-based position after ordering by sequence number (unlike the 1-based session --ordinal)
        #[arg(long)]
        index: Option<usize>,
        /// Sequence number as written in the sheet
        #[arg(long)]
        number: Option<i64>,
    },
    /// Report on one session
    #[command(group(
        ArgGroup::new("target")
            .args(["ordinal", "date"])
            .required(true)
            .multiple(false)
    ))]
    Session {
        /// 1-based session number among held sessions (unlike the 0-based student --index)
        #[arg(long)]
        ordinal: Option<usize>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Report on the whole group
    Roster,
    /// List worksheet names in the workbook
    Sheets,
}

impl Settings {
    pub fn roster_config(&self) -> RosterConfig {
        RosterConfig::new(self.epoch, self.as_of.unwrap_or_else(|| Local::now().date_naive()))
    }
}

impl Commands {
    pub fn student_ref(&self) -> Option<StudentRef<'static>> {
        match self {
            Commands::Student { index: Some(index), .. } => Some(StudentRef::Position(*index)),
            Commands::Student { number: Some(number), .. } => Some(StudentRef::Number(*number)),
            _ => None,
        }
    }

    pub fn session_ref(&self) -> Option<SessionRef> {
        match self {
            Commands::Session { ordinal: Some(ordinal), .. } => Some(SessionRef::Ordinal(*ordinal)),
            Commands::Session { date: Some(date), .. } => Some(SessionRef::Date(*date)),
            _ => None,
        }
    }
}
