use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{AttendanceError, Result};
use crate::models::RawCell;

/// Fixed reference date for week-index headers: week 1 falls on the epoch.
pub const DEFAULT_EPOCH: (i32, u32, u32) = (2024, 10, 3);

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%d.%m.%Y %H:%M:%S"];

pub fn default_epoch() -> NaiveDate {
    let (year, month, day) = DEFAULT_EPOCH;
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// A session header as written in the sheet, before it is pinned to a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderDate {
    Literal(NaiveDate),
    /// 1-based week number counted from the epoch.
    WeekIndex(i64),
}

impl HeaderDate {
    pub fn classify(cell: &RawCell) -> Result<Self> {
        match cell {
            RawCell::Date(dt) => Ok(HeaderDate::Literal(dt.date())),
            RawCell::Text(text) => {
                if let Some(date) = parse_date_text(text) {
                    return Ok(HeaderDate::Literal(date));
                }
                match text.trim().parse::<f64>() {
                    Ok(n) => week_index(n, cell),
                    Err(_) => Err(decode_error(cell, "not a recognised date string")),
                }
            }
            RawCell::Int(n) => Ok(HeaderDate::WeekIndex(*n)),
            RawCell::Float(n) => week_index(*n, cell),
            RawCell::Bool(_) => Err(decode_error(cell, "boolean is not a date")),
            RawCell::Empty => Err(decode_error(cell, "cell is blank")),
        }
    }

    pub fn resolve(self, epoch: NaiveDate) -> Result<NaiveDate> {
        match self {
            HeaderDate::Literal(date) => Ok(date),
            HeaderDate::WeekIndex(n) => n
                .checked_sub(1)
                .and_then(Duration::try_weeks)
                .and_then(|offset| epoch.checked_add_signed(offset))
                .ok_or_else(|| AttendanceError::DateDecode {
                    cell: n.to_string(),
                    reason: "week index is out of the calendar range".to_string(),
                }),
        }
    }
}

/// Decodes one header cell into the calendar date of its session.
pub fn decode(cell: &RawCell, epoch: NaiveDate) -> Result<NaiveDate> {
    HeaderDate::classify(cell)?.resolve(epoch)
}

fn week_index(n: f64, cell: &RawCell) -> Result<HeaderDate> {
    if !n.is_finite() {
        return Err(decode_error(cell, "week index is not a finite number"));
    }
    Ok(HeaderDate::WeekIndex(n.trunc() as i64))
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|dt| dt.date())
        })
}

fn decode_error(cell: &RawCell, reason: &str) -> AttendanceError {
    AttendanceError::DateDecode {
        cell: format!("{cell:?}"),
        reason: reason.to_string(),
    }
}
