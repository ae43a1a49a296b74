use std::collections::HashSet;

use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use crate::dates;
use crate::error::{AttendanceError, Result};
use crate::models::{RawCell, RosterMatrix, Session, Student};

/// Row holding the "Group: <name>" cell.
pub const GROUP_ROW: usize = 0;
pub const GROUP_COL: usize = 0;
/// Row holding one header cell per session.
pub const SESSION_HEADER_ROW: usize = 2;
/// First row of the student block.
pub const FIRST_STUDENT_ROW: usize = 3;
/// Sequence number, surname, given name, patronymic.
pub const IDENTITY_COLUMNS: usize = 4;
/// First presence/session column.
pub const FIRST_SESSION_COL: usize = IDENTITY_COLUMNS;

static EMPTY_CELL: RawCell = RawCell::Empty;

/// Inputs to a roster load that would otherwise be ambient state.
#[derive(Debug, Clone, Copy)]
pub struct RosterConfig {
    pub epoch: NaiveDate,
    /// Load-time "now"; sessions dated after it are not attendance-bearing yet.
    pub as_of: NaiveDate,
}

impl RosterConfig {
    pub fn new(epoch: NaiveDate, as_of: NaiveDate) -> Self {
        Self { epoch, as_of }
    }
}

impl Default for RosterConfig {
    /// Default epoch, loaded as of the local calendar date.
    fn default() -> Self {
        Self::new(dates::default_epoch(), Local::now().date_naive())
    }
}

pub fn build(grid: &[Vec<RawCell>], config: &RosterConfig) -> Result<RosterMatrix> {
    validate_layout(grid)?;

    let group_name = parse_group_name(&grid[GROUP_ROW])?;
    let sessions = active_sessions(&grid[SESSION_HEADER_ROW], config)?;
    let width = IDENTITY_COLUMNS + sessions.len();

    let mut students = Vec::new();
    for (offset, row) in grid[FIRST_STUDENT_ROW..].iter().enumerate() {
        let row_number = FIRST_STUDENT_ROW + offset;
        if row.iter().take(IDENTITY_COLUMNS).all(RawCell::is_blank) {
            debug!(row = row_number, "skipping blank roster row");
            continue;
        }
        students.push(student_row(row, row_number, width)?);
    }

    info!(
        group = %group_name,
        sessions = sessions.len(),
        students = students.len(),
        "roster loaded"
    );
    Ok(RosterMatrix::new(group_name, sessions, students))
}

fn validate_layout(grid: &[Vec<RawCell>]) -> Result<()> {
    let group_present = grid
        .get(GROUP_ROW)
        .and_then(|row| row.get(GROUP_COL))
        .is_some_and(|cell| !cell.is_blank());
    if !group_present {
        return Err(AttendanceError::MalformedSheet(format!(
            "group name cell at row {GROUP_ROW}, column {GROUP_COL} is missing"
        )));
    }
    if grid.len() <= SESSION_HEADER_ROW {
        return Err(AttendanceError::MalformedSheet(format!(
            "session header row {SESSION_HEADER_ROW} is missing"
        )));
    }
    if grid.len() <= FIRST_STUDENT_ROW {
        return Err(AttendanceError::MalformedSheet(format!(
            "student block starting at row {FIRST_STUDENT_ROW} is missing"
        )));
    }
    Ok(())
}

fn parse_group_name(row: &[RawCell]) -> Result<String> {
    let raw = row[GROUP_COL].as_text();
    let name = raw.rsplit(':').next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(AttendanceError::MalformedSheet(format!(
            "group name cell {raw:?} has no name after the colon"
        )));
    }
    Ok(name.to_string())
}

fn active_sessions(header: &[RawCell], config: &RosterConfig) -> Result<Vec<Session>> {
    let mut declared = Vec::new();
    for cell in header.iter().skip(FIRST_SESSION_COL) {
        if cell.is_blank() {
            continue;
        }
        declared.push(dates::decode(cell, config.epoch)?);
    }

    let sessions: Vec<Session> = declared
        .iter()
        .filter(|date| **date <= config.as_of)
        .enumerate()
        .map(|(index, date)| Session {
            date: *date,
            ordinal: index + 1,
        })
        .collect();

    let mut seen = HashSet::new();
    if let Some(duplicate) = sessions.iter().find(|session| !seen.insert(session.date)) {
        return Err(AttendanceError::MalformedSheet(format!(
            "session date {} appears more than once in the header",
            duplicate.date
        )));
    }

    if sessions.len() < declared.len() {
        debug!(
            declared = declared.len(),
            active = sessions.len(),
            as_of = %config.as_of,
            "narrowing roster to sessions that have already taken place"
        );
    }
    Ok(sessions)
}

fn student_row(row: &[RawCell], row_number: usize, width: usize) -> Result<Student> {
    let cell = |col: usize| row.get(col).unwrap_or(&EMPTY_CELL);

    let sequence_number = cell(0)
        .as_number()
        .filter(|n| n.is_finite())
        .map(|n| n.trunc() as i64)
        .ok_or_else(|| {
            AttendanceError::MalformedSheet(format!(
                "row {row_number} has no numeric sequence number (found {:?})",
                cell(0)
            ))
        })?;

    let presence = (FIRST_SESSION_COL..width)
        .map(|col| presence_flag(cell(col), row_number, col))
        .collect::<Result<Vec<bool>>>()?;

    Ok(Student {
        sequence_number,
        last_name: cell(1).as_text(),
        first_name: cell(2).as_text(),
        patronymic: cell(3).as_text(),
        presence,
    })
}

fn presence_flag(cell: &RawCell, row: usize, col: usize) -> Result<bool> {
    if cell.is_blank() {
        return Ok(false);
    }
    match cell {
        RawCell::Bool(flag) => Ok(*flag),
        other => other
            .as_number()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n.trunc() > 0.0)
            .ok_or_else(|| {
                AttendanceError::MalformedSheet(format!(
                    "presence cell at row {row}, column {col} is not a 0/1 flag: {other:?}"
                ))
            }),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    pub(crate) fn config() -> RosterConfig {
        RosterConfig::new(ymd(2024, 10, 3), ymd(2024, 10, 20))
    }

    fn text(value: &str) -> RawCell {
        RawCell::Text(value.to_string())
    }

    fn student(seq: i64, last: &str, flags: &[RawCell]) -> Vec<RawCell> {
        let mut row = vec![RawCell::Int(seq), text(last), text("Anna"), text("Olegovna")];
        row.extend_from_slice(flags);
        row
    }

    /// Header with week codes 1..=4: Oct 3, 10, 17 and 24 (the last is after `as_of`).
    pub(crate) fn sample_grid() -> Vec<Vec<RawCell>> {
        vec![
            vec![text("Group: IT-21")],
            vec![],
            vec![
                text("No."),
                text("Surname"),
                text("Name"),
                text("Patronymic"),
                RawCell::Int(1),
                RawCell::Float(2.0),
                text("2024-10-17"),
                RawCell::Int(4),
            ],
            student(2, "Petrova", &[RawCell::Int(1), RawCell::Empty, RawCell::Float(1.0), RawCell::Int(1)]),
            student(1, "Ivanova", &[RawCell::Int(1), RawCell::Int(1)]),
        ]
    }

    #[test]
    fn builds_group_sessions_and_students() {
        let matrix = build(&sample_grid(), &config()).unwrap();
        assert_eq!(matrix.group_name(), "IT-21");
        let dates: Vec<NaiveDate> = matrix.sessions().iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![ymd(2024, 10, 3), ymd(2024, 10, 10), ymd(2024, 10, 17)]);
        let ordinals: Vec<usize> = matrix.sessions().iter().map(|s| s.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
        assert_eq!(matrix.students().len(), 2);
        assert_eq!(matrix.students()[0].presence, vec![true, false, true]);
        assert_eq!(matrix.students()[1].presence, vec![true, true, false]);
    }

    #[test]
    fn future_sessions_are_filtered_and_columns_narrowed() {
        let matrix = build(&sample_grid(), &config()).unwrap();
        assert!(matrix.sessions().iter().all(|s| s.date <= config().as_of));
        for student in matrix.students() {
            assert_eq!(student.presence.len(), matrix.sessions().len());
        }
    }

    #[test]
    fn session_on_as_of_date_is_active() {
        let config = RosterConfig::new(ymd(2024, 10, 3), ymd(2024, 10, 24));
        let matrix = build(&sample_grid(), &config).unwrap();
        assert_eq!(matrix.sessions().len(), 4);
        assert_eq!(matrix.students()[0].presence, vec![true, false, true, true]);
    }

    #[test]
    fn all_future_sessions_leave_an_empty_matrix() {
        let config = RosterConfig::new(ymd(2024, 10, 3), ymd(2024, 9, 1));
        let matrix = build(&sample_grid(), &config).unwrap();
        assert!(matrix.sessions().is_empty());
        assert!(matrix.students().iter().all(|s| s.presence.is_empty()));
    }

    #[test]
    fn group_name_takes_text_after_last_colon() {
        let mut grid = sample_grid();
        grid[0][0] = text("Faculty: CS: Group:  PM-11 ");
        let matrix = build(&grid, &config()).unwrap();
        assert_eq!(matrix.group_name(), "PM-11");
    }

    #[test]
    fn group_name_without_colon_is_used_whole() {
        let mut grid = sample_grid();
        grid[0][0] = text("IT-22");
        assert_eq!(build(&grid, &config()).unwrap().group_name(), "IT-22");
    }

    #[test]
    fn blank_header_cells_are_dropped() {
        let mut grid = sample_grid();
        grid[2] = vec![
            RawCell::Empty,
            RawCell::Empty,
            RawCell::Empty,
            RawCell::Empty,
            RawCell::Int(1),
            RawCell::Empty,
            RawCell::Int(2),
        ];
        let matrix = build(&grid, &config()).unwrap();
        assert_eq!(matrix.sessions().len(), 2);
        assert_eq!(matrix.sessions()[1].date, ymd(2024, 10, 10));
    }

    #[test]
    fn blank_identity_rows_are_skipped() {
        let mut grid = sample_grid();
        grid.push(vec![RawCell::Empty, text(" "), RawCell::Empty, RawCell::Empty, RawCell::Int(1)]);
        let matrix = build(&grid, &config()).unwrap();
        assert_eq!(matrix.students().len(), 2);
    }

    #[test]
    fn missing_group_cell_is_malformed() {
        let mut grid = sample_grid();
        grid[0] = vec![];
        let err = build(&grid, &config()).unwrap_err();
        assert!(matches!(err, AttendanceError::MalformedSheet(_)));
    }

    #[test]
    fn missing_header_or_student_block_is_malformed() {
        let grid = sample_grid();
        for len in [0, 1, 2, 3] {
            let err = build(&grid[..len], &config()).unwrap_err();
            assert!(matches!(err, AttendanceError::MalformedSheet(_)), "len {len}");
        }
    }

    #[test]
    fn undecodable_header_is_a_date_error() {
        let mut grid = sample_grid();
        grid[2][5] = text("seminar");
        let err = build(&grid, &config()).unwrap_err();
        assert!(matches!(err, AttendanceError::DateDecode { .. }));
    }

    #[test]
    fn duplicate_session_dates_are_malformed() {
        let mut grid = sample_grid();
        grid[2][5] = text("2024-10-03");
        let err = build(&grid, &config()).unwrap_err();
        assert!(matches!(err, AttendanceError::MalformedSheet(_)));
    }

    #[test]
    fn non_numeric_sequence_number_is_malformed() {
        let mut grid = sample_grid();
        grid[3][0] = text("first");
        let err = build(&grid, &config()).unwrap_err();
        assert!(matches!(err, AttendanceError::MalformedSheet(_)));
    }

    #[test]
    fn default_config_uses_reference_epoch() {
        let config = RosterConfig::default();
        assert_eq!(config.epoch, ymd(2024, 10, 3));
        assert_eq!(config.as_of, Local::now().date_naive());
    }

    #[test]
    fn presence_cells_coerce_to_flags() {
        assert!(!presence_flag(&RawCell::Empty, 3, 4).unwrap());
        assert!(!presence_flag(&text(""), 3, 4).unwrap());
        assert!(!presence_flag(&RawCell::Float(0.4), 3, 4).unwrap());
        assert!(presence_flag(&RawCell::Float(1.0), 3, 4).unwrap());
        assert!(presence_flag(&text("1"), 3, 4).unwrap());
        assert!(presence_flag(&RawCell::Bool(true), 3, 4).unwrap());
        assert!(presence_flag(&text("yes"), 3, 4).is_err());
    }

    #[test]
    fn negative_presence_is_malformed() {
        for cell in [RawCell::Int(-1), RawCell::Float(-2.0), text("-1")] {
            let err = presence_flag(&cell, 3, 4).unwrap_err();
            assert!(matches!(err, AttendanceError::MalformedSheet(_)));
        }
        let mut grid = sample_grid();
        grid[4][4] = RawCell::Int(-1);
        assert!(matches!(
            build(&grid, &config()).unwrap_err(),
            AttendanceError::MalformedSheet(_)
        ));
    }

    #[test]
    fn duplicate_future_dates_are_ignored() {
        let mut grid = sample_grid();
        grid[2].push(text("2024-10-24"));
        let matrix = build(&grid, &config()).unwrap();
        assert_eq!(matrix.sessions().len(), 3);
        assert_eq!(matrix.sessions()[2].date, ymd(2024, 10, 17));
    }
}
