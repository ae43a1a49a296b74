use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::error::{AttendanceError, Result};
use crate::models::{AttendanceSummary, RosterMatrix, Session, SessionSummary, Student};
use crate::stats;

/// How a caller names the student a report is about.
#[derive(Debug, Clone, Copy)]
pub enum StudentRef<'a> {
    /// 0-based position after ordering the roster by sequence number.
    Position(usize),
    /// Declared sequence number as written in the sheet.
    Number(i64),
    Direct(&'a Student),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRef {
    Date(NaiveDate),
    /// 1-based session ordinal.
    Ordinal(usize),
}

#[derive(Debug, Clone, Serialize)]
pub struct PresenceEntry {
    pub date: NaiveDate,
    pub present: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentReport {
    pub group: String,
    pub total_students: usize,
    pub sequence_number: i64,
    pub last_name: String,
    pub fio: String,
    #[serde(flatten)]
    pub summary: AttendanceSummary,
    pub attendance: Vec<PresenceEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentPresence {
    pub sequence_number: i64,
    pub last_name: String,
    pub first_name: String,
    pub patronymic: String,
    pub present: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub group: String,
    pub session: Session,
    #[serde(flatten)]
    pub summary: SessionSummary,
    pub students: Vec<StudentPresence>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterRow {
    pub sequence_number: i64,
    pub last_name: String,
    pub first_name: String,
    pub patronymic: String,
    pub presence: Vec<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterReport {
    pub group: String,
    pub sessions: Vec<Session>,
    #[serde(flatten)]
    pub summary: SessionSummary,
    pub students: Vec<RosterRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Report {
    Student(StudentReport),
    Session(SessionReport),
    Roster(RosterReport),
}

impl Report {
    /// File stem a sink uses when the caller does not pick one.
    pub fn default_destination(&self) -> String {
        let stem = match self {
            Report::Student(report) => format!("student_{}_{}", report.last_name, report.group),
            Report::Session(report) => format!("session_{}_{}", report.group, report.session.date),
            Report::Roster(report) => format!("roster_{}", report.group),
        };
        stem.chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_whitespace() => '_',
                c => c,
            })
            .collect()
    }

    pub fn group(&self) -> &str {
        match self {
            Report::Student(report) => &report.group,
            Report::Session(report) => &report.group,
            Report::Roster(report) => &report.group,
        }
    }
}

pub fn resolve_student<'a>(matrix: &'a RosterMatrix, student_ref: StudentRef<'a>) -> Result<&'a Student> {
    match student_ref {
        StudentRef::Position(index) => matrix
            .students_by_sequence()
            .get(index)
            .copied()
            .ok_or_else(|| {
                AttendanceError::StudentNotFound(format!(
                    "position {index} is outside a roster of {}",
                    matrix.students().len()
                ))
            }),
        StudentRef::Number(number) => matrix
            .students()
            .iter()
            .find(|student| student.sequence_number == number)
            .ok_or_else(|| AttendanceError::StudentNotFound(format!("sequence number {number}"))),
        StudentRef::Direct(student) => matrix
            .students()
            .iter()
            .find(|candidate| *candidate == student)
            .ok_or_else(|| AttendanceError::StudentNotFound(student.fio())),
    }
}

pub fn resolve_session(matrix: &RosterMatrix, session_ref: SessionRef) -> Result<&Session> {
    match session_ref {
        SessionRef::Date(date) => matrix
            .sessions()
            .iter()
            .find(|session| session.date == date)
            .ok_or_else(|| AttendanceError::session_date(date)),
        SessionRef::Ordinal(ordinal) => matrix
            .sessions()
            .iter()
            .find(|session| session.ordinal == ordinal)
            .ok_or_else(|| AttendanceError::SessionNotFound(format!("ordinal {ordinal}"))),
    }
}

pub fn assemble_student_report(matrix: &RosterMatrix, student_ref: StudentRef<'_>) -> Result<StudentReport> {
    let student = resolve_student(matrix, student_ref)?;
    let summary = stats::student_attendance(matrix, student)?;
    let attendance = matrix
        .sessions()
        .iter()
        .zip(student.presence.iter())
        .map(|(session, present)| PresenceEntry {
            date: session.date,
            present: *present,
        })
        .collect();

    info!(
        group = matrix.group_name(),
        student = student.sequence_number,
        "assembled student report"
    );
    Ok(StudentReport {
        group: matrix.group_name().to_string(),
        total_students: matrix.students().len(),
        sequence_number: student.sequence_number,
        last_name: student.last_name.clone(),
        fio: student.fio(),
        summary,
        attendance,
    })
}

pub fn assemble_session_report(matrix: &RosterMatrix, session_ref: SessionRef) -> Result<SessionReport> {
    let session = resolve_session(matrix, session_ref)?;
    let summary = stats::session_attendance(matrix, session)?;
    let column = session.ordinal - 1;
    let students = matrix
        .students()
        .iter()
        .map(|student| StudentPresence {
            sequence_number: student.sequence_number,
            last_name: student.last_name.clone(),
            first_name: student.first_name.clone(),
            patronymic: student.patronymic.clone(),
            present: student.presence.get(column).copied().unwrap_or(false),
        })
        .collect();

    info!(group = matrix.group_name(), date = %session.date, "assembled session report");
    Ok(SessionReport {
        group: matrix.group_name().to_string(),
        session: session.clone(),
        summary,
        students,
    })
}

pub fn assemble_roster_report(matrix: &RosterMatrix) -> Result<RosterReport> {
    let summary = stats::full_roster_attendance(matrix)?;
    let students = matrix
        .students()
        .iter()
        .map(|student| RosterRow {
            sequence_number: student.sequence_number,
            last_name: student.last_name.clone(),
            first_name: student.first_name.clone(),
            patronymic: student.patronymic.clone(),
            presence: student.presence.clone(),
        })
        .collect();

    info!(group = matrix.group_name(), "assembled roster report");
    Ok(RosterReport {
        group: matrix.group_name().to_string(),
        sessions: matrix.sessions().to_vec(),
        summary,
        students,
    })
}

fn mark(present: bool) -> &'static str {
    if present {
        "present"
    } else {
        "absent"
    }
}

impl fmt::Display for StudentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Student Attendance Report")?;
        writeln!(f, "Group: {} ({} students)", self.group, self.total_students)?;
        writeln!(f, "Student: {} (No. {})", self.fio, self.sequence_number)?;
        writeln!(
            f,
            "Attended {} of {} sessions ({:.2}%)",
            self.summary.attendance_count, self.summary.total_sessions, self.summary.attendance_percentage
        )?;
        writeln!(f, "Status: {}", self.summary.status.label)?;
        writeln!(f)?;
        writeln!(f, "## Sessions")?;
        for entry in &self.attendance {
            writeln!(f, "- {}: {}", entry.date, mark(entry.present))?;
        }
        Ok(())
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Session Attendance Report")?;
        writeln!(f, "Group: {} ({} students)", self.group, self.summary.total_students)?;
        writeln!(
            f,
            "Session {} on {}: {} of {} present ({:.2}%)",
            self.session.ordinal,
            self.session.date,
            self.summary.present_count,
            self.summary.total_students,
            self.summary.attendance_percentage
        )?;
        writeln!(f, "Status: {}", self.summary.status.label)?;
        writeln!(f)?;
        writeln!(f, "## Students")?;
        for student in &self.students {
            writeln!(
                f,
                "- {}. {} {} {}: {}",
                student.sequence_number,
                student.last_name,
                student.first_name,
                student.patronymic,
                mark(student.present)
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for RosterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Group Attendance Report")?;
        writeln!(f, "Group: {} ({} students)", self.group, self.summary.total_students)?;
        writeln!(
            f,
            "Overall attendance across {} sessions: {:.2}%",
            self.sessions.len(),
            self.summary.attendance_percentage
        )?;
        writeln!(f, "Status: {}", self.summary.status.label)?;
        writeln!(f)?;
        writeln!(f, "## Students")?;
        for row in &self.students {
            let flags: String = row.presence.iter().map(|p| if *p { '1' } else { '0' }).collect();
            writeln!(
                f,
                "- {}. {} {} {}: {}",
                row.sequence_number, row.last_name, row.first_name, row.patronymic, flags
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Student(report) => report.fmt(f),
            Report::Session(report) => report.fmt(f),
            Report::Roster(report) => report.fmt(f),
        }
    }
}
