use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

/// One cell of the raw sheet grid, as handed over by a `SheetSource`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDateTime),
}

impl RawCell {
    pub fn is_blank(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric value of the cell, accepting numeric text.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawCell::Int(n) => Some(*n as f64),
            RawCell::Float(n) => Some(*n),
            RawCell::Text(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Int(n) => n.to_string(),
            RawCell::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            RawCell::Float(n) => n.to_string(),
            RawCell::Bool(b) => b.to_string(),
            RawCell::Text(text) => text.trim().to_string(),
            RawCell::Date(dt) => dt.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub date: NaiveDate,
    /// 1-based position among active sessions.
    pub ordinal: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    pub sequence_number: i64,
    pub last_name: String,
    pub first_name: String,
    pub patronymic: String,
    /// One flag per active session, aligned by ordinal.
    pub presence: Vec<bool>,
}

impl Student {
    /// Surname, given name and patronymic joined by spaces.
    pub fn fio(&self) -> String {
        let parts = [
            self.last_name.as_str(),
            self.first_name.as_str(),
            self.patronymic.as_str(),
        ];
        parts
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn attended(&self) -> usize {
        self.presence.iter().filter(|present| **present).count()
    }
}

/// Immutable student/session matrix for one sheet load.
#[derive(Debug, Clone, Serialize)]
pub struct RosterMatrix {
    group_name: String,
    sessions: Vec<Session>,
    students: Vec<Student>,
}

impl RosterMatrix {
    /// Assembles a matrix, padding or truncating presence rows to the session count.
    pub fn new(group_name: String, sessions: Vec<Session>, mut students: Vec<Student>) -> Self {
        for student in students.iter_mut() {
            student.presence.resize(sessions.len(), false);
        }
        Self {
            group_name,
            sessions,
            students,
        }
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Students in sheet order.
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    /// Students ordered by declared sequence number; ties keep sheet order.
    pub fn students_by_sequence(&self) -> Vec<&Student> {
        let mut sorted: Vec<&Student> = self.students.iter().collect();
        sorted.sort_by_key(|student| student.sequence_number);
        sorted
    }

    pub fn present_cells(&self) -> usize {
        self.students.iter().map(Student::attended).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Good,
    Fair,
    Poor,
}

impl Severity {
    pub fn color(self) -> &'static str {
        match self {
            Severity::Good => "green",
            Severity::Fair => "orange",
            Severity::Poor => "red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusBand {
    pub label: &'static str,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub attendance_count: usize,
    pub total_sessions: usize,
    #[serde(serialize_with = "two_decimals")]
    pub attendance_percentage: f64,
    pub status: StatusBand,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub total_students: usize,
    /// Present flags counted; for a whole-roster summary this spans every session.
    pub present_count: usize,
    #[serde(serialize_with = "two_decimals")]
    pub attendance_percentage: f64,
    pub status: StatusBand,
}

fn two_decimals<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((value * 100.0).round() / 100.0)
}
