use crate::error::{AttendanceError, Result};
use crate::models::{
    AttendanceSummary, RosterMatrix, Session, SessionSummary, Severity, StatusBand, Student,
};

pub const GROUP_MAJORITY_ATTENDS: &str = "majority of students attend";
pub const GROUP_MAJORITY_ABSENT: &str = "majority of students do not attend";
pub const GROUP_NOT_ATTENDING: &str = "students do not attend";

pub const STUDENT_GOOD: &str = "student attends well";
pub const STUDENT_FAIR: &str = "student attends satisfactorily";
pub const STUDENT_RARE: &str = "student rarely attends";
pub const STUDENT_ABSENT: &str = "student practically does not attend";

/// `part / whole * 100`; an empty denominator names what was missing.
pub fn percentage(part: usize, whole: usize, missing: &'static str) -> Result<f64> {
    if whole == 0 {
        return Err(AttendanceError::DivisionUndefined(missing));
    }
    Ok(part as f64 / whole as f64 * 100.0)
}

/// Banding for a session or whole-group percentage: three labels, two severities.
pub fn group_status(percentage: f64) -> StatusBand {
    match percentage {
        p if p >= 50.0 => StatusBand {
            label: GROUP_MAJORITY_ATTENDS,
            severity: Severity::Good,
        },
        p if p >= 25.0 => StatusBand {
            label: GROUP_MAJORITY_ABSENT,
            severity: Severity::Poor,
        },
        _ => StatusBand {
            label: GROUP_NOT_ATTENDING,
            severity: Severity::Poor,
        },
    }
}

/// Banding for one student's percentage: four labels, three severities.
pub fn student_status(percentage: f64) -> StatusBand {
    match percentage {
        p if p >= 75.0 => StatusBand {
            label: STUDENT_GOOD,
            severity: Severity::Good,
        },
        p if p >= 50.0 => StatusBand {
            label: STUDENT_FAIR,
            severity: Severity::Fair,
        },
        p if p >= 25.0 => StatusBand {
            label: STUDENT_RARE,
            severity: Severity::Poor,
        },
        _ => StatusBand {
            label: STUDENT_ABSENT,
            severity: Severity::Poor,
        },
    }
}

pub fn session_attendance(matrix: &RosterMatrix, session: &Session) -> Result<SessionSummary> {
    let column = session.ordinal.checked_sub(1).ok_or_else(|| {
        AttendanceError::SessionNotFound(format!("ordinal {}", session.ordinal))
    })?;
    if matrix.sessions().get(column) != Some(session) {
        return Err(AttendanceError::SessionNotFound(format!(
            "ordinal {} on {}",
            session.ordinal, session.date
        )));
    }

    let total_students = matrix.students().len();
    let present_count = matrix
        .students()
        .iter()
        .filter(|student| student.presence.get(column).copied().unwrap_or(false))
        .count();
    let attendance_percentage = percentage(present_count, total_students, "students")?;

    Ok(SessionSummary {
        total_students,
        present_count,
        attendance_percentage,
        status: group_status(attendance_percentage),
    })
}

pub fn student_attendance(matrix: &RosterMatrix, student: &Student) -> Result<AttendanceSummary> {
    let total_sessions = matrix.sessions().len();
    let attendance_count = student.attended();
    let attendance_percentage = percentage(attendance_count, total_sessions, "sessions")?;

    Ok(AttendanceSummary {
        attendance_count,
        total_sessions,
        attendance_percentage,
        status: student_status(attendance_percentage),
    })
}

/// Flattened ratio of present cells over the whole student x session matrix.
pub fn full_roster_attendance(matrix: &RosterMatrix) -> Result<SessionSummary> {
    let total_students = matrix.students().len();
    let total_sessions = matrix.sessions().len();
    if total_students == 0 {
        return Err(AttendanceError::DivisionUndefined("students"));
    }
    let present_count = matrix.present_cells();
    let attendance_percentage =
        percentage(present_count, total_students * total_sessions, "sessions")?;

    Ok(SessionSummary {
        total_students,
        present_count,
        attendance_percentage,
        status: group_status(attendance_percentage),
    })
}
