use std::fmt::Write;
use std::path::PathBuf;

use clap::ValueEnum;
use tracing::info;

use crate::error::Result;
use crate::models::StatusBand;
use crate::report::{Report, RosterReport, SessionReport, StudentReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Json,
    Html,
    Text,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
            ReportFormat::Text => "txt",
        }
    }
}

/// Persists a finished report under a destination name.
pub trait ReportSink {
    fn accept(&mut self, report: &Report, destination: &str) -> Result<Vec<PathBuf>>;
}

/// Writes one file per requested format into a directory.
pub struct FileSink {
    out_dir: PathBuf,
    formats: Vec<ReportFormat>,
}

impl FileSink {
    pub fn new(out_dir: impl Into<PathBuf>, formats: Vec<ReportFormat>) -> Self {
        Self {
            out_dir: out_dir.into(),
            formats,
        }
    }

    fn render(report: &Report, format: ReportFormat) -> Result<String> {
        Ok(match format {
            ReportFormat::Json => serde_json::to_string_pretty(report)?,
            ReportFormat::Html => render_html(report),
            ReportFormat::Text => report.to_string(),
        })
    }
}

impl ReportSink for FileSink {
    fn accept(&mut self, report: &Report, destination: &str) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.out_dir)?;
        let mut written = Vec::new();
        for format in &self.formats {
            let path = self
                .out_dir
                .join(format!("{destination}.{}", format.extension()));
            std::fs::write(&path, Self::render(report, *format)?)?;
            info!(group = report.group(), path = %path.display(), "report written");
            written.push(path);
        }
        Ok(written)
    }
}

pub fn render_html(report: &Report) -> String {
    let mut output = String::new();
    match report {
        Report::Student(report) => student_html(&mut output, report),
        Report::Session(report) => session_html(&mut output, report),
        Report::Roster(report) => roster_html(&mut output, report),
    }
    output
}

fn student_html(output: &mut String, report: &StudentReport) {
    let summary = &report.summary;
    let _ = writeln!(output, "<h1>Student attendance report</h1>");
    let _ = writeln!(output, "<h2>Group: {}</h2>", escape(&report.group));
    let _ = writeln!(output, "<h3>Total students: {}</h3>", report.total_students);
    let _ = writeln!(output, "<h3>Student: {}</h3>", escape(&report.fio));
    let _ = writeln!(
        output,
        "<h3>Attended {} of {} sessions ({:.2}%)</h3>",
        summary.attendance_count, summary.total_sessions, summary.attendance_percentage
    );
    status_line(output, &summary.status);

    let _ = writeln!(output, "<table>");
    let _ = writeln!(output, "<tr><th>Date</th><th>Present</th></tr>");
    for entry in &report.attendance {
        let _ = writeln!(
            output,
            "<tr><td>{}</td><td>{}</td></tr>",
            entry.date,
            u8::from(entry.present)
        );
    }
    let _ = writeln!(output, "</table>");
}

fn session_html(output: &mut String, report: &SessionReport) {
    let summary = &report.summary;
    let _ = writeln!(output, "<h1>Session attendance report</h1>");
    let _ = writeln!(output, "<h2>Group: {}</h2>", escape(&report.group));
    let _ = writeln!(output, "<h3>Total students: {}</h3>", summary.total_students);
    let _ = writeln!(
        output,
        "<h4>Attendance on {}: {} of {} ({:.2}%)</h4>",
        report.session.date, summary.present_count, summary.total_students, summary.attendance_percentage
    );
    status_line(output, &summary.status);

    let _ = writeln!(output, "<table>");
    let _ = writeln!(
        output,
        "<tr><th>No.</th><th>Surname</th><th>Name</th><th>Patronymic</th><th>{}</th></tr>",
        report.session.date
    );
    for student in &report.students {
        let _ = writeln!(
            output,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            student.sequence_number,
            escape(&student.last_name),
            escape(&student.first_name),
            escape(&student.patronymic),
            u8::from(student.present)
        );
    }
    let _ = writeln!(output, "</table>");
}

fn roster_html(output: &mut String, report: &RosterReport) {
    let summary = &report.summary;
    let _ = writeln!(output, "<h1>Group attendance report</h1>");
    let _ = writeln!(output, "<h2>Group: {}</h2>", escape(&report.group));
    let _ = writeln!(output, "<h3>Total students: {}</h3>", summary.total_students);
    let _ = writeln!(
        output,
        "<h4>Overall attendance: {:.2}%</h4>",
        summary.attendance_percentage
    );
    status_line(output, &summary.status);

    let _ = writeln!(output, "<table>");
    let _ = write!(output, "<tr><th>No.</th><th>Surname</th><th>Name</th><th>Patronymic</th>");
    for session in &report.sessions {
        let _ = write!(output, "<th>{}</th>", session.date);
    }
    let _ = writeln!(output, "</tr>");
    for row in &report.students {
        let _ = write!(
            output,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
            row.sequence_number,
            escape(&row.last_name),
            escape(&row.first_name),
            escape(&row.patronymic)
        );
        for present in &row.presence {
            let _ = write!(output, "<td>{}</td>", u8::from(*present));
        }
        let _ = writeln!(output, "</tr>");
    }
    let _ = writeln!(output, "</table>");
}

fn status_line(output: &mut String, status: &StatusBand) {
    let _ = writeln!(
        output,
        "<h4>Assessment: <span style='color:{}'>{}</span></h4>",
        status.severity.color(),
        status.label
    );
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn write_report(sink: &mut dyn ReportSink, report: &Report, out_name: Option<&str>) -> Result<Vec<PathBuf>> {
    let destination = out_name
        .map(str::to_string)
        .unwrap_or_else(|| report.default_destination());
    sink.accept(report, &destination)
}
