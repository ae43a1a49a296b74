use anyhow::Context;
use clap::Parser;
use roster_attendance::config::{Commands, Settings};
use roster_attendance::models::RosterMatrix;
use roster_attendance::report::{self, Report};
use roster_attendance::sink::{self, FileSink};
use roster_attendance::{roster, sheet};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn setup_logging(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn load_matrix(settings: &Settings) -> anyhow::Result<RosterMatrix> {
    let grid = sheet::open_source(&settings.file, settings.sheet_index)
        .read_grid()
        .with_context(|| format!("failed to read {}", settings.file.display()))?;
    let matrix = roster::build(&grid, &settings.roster_config())
        .context("attendance sheet does not match the expected layout")?;
    Ok(matrix)
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();
    setup_logging(&settings.log_level);

    let report = match &settings.command {
        Commands::Sheets => {
            let names = sheet::sheet_names(&settings.file)
                .with_context(|| format!("failed to open workbook {}", settings.file.display()))?;
            for (index, name) in names.iter().enumerate() {
                println!("{index}: {name}");
            }
            return Ok(());
        }
        Commands::Student { .. } => {
            let student_ref = settings
                .command
                .student_ref()
                .context("a student --index or --number is required")?;
            let matrix = load_matrix(&settings)?;
            Report::Student(report::assemble_student_report(&matrix, student_ref)?)
        }
        Commands::Session { .. } => {
            let session_ref = settings
                .command
                .session_ref()
                .context("a session --ordinal or --date is required")?;
            let matrix = load_matrix(&settings)?;
            Report::Session(report::assemble_session_report(&matrix, session_ref)?)
        }
        Commands::Roster => {
            let matrix = load_matrix(&settings)?;
            Report::Roster(report::assemble_roster_report(&matrix)?)
        }
    };

    if settings.print {
        print!("{report}");
    }

    let mut sink = FileSink::new(&settings.out_dir, settings.formats.clone());
    let written = sink::write_report(&mut sink, &report, settings.out_name.as_deref())?;
    for path in written {
        println!("Report written to {}.", path.display());
    }

    Ok(())
}
