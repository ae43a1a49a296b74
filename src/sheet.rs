use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::{debug, info};

use crate::error::{AttendanceError, Result};
use crate::models::RawCell;

/// Anything that can hand over a sheet as a positional grid of raw cells.
pub trait SheetSource {
    fn read_grid(&mut self) -> Result<Vec<Vec<RawCell>>>;
}

/// One worksheet of an Excel/ODS workbook, picked by 0-based index.
pub struct XlsxSource {
    path: PathBuf,
    sheet_index: usize,
}

impl XlsxSource {
    pub fn new(path: impl Into<PathBuf>, sheet_index: usize) -> Self {
        Self {
            path: path.into(),
            sheet_index,
        }
    }
}

impl SheetSource for XlsxSource {
    fn read_grid(&mut self) -> Result<Vec<Vec<RawCell>>> {
        let mut workbook = open_workbook_auto(&self.path).map_err(|e| read_error(&self.path, e))?;
        let names = workbook.sheet_names().to_vec();
        let sheet_name = names.get(self.sheet_index).ok_or_else(|| {
            AttendanceError::MalformedSheet(format!(
                "sheet index {} is out of range; workbook has {} sheets",
                self.sheet_index,
                names.len()
            ))
        })?;
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| read_error(&self.path, e))?;

        let grid = anchored_grid(&range);

        info!(
            path = %self.path.display(),
            sheet = %sheet_name,
            rows = grid.len(),
            "read worksheet"
        );
        Ok(grid)
    }
}

/// Re-anchors a used range at A1 so positional offsets hold.
fn anchored_grid(range: &Range<Data>) -> Vec<Vec<RawCell>> {
    let (row_offset, col_offset) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));
    let mut grid: Vec<Vec<RawCell>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![RawCell::Empty; col_offset];
        cells.extend(row.iter().map(raw_cell));
        grid.push(cells);
    }
    grid
}

fn raw_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Float(n) => RawCell::Float(*n),
        Data::Int(n) => RawCell::Int(*n),
        Data::Bool(b) => RawCell::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(RawCell::Date)
            .unwrap_or(RawCell::Float(dt.as_f64())),
        Data::DateTimeIso(s) => RawCell::Text(s.clone()),
        Data::DurationIso(s) => RawCell::Text(s.clone()),
        Data::Error(e) => {
            debug!(error = ?e, "treating spreadsheet error cell as blank");
            RawCell::Empty
        }
    }
}

/// Header-less CSV laid out exactly like the worksheet. Fully empty lines are
/// skipped by the reader, so spacer rows must be kept as `,,,`.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SheetSource for CsvSource {
    fn read_grid(&mut self) -> Result<Vec<Vec<RawCell>>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| read_error(&self.path, e))?;

        let mut grid = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| read_error(&self.path, e))?;
            grid.push(record.iter().map(classify_field).collect());
        }

        info!(path = %self.path.display(), rows = grid.len(), "read csv sheet");
        Ok(grid)
    }
}

fn classify_field(field: &str) -> RawCell {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        RawCell::Empty
    } else if let Ok(n) = trimmed.parse::<i64>() {
        RawCell::Int(n)
    } else if let Ok(n) = trimmed.parse::<f64>() {
        RawCell::Float(n)
    } else {
        RawCell::Text(field.to_string())
    }
}

/// Picks a source by extension: `.csv` is read as CSV, everything else as a workbook.
pub fn open_source(path: &Path, sheet_index: usize) -> Box<dyn SheetSource> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        Box::new(CsvSource::new(path))
    } else {
        Box::new(XlsxSource::new(path, sheet_index))
    }
}

pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
    let workbook = open_workbook_auto(path).map_err(|e| read_error(path, e))?;
    Ok(workbook.sheet_names().to_vec())
}

fn read_error(path: &Path, err: impl std::fmt::Display) -> AttendanceError {
    AttendanceError::SheetRead {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{build, RosterConfig};
    use calamine::{CellErrorType, ExcelDateTime, ExcelDateTimeType};
    use chrono::NaiveDate;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn csv_fields_are_classified() {
        assert_eq!(classify_field(""), RawCell::Empty);
        assert_eq!(classify_field(" 3 "), RawCell::Int(3));
        assert_eq!(classify_field("2.5"), RawCell::Float(2.5));
        assert_eq!(classify_field("Ivanov"), RawCell::Text("Ivanov".to_string()));
    }

    #[test]
    fn csv_source_feeds_the_builder() {
        let file = write_csv(
            "Group: IT-21\n\
             ,,,\n\
             No.,Surname,Name,Patronymic,1,2,2024-10-17\n\
             1,Ivanova,Anna,Olegovna,1,,1\n\
             2,Petrov,Oleg,Ivanovich,0,1\n",
        );
        let mut source = open_source(file.path(), 0);
        let grid = source.read_grid().unwrap();
        let config = RosterConfig::new(
            NaiveDate::from_ymd_opt(2024, 10, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
        );
        let matrix = build(&grid, &config).unwrap();
        assert_eq!(matrix.group_name(), "IT-21");
        assert_eq!(matrix.sessions().len(), 3);
        assert_eq!(matrix.students()[0].presence, vec![true, false, true]);
        assert_eq!(matrix.students()[1].presence, vec![false, true, false]);
    }

    #[test]
    fn workbook_cells_map_to_raw_cells() {
        let serial = ExcelDateTime::new(45568.0, ExcelDateTimeType::DateTime, false);
        let expected = NaiveDate::from_ymd_opt(2024, 10, 3)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(raw_cell(&Data::DateTime(serial)), RawCell::Date(expected));
        assert_eq!(
            raw_cell(&Data::DateTimeIso("2024-10-10T00:00:00".to_string())),
            RawCell::Text("2024-10-10T00:00:00".to_string())
        );
        assert_eq!(raw_cell(&Data::Error(CellErrorType::NA)), RawCell::Empty);
        assert_eq!(raw_cell(&Data::Float(2.0)), RawCell::Float(2.0));
        assert_eq!(raw_cell(&Data::Empty), RawCell::Empty);
    }

    #[test]
    fn offset_range_is_anchored_at_a1() {
        let mut range: Range<Data> = Range::new((1, 1), (2, 2));
        range.set_value((1, 1), Data::String("Group: IT-21".to_string()));
        range.set_value((2, 2), Data::Int(1));
        let grid = anchored_grid(&range);
        assert_eq!(grid.len(), 3);
        assert!(grid[0].is_empty());
        assert_eq!(
            grid[1],
            vec![RawCell::Empty, RawCell::Text("Group: IT-21".to_string()), RawCell::Empty]
        );
        assert_eq!(grid[2], vec![RawCell::Empty, RawCell::Empty, RawCell::Int(1)]);
    }

    #[test]
    fn empty_range_yields_empty_grid() {
        let range: Range<Data> = Range::empty();
        assert!(anchored_grid(&range).is_empty());
    }

    #[test]
    fn missing_workbook_is_a_read_error() {
        let err = XlsxSource::new("/nonexistent/roster.xlsx", 0).read_grid().unwrap_err();
        assert!(matches!(err, AttendanceError::SheetRead { .. }));
    }

    #[test]
    fn missing_csv_is_a_read_error() {
        let err = CsvSource::new("/nonexistent/roster.csv").read_grid().unwrap_err();
        assert!(matches!(err, AttendanceError::SheetRead { .. }));
    }
}
