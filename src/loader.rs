use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::models::{CellValue, Dataset, Record};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("header row is empty")]
    EmptyHeader,

    #[error("column `{0}` appears more than once in the header")]
    DuplicateColumn(String),

    #[error("row {row} has {found} cells, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

pub fn load_csv(path: &Path) -> Result<Dataset, LoadError> {
    let file = std::fs::File::open(path)?;
    let dataset = read_csv(file)?;
    info!(
        path = %path.display(),
        rows = dataset.len(),
        columns = dataset.columns().len(),
        "loaded daily test sheet"
    );
    Ok(dataset)
}

/// Reads a header row followed by one record per day. Cells are trimmed and
/// typed on a best-effort basis; anything that is not a number or a date
/// stays text so the extractor can report it.
pub fn read_csv<R: Read>(input: R) -> Result<Dataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if columns.iter().all(|column| column.is_empty()) {
        return Err(LoadError::EmptyHeader);
    }

    let mut seen = HashSet::new();
    for column in &columns {
        if !seen.insert(column.as_str()) {
            return Err(LoadError::DuplicateColumn(column.clone()));
        }
    }

    let mut rows = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() != columns.len() {
            return Err(LoadError::RaggedRow {
                row,
                expected: columns.len(),
                found: record.len(),
            });
        }

        let mut cells = Record::new();
        for (column, raw) in columns.iter().zip(record.iter()) {
            cells.insert(column.clone(), parse_cell(raw));
        }
        rows.push(cells);
    }

    Ok(Dataset::new(columns, rows))
}

pub fn parse_cell(raw: &str) -> CellValue {
    let raw = raw.trim();
    if raw.is_empty() {
        return CellValue::Empty;
    }
    if let Ok(value) = raw.parse::<i64>() {
        return CellValue::Integer(value);
    }
    if let Ok(value) = raw.parse::<f64>() {
        return CellValue::Float(value);
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return CellValue::Date(date);
        }
    }
    CellValue::Text(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "\
Date, Total , OK,NG,Success Rate (%),Login_NG
2024-01-01,10,8,2,80.0,1
2024-01-02, 12 ,9,3,75.0,2
";

    #[test]
    fn reads_header_and_typed_cells() {
        let dataset = read_csv(SHEET.as_bytes()).unwrap();

        assert_eq!(
            dataset.columns(),
            ["Date", "Total", "OK", "NG", "Success Rate (%)", "Login_NG"]
        );
        assert_eq!(dataset.len(), 2);

        let second = &dataset.rows()[1];
        assert_eq!(second.get("Total"), Some(&CellValue::Integer(12)));
        assert_eq!(second.get("Success Rate (%)"), Some(&CellValue::Float(75.0)));
        assert_eq!(
            second.get("Date"),
            Some(&CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()))
        );
    }

    #[test]
    fn unparsed_cells_stay_text() {
        let dataset = read_csv("Date,OK\n2024-01-01,N/A\n2024-01-02,\n".as_bytes()).unwrap();

        assert_eq!(
            dataset.rows()[0].get("OK"),
            Some(&CellValue::Text("N/A".to_string()))
        );
        assert_eq!(dataset.rows()[1].get("OK"), Some(&CellValue::Empty));
    }

    #[test]
    fn header_only_file_is_empty_dataset() {
        let dataset = read_csv("Date,Total\n".as_bytes()).unwrap();
        assert!(dataset.is_empty());
        assert!(dataset.has_column("Total"));
    }

    #[test]
    fn ragged_row_is_rejected() {
        let err = read_csv("Date,Total\n2024-01-01,1\n2024-01-02\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn duplicate_header_is_rejected() {
        let err = read_csv("Date,NG,NG\n2024-01-01,1,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateColumn(column) if column == "NG"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_csv(Path::new("/nonexistent/daily_test.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn cells_parse_in_priority_order() {
        assert_eq!(parse_cell("42"), CellValue::Integer(42));
        assert_eq!(parse_cell("-3"), CellValue::Integer(-3));
        assert_eq!(parse_cell("4.5"), CellValue::Float(4.5));
        assert_eq!(
            parse_cell("2024/02/29"),
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert_eq!(parse_cell("  "), CellValue::Empty);
        assert_eq!(parse_cell("skipped"), CellValue::Text("skipped".to_string()));
    }
}
