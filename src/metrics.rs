use chrono::NaiveDate;
use tracing::debug;

use crate::models::{
    CategorySeriesMap, CellValue, Dataset, Record, SeriesDate, SeriesPoint, SuccessSplit,
    TimeSeries, Totals,
};

pub const DATE_COLUMN: &str = "Date";

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractError {
    #[error("missing column `{column}`")]
    MissingColumn { column: String },

    #[error("row {row}, column `{column}`: cannot parse `{value}`")]
    MalformedValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("dataset has no rows")]
    EmptyDataset,

    #[error("row {row}, column `{column}`: {value} is outside [{min}, {max}]")]
    OutOfRange {
        row: usize,
        column: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Total, success and failure counts per day, using the `Date` column for
/// the x axis.
pub fn extract_totals(
    dataset: &Dataset,
    total_col: &str,
    success_col: &str,
    failure_col: &str,
) -> Result<Totals, ExtractError> {
    extract_totals_with_date(dataset, DATE_COLUMN, total_col, success_col, failure_col)
}

pub fn extract_totals_with_date(
    dataset: &Dataset,
    date_col: &str,
    total_col: &str,
    success_col: &str,
    failure_col: &str,
) -> Result<Totals, ExtractError> {
    require_rows(dataset)?;
    for column in [date_col, total_col, success_col, failure_col] {
        require_column(dataset, column)?;
    }

    let dates = extract_dates(dataset, date_col)?;
    let totals = Totals {
        total: count_series(dataset, &dates, total_col)?,
        success: count_series(dataset, &dates, success_col)?,
        failure: count_series(dataset, &dates, failure_col)?,
    };

    debug!(rows = dataset.len(), "extracted daily totals");
    Ok(totals)
}

/// Success/failure percentages of the last row. The rate is rejected rather
/// than clamped when it falls outside 0..=100.
pub fn extract_latest_split(dataset: &Dataset, rate_col: &str) -> Result<SuccessSplit, ExtractError> {
    let row = dataset.len().checked_sub(1).ok_or(ExtractError::EmptyDataset)?;
    require_column(dataset, rate_col)?;

    let success_pct = numeric_cell(&dataset.rows()[row], row, rate_col)?;
    if !(0.0..=100.0).contains(&success_pct) {
        return Err(ExtractError::OutOfRange {
            row,
            column: rate_col.to_string(),
            value: success_pct,
            min: 0.0,
            max: 100.0,
        });
    }

    Ok(SuccessSplit {
        success_pct,
        failure_pct: 100.0 - success_pct,
    })
}

/// One series per column whose name contains `marker`, skipping the
/// aggregate `excluded_col`. No matching column yields an empty map.
pub fn extract_category_series(
    dataset: &Dataset,
    marker: &str,
    excluded_col: &str,
) -> Result<CategorySeriesMap, ExtractError> {
    extract_category_series_with_date(dataset, DATE_COLUMN, marker, excluded_col)
}

pub fn extract_category_series_with_date(
    dataset: &Dataset,
    date_col: &str,
    marker: &str,
    excluded_col: &str,
) -> Result<CategorySeriesMap, ExtractError> {
    require_rows(dataset)?;

    let columns: Vec<&String> = dataset
        .columns()
        .iter()
        .filter(|column| column.contains(marker) && column.as_str() != excluded_col)
        .collect();

    let mut map = CategorySeriesMap::new();
    if columns.is_empty() {
        debug!(marker, "no category columns matched");
        return Ok(map);
    }

    require_column(dataset, date_col)?;
    let dates = extract_dates(dataset, date_col)?;
    for column in columns {
        map.insert(column.clone(), count_series(dataset, &dates, column)?);
    }

    debug!(marker, categories = map.len(), "extracted category series");
    Ok(map)
}

fn require_rows(dataset: &Dataset) -> Result<(), ExtractError> {
    if dataset.is_empty() {
        return Err(ExtractError::EmptyDataset);
    }
    Ok(())
}

fn require_column(dataset: &Dataset, column: &str) -> Result<(), ExtractError> {
    if !dataset.has_column(column) {
        return Err(ExtractError::MissingColumn {
            column: column.to_string(),
        });
    }
    Ok(())
}

fn extract_dates(dataset: &Dataset, column: &str) -> Result<Vec<SeriesDate>, ExtractError> {
    dataset
        .rows()
        .iter()
        .enumerate()
        .map(|(row, record)| date_cell(record, row, column))
        .collect()
}

fn count_series(
    dataset: &Dataset,
    dates: &[SeriesDate],
    column: &str,
) -> Result<TimeSeries, ExtractError> {
    let mut points = Vec::with_capacity(dataset.len());
    for (row, (record, date)) in dataset.rows().iter().zip(dates).enumerate() {
        let value = numeric_cell(record, row, column)?;
        if value < 0.0 {
            return Err(ExtractError::OutOfRange {
                row,
                column: column.to_string(),
                value,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        points.push(SeriesPoint { date: *date, value });
    }
    Ok(TimeSeries::new(points))
}

fn numeric_cell(record: &Record, row: usize, column: &str) -> Result<f64, ExtractError> {
    let parsed = match record.get(column) {
        Some(CellValue::Integer(value)) => Some(*value as f64),
        Some(CellValue::Float(value)) => Some(*value),
        Some(CellValue::Text(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|value| value.is_finite())
        .ok_or_else(|| malformed(record, row, column))
}

fn date_cell(record: &Record, row: usize, column: &str) -> Result<SeriesDate, ExtractError> {
    match record.get(column) {
        Some(CellValue::Date(date)) => Ok(SeriesDate::Calendar(*date)),
        Some(CellValue::Integer(day)) => Ok(SeriesDate::Ordinal(*day)),
        Some(CellValue::Text(text)) => {
            parse_date(text.trim()).ok_or_else(|| malformed(record, row, column))
        }
        _ => Err(malformed(record, row, column)),
    }
}

fn parse_date(text: &str) -> Option<SeriesDate> {
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
    {
        return Some(SeriesDate::Calendar(date));
    }
    text.parse::<i64>().ok().map(SeriesDate::Ordinal)
}

fn malformed(record: &Record, row: usize, column: &str) -> ExtractError {
    ExtractError::MalformedValue {
        row,
        column: column.to_string(),
        value: record.get(column).map(|cell| cell.to_string()).unwrap_or_default(),
    }
}
