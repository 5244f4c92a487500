use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// A single cell as handed over by a loader.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Integer(value) => write!(f, "{value}"),
            CellValue::Float(value) => write!(f, "{value}"),
            CellValue::Date(value) => write!(f, "{value}"),
            CellValue::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    cells: HashMap<String, CellValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: CellValue) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.cells.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }
}

/// Rows in chronological order plus the header they were read with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|name| name == column)
    }
}

/// X coordinate of a series point: a calendar day, or a plain day number
/// when the source only carries an ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum SeriesDate {
    Calendar(NaiveDate),
    Ordinal(i64),
}

impl fmt::Display for SeriesDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesDate::Calendar(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            SeriesDate::Ordinal(day) => write!(f, "{day}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: SeriesDate,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TimeSeries {
    points: Vec<SeriesPoint>,
}

impl TimeSeries {
    pub fn new(points: Vec<SeriesPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.value).collect()
    }

    pub fn dates(&self) -> Vec<SeriesDate> {
        self.points.iter().map(|point| point.date).collect()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn max_value(&self) -> Option<f64> {
        self.points.iter().map(|point| point.value).reduce(f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub total: TimeSeries,
    pub success: TimeSeries,
    pub failure: TimeSeries,
}

/// Success and failure percentages of the most recent day; they always add
/// up to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuccessSplit {
    pub success_pct: f64,
    pub failure_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySeries {
    pub column: String,
    pub series: TimeSeries,
}

/// Per-category failure series, kept in source column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CategorySeriesMap {
    entries: Vec<CategorySeries>,
}

impl CategorySeriesMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, series: TimeSeries) {
        let column = column.into();
        match self.entries.iter_mut().find(|entry| entry.column == column) {
            Some(entry) => entry.series = series,
            None => self.entries.push(CategorySeries { column, series }),
        }
    }

    pub fn get(&self, column: &str) -> Option<&TimeSeries> {
        self.entries
            .iter()
            .find(|entry| entry.column == column)
            .map(|entry| &entry.series)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.column.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategorySeries> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Column names the dashboard reads from the daily test sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    pub date: String,
    pub total: String,
    pub success: String,
    pub failure: String,
    pub rate: String,
    pub marker: String,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            date: "Date".to_string(),
            total: "シナリオテスト総計：シナリオ総数".to_string(),
            success: "シナリオテスト総計：OK".to_string(),
            failure: "シナリオテスト総計：NG".to_string(),
            rate: "Success Rate (%)".to_string(),
            marker: "NG".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: i64, value: f64) -> SeriesPoint {
        SeriesPoint {
            date: SeriesDate::Ordinal(day),
            value,
        }
    }

    #[test]
    fn category_map_keeps_insertion_order() {
        let mut map = CategorySeriesMap::new();
        map.insert("Suite_B_NG", TimeSeries::new(vec![point(1, 1.0)]));
        map.insert("Suite_A_NG", TimeSeries::new(vec![point(1, 2.0)]));

        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["Suite_B_NG", "Suite_A_NG"]);
    }

    #[test]
    fn category_map_replaces_existing_column() {
        let mut map = CategorySeriesMap::new();
        map.insert("Suite_A_NG", TimeSeries::new(vec![point(1, 1.0)]));
        map.insert("Suite_A_NG", TimeSeries::new(vec![point(1, 4.0)]));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("Suite_A_NG").map(|s| s.values()), Some(vec![4.0]));
    }

    #[test]
    fn series_dates_display_like_the_sheet() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(SeriesDate::Calendar(date).to_string(), "2024-01-02");
        assert_eq!(SeriesDate::Ordinal(45292).to_string(), "45292");
    }

    #[test]
    fn max_value_of_empty_series_is_none() {
        assert_eq!(TimeSeries::default().max_value(), None);
        let series = TimeSeries::new(vec![point(1, 3.0), point(2, 7.0), point(3, 5.0)]);
        assert_eq!(series.max_value(), Some(7.0));
    }
}
