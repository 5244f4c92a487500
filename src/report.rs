use std::fmt::Write;

use serde::Serialize;
use tracing::info;

use crate::chart;
use crate::html::escape_html;
use crate::metrics::{self, ExtractError};
use crate::models::{CategorySeriesMap, ColumnSchema, Dataset, SuccessSplit, Totals};
use crate::theme::ColorTheme;

/// Everything the dashboard page shows, detached from the source dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub totals: Totals,
    pub latest_split: SuccessSplit,
    pub categories: CategorySeriesMap,
    pub table: DataTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct PageOptions {
    pub title: String,
    pub description: String,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            title: "DAILY SCENARIO TEST REPORT".to_string(),
            description: "Dashboard for the results of daily scenario tests.".to_string(),
        }
    }
}

pub fn build_view(dataset: &Dataset, schema: &ColumnSchema) -> Result<DashboardView, ExtractError> {
    let totals = metrics::extract_totals_with_date(
        dataset,
        &schema.date,
        &schema.total,
        &schema.success,
        &schema.failure,
    )?;
    let latest_split = metrics::extract_latest_split(dataset, &schema.rate)?;
    let categories = metrics::extract_category_series_with_date(
        dataset,
        &schema.date,
        &schema.marker,
        &schema.failure,
    )?;

    info!(
        days = totals.total.len(),
        categories = categories.len(),
        success_pct = latest_split.success_pct,
        "built dashboard view"
    );

    Ok(DashboardView {
        totals,
        latest_split,
        categories,
        table: data_table(dataset),
    })
}

fn data_table(dataset: &Dataset) -> DataTable {
    let columns = dataset.columns().to_vec();
    let rows = dataset
        .rows()
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|column| record.get(column).map(|cell| cell.to_string()).unwrap_or_default())
                .collect()
        })
        .collect();
    DataTable { columns, rows }
}

pub fn render_html(view: &DashboardView, options: &PageOptions, theme: &ColorTheme) -> String {
    let mut output = String::new();

    let totals_svg = chart::totals_chart(&view.totals, "History of Daily Scenario Tests", theme);
    let donut_svg = chart::donut_chart(&view.latest_split, "Latest Success Rate", theme);
    let category_svg =
        chart::category_chart(&view.categories, "History of NG Scenario Suite", theme);

    let _ = writeln!(output, "<!DOCTYPE html>");
    let _ = writeln!(output, "<html lang=\"en\">");
    let _ = writeln!(output, "<head>");
    let _ = writeln!(output, "<meta charset=\"utf-8\"/>");
    let _ = writeln!(
        output,
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"/>"
    );
    let _ = writeln!(output, "<title>{}</title>", escape_html(&options.title));
    let _ = writeln!(
        output,
        "<link rel=\"stylesheet\" href=\"https://fonts.googleapis.com/css2?family=Open+Sans:wght@400;700&display=swap\"/>"
    );
    write_style(&mut output, theme);
    let _ = writeln!(output, "</head>");
    let _ = writeln!(output, "<body>");
    let _ = writeln!(output, "<div class=\"page\">");
    let _ = writeln!(output, "<h1>{}</h1>", escape_html(&options.title));
    let _ = writeln!(
        output,
        "<div class=\"explanation\">{}</div>",
        escape_html(&options.description)
    );

    let _ = writeln!(output, "<div class=\"layer row\">");
    let _ = writeln!(output, "<div class=\"panel wide\">\n{totals_svg}</div>");
    let _ = writeln!(output, "<div class=\"panel narrow\">\n{donut_svg}</div>");
    let _ = writeln!(output, "</div>");

    let _ = writeln!(output, "<div class=\"layer panel\">\n{category_svg}</div>");

    let _ = writeln!(output, "<div class=\"layer table-scroll\">");
    write_table(&mut output, &view.table);
    let _ = writeln!(output, "</div>");

    let _ = writeln!(output, "</div>");
    let _ = writeln!(output, "</body>");
    let _ = writeln!(output, "</html>");
    output
}

fn write_style(output: &mut String, theme: &ColorTheme) {
    let _ = writeln!(output, "<style>");
    let _ = writeln!(
        output,
        "body{{margin:0;background:{};color:{};font-family:'Open Sans',sans-serif;font-weight:400;}}",
        theme.background, theme.text
    );
    let _ = writeln!(output, ".page{{padding:20px 2rem 30px 2rem;}}");
    let _ = writeln!(
        output,
        "h1{{color:{};font-weight:100;margin-bottom:1rem;}}",
        theme.title_text
    );
    let _ = writeln!(output, ".explanation{{margin-bottom:2rem;}}");
    let _ = writeln!(output, ".layer{{margin-bottom:30px;}}");
    let _ = writeln!(output, ".row{{display:flex;flex-direction:row;}}");
    let _ = writeln!(output, ".panel{{padding:10px;}}");
    let _ = writeln!(output, ".wide{{width:80%;}}");
    let _ = writeln!(output, ".narrow{{width:20%;}}");
    let _ = writeln!(output, "svg.chart{{width:100%;height:auto;display:block;}}");
    let _ = writeln!(
        output,
        ".table-scroll{{padding:10px;overflow:auto;max-height:200pt;}}"
    );
    let _ = writeln!(
        output,
        "table{{border-collapse:collapse;min-width:100%;background:{};}}",
        theme.title_text
    );
    let _ = writeln!(
        output,
        "th,td{{min-width:150px;width:150px;max-width:150px;color:white;border:1px solid {};padding:4px 6px;text-align:left;}}",
        theme.grid
    );
    let _ = writeln!(output, "td{{background:{};}}", theme.light_background);
    let _ = writeln!(
        output,
        "th{{background:{};position:sticky;top:0;z-index:10;}}",
        theme.dark_background
    );
    let _ = writeln!(output, "</style>");
}

fn write_table(output: &mut String, table: &DataTable) {
    let _ = writeln!(output, "<table>");
    let _ = write!(output, "<thead><tr>");
    for column in &table.columns {
        let _ = write!(output, "<th>{}</th>", escape_html(column));
    }
    let _ = writeln!(output, "</tr></thead>");

    let _ = writeln!(output, "<tbody>");
    for row in &table.rows {
        let _ = write!(output, "<tr>");
        for cell in row {
            let _ = write!(output, "<td>{}</td>", escape_html(cell));
        }
        let _ = writeln!(output, "</tr>");
    }
    let _ = writeln!(output, "</tbody>");
    let _ = writeln!(output, "</table>");
}

/// Plain-text digest of the latest day, used by the `summary` command.
pub fn build_summary(view: &DashboardView) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Daily scenario test summary");
    match (
        view.totals.total.last(),
        view.totals.success.last(),
        view.totals.failure.last(),
    ) {
        (Some(total), Some(success), Some(failure)) => {
            let _ = writeln!(
                output,
                "- latest day {}: {} scenarios, {} OK, {} NG",
                total.date, total.value, success.value, failure.value
            );
        }
        _ => {
            let _ = writeln!(output, "- no days recorded");
        }
    }
    let _ = writeln!(
        output,
        "- success rate {:.1}% / failure rate {:.1}%",
        view.latest_split.success_pct, view.latest_split.failure_pct
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "NG categories");
    if view.categories.is_empty() {
        let _ = writeln!(output, "No NG categories in this sheet.");
    } else {
        for entry in view.categories.iter() {
            let latest = entry.series.last().map(|point| point.value).unwrap_or(0.0);
            let peak = entry.series.max_value().unwrap_or(0.0);
            let _ = writeln!(
                output,
                "- {}: {} on the latest day (peak {})",
                entry.column, latest, peak
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader;

    const SHEET: &str = "\
Date,シナリオテスト総計：シナリオ総数,シナリオテスト総計：OK,シナリオテスト総計：NG,Success Rate (%),Login_NG,Checkout_NG,Note
2024-01-01,10,8,2,80.0,1,1,first run
2024-01-02,12,9,3,75.0,2,1,<flaky>
";

    fn view() -> DashboardView {
        let dataset = loader::read_csv(SHEET.as_bytes()).unwrap();
        build_view(&dataset, &ColumnSchema::default()).unwrap()
    }

    #[test]
    fn view_uses_default_schema() {
        let view = view();

        assert_eq!(view.totals.total.values(), vec![10.0, 12.0]);
        assert_eq!(view.latest_split.failure_pct, 25.0);
        assert_eq!(
            view.categories.keys().collect::<Vec<_>>(),
            vec!["Login_NG", "Checkout_NG"]
        );
        assert_eq!(view.table.rows.len(), 2);
        assert_eq!(view.table.rows[0][0], "2024-01-01");
        assert_eq!(view.table.rows[1][7], "<flaky>");
    }

    #[test]
    fn view_fails_without_rate_column() {
        let dataset = loader::read_csv("Date,Total,OK,NG\n2024-01-01,1,1,0\n".as_bytes()).unwrap();
        let schema = ColumnSchema {
            total: "Total".to_string(),
            success: "OK".to_string(),
            failure: "NG".to_string(),
            ..ColumnSchema::default()
        };

        let err = build_view(&dataset, &schema).unwrap_err();
        assert_eq!(
            err,
            ExtractError::MissingColumn {
                column: "Success Rate (%)".to_string()
            }
        );
    }

    #[test]
    fn page_has_all_sections() {
        let html = render_html(&view(), &PageOptions::default(), &ColorTheme::default());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>DAILY SCENARIO TEST REPORT</h1>"));
        assert_eq!(html.matches("<svg").count(), 3);
        assert!(html.contains("<th>Success Rate (%)</th>"));
        assert!(html.contains("<td>&lt;flaky&gt;</td>"));
        assert!(html.contains("background:rgb(6, 30, 68)"));
    }

    #[test]
    fn summary_reports_latest_day() {
        let summary = build_summary(&view());

        assert!(summary.contains("latest day 2024-01-02: 12 scenarios, 9 OK, 3 NG"));
        assert!(summary.contains("success rate 75.0% / failure rate 25.0%"));
        assert!(summary.contains("- Login_NG: 2 on the latest day (peak 2)"));
    }

    #[test]
    fn view_serializes_to_json() {
        let json = serde_json::to_value(view()).unwrap();

        assert_eq!(json["latest_split"]["success_pct"], 75.0);
        assert_eq!(json["totals"]["failure"][1]["date"], "2024-01-02");
        assert_eq!(json["categories"][0]["column"], "Login_NG");
    }
}
