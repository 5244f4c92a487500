use std::f64::consts::PI;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::html::escape_html;
use crate::models::{CategorySeriesMap, SeriesDate, SuccessSplit, TimeSeries, Totals};
use crate::theme::ColorTheme;

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 380.0;
const MARGIN_LEFT: f64 = 56.0;
const MARGIN_RIGHT: f64 = 170.0;
const MARGIN_TOP: f64 = 44.0;
const MARGIN_BOTTOM: f64 = 56.0;
const Y_TICKS: usize = 5;
const MAX_X_LABELS: usize = 10;

const DONUT_SIZE: f64 = 260.0;
const DONUT_OUTER: f64 = 100.0;
const DONUT_HOLE: f64 = 0.4;

struct Line<'a> {
    name: &'a str,
    color: &'a str,
    fill_opacity: Option<f64>,
    series: &'a TimeSeries,
}

/// Total / success / failure history as filled line areas.
pub fn totals_chart(totals: &Totals, title: &str, theme: &ColorTheme) -> String {
    let lines = [
        Line {
            name: "Total",
            color: &theme.total_line,
            fill_opacity: Some(0.2),
            series: &totals.total,
        },
        Line {
            name: "Success",
            color: &theme.success_line,
            fill_opacity: Some(0.3),
            series: &totals.success,
        },
        Line {
            name: "Failure",
            color: &theme.failure_line,
            fill_opacity: Some(0.4),
            series: &totals.failure,
        },
    ];
    line_chart(title, &lines, theme)
}

/// One plain line per failure category.
pub fn category_chart(categories: &CategorySeriesMap, title: &str, theme: &ColorTheme) -> String {
    let lines: Vec<Line<'_>> = categories
        .iter()
        .enumerate()
        .map(|(index, entry)| Line {
            name: &entry.column,
            color: theme.category_color(index),
            fill_opacity: None,
            series: &entry.series,
        })
        .collect();

    if lines.is_empty() {
        return placeholder(title, "No NG categories in this sheet", theme);
    }
    line_chart(title, &lines, theme)
}

/// Success/failure donut for the latest day.
pub fn donut_chart(split: &SuccessSplit, title: &str, theme: &ColorTheme) -> String {
    let mut svg = String::new();
    let center = DONUT_SIZE / 2.0;
    let cy = center + 20.0;
    let band = DONUT_OUTER * (1.0 - DONUT_HOLE);
    let radius = DONUT_OUTER - band / 2.0;
    let circumference = 2.0 * PI * radius;
    let success_len = circumference * split.success_pct / 100.0;
    let failure_len = circumference - success_len;

    let _ = writeln!(
        svg,
        r#"<svg class="chart donut" viewBox="0 0 {DONUT_SIZE} {}" xmlns="http://www.w3.org/2000/svg" role="img">"#,
        DONUT_SIZE + 70.0
    );
    let _ = writeln!(
        svg,
        r#"<rect width="100%" height="100%" fill="{}"/>"#,
        theme.light_background
    );
    write_title(&mut svg, title, 10.0, theme);

    let rotate = format!("rotate(-90 {center} {cy})");
    let _ = writeln!(
        svg,
        r#"<circle cx="{center}" cy="{cy}" r="{radius:.2}" fill="none" stroke="{}" stroke-width="{band:.2}" stroke-dasharray="{success_len:.3} {circumference:.3}" transform="{rotate}"/>"#,
        theme.success_slice
    );
    let _ = writeln!(
        svg,
        r#"<circle cx="{center}" cy="{cy}" r="{radius:.2}" fill="none" stroke="{}" stroke-width="{band:.2}" stroke-dasharray="{failure_len:.3} {circumference:.3}" stroke-dashoffset="{:.3}" transform="{rotate}"/>"#,
        theme.failure_slice,
        -success_len
    );
    let _ = writeln!(
        svg,
        r#"<text x="{center}" y="{:.1}" fill="{}" font-size="20" text-anchor="middle">{:.1}%</text>"#,
        cy + 7.0,
        theme.title_text,
        split.success_pct
    );

    let legend_y = cy + DONUT_OUTER + 26.0;
    for (offset, (label, pct, color)) in [
        ("Success Rate", split.success_pct, &theme.success_slice),
        ("Failure Rate", split.failure_pct, &theme.failure_slice),
    ]
    .into_iter()
    .enumerate()
    {
        let y = legend_y + offset as f64 * 18.0;
        let _ = writeln!(
            svg,
            r#"<rect x="40" y="{:.1}" width="12" height="12" fill="{color}"/>"#,
            y - 10.0
        );
        let _ = writeln!(
            svg,
            r#"<text x="58" y="{y:.1}" fill="{}" font-size="12">{label} {pct:.1}%</text>"#,
            theme.text
        );
    }

    let _ = writeln!(svg, "</svg>");
    svg
}

fn line_chart(title: &str, lines: &[Line<'_>], theme: &ColorTheme) -> String {
    let mut svg = String::new();
    let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = MARGIN_TOP + plot_height;

    let points = lines.iter().map(|line| line.series.len()).max().unwrap_or(0);
    let y_max = nice_ceiling(
        lines
            .iter()
            .filter_map(|line| line.series.max_value())
            .fold(0.0, f64::max),
    );

    let scale = XScale::for_lines(lines);
    let x_at = |index: usize, date: &SeriesDate| -> f64 {
        MARGIN_LEFT + plot_width * scale.fraction(index, date)
    };
    let y_at = |value: f64| -> f64 { baseline - plot_height * value / y_max };

    let _ = writeln!(
        svg,
        r#"<svg class="chart" viewBox="0 0 {WIDTH} {HEIGHT}" xmlns="http://www.w3.org/2000/svg" role="img">"#
    );
    let _ = writeln!(
        svg,
        r#"<rect width="100%" height="100%" fill="{}"/>"#,
        theme.light_background
    );
    write_title(&mut svg, title, MARGIN_LEFT, theme);

    for tick in 0..=Y_TICKS {
        let value = y_max * tick as f64 / Y_TICKS as f64;
        let y = y_at(value);
        let _ = writeln!(
            svg,
            r#"<line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{}" stroke-width="1"/>"#,
            MARGIN_LEFT + plot_width,
            theme.grid
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" fill="{}" font-size="11" text-anchor="end">{}</text>"#,
            MARGIN_LEFT - 6.0,
            y + 4.0,
            theme.text,
            format_tick(value)
        );
    }

    if let Some(longest) = lines.iter().map(|line| line.series).max_by_key(|s| s.len()) {
        let stride = points.div_ceil(MAX_X_LABELS).max(1);
        for (index, date) in longest.dates().iter().enumerate().step_by(stride) {
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" fill="{}" font-size="11" text-anchor="middle">{}</text>"#,
                x_at(index, date),
                baseline + 18.0,
                theme.text,
                date_label(date)
            );
        }
    }
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" fill="{}" font-size="12" text-anchor="middle">Date</text>"#,
        MARGIN_LEFT + plot_width / 2.0,
        HEIGHT - 10.0,
        theme.text
    );
    let _ = writeln!(
        svg,
        r#"<text x="14" y="{:.1}" fill="{}" font-size="12" text-anchor="middle" transform="rotate(-90 14 {:.1})">Count</text>"#,
        MARGIN_TOP + plot_height / 2.0,
        theme.text,
        MARGIN_TOP + plot_height / 2.0
    );

    for line in lines {
        let coords: Vec<(f64, f64)> = line
            .series
            .points()
            .iter()
            .enumerate()
            .map(|(index, point)| (x_at(index, &point.date), y_at(point.value)))
            .collect();
        if coords.is_empty() {
            continue;
        }
        let path = coords
            .iter()
            .map(|(x, y)| format!("{x:.1},{y:.1}"))
            .collect::<Vec<_>>()
            .join(" ");

        if let Some(opacity) = line.fill_opacity {
            let first_x = coords[0].0;
            let last_x = coords[coords.len() - 1].0;
            let _ = writeln!(
                svg,
                r#"<polygon points="{first_x:.1},{baseline:.1} {path} {last_x:.1},{baseline:.1}" fill="{}" fill-opacity="{opacity}" stroke="none"/>"#,
                line.color
            );
        }
        let _ = writeln!(
            svg,
            r#"<polyline points="{path}" fill="none" stroke="{}" stroke-width="2"/>"#,
            line.color
        );
        for (x, y) in &coords {
            let _ = writeln!(
                svg,
                r#"<circle cx="{x:.1}" cy="{y:.1}" r="3" fill="{}"/>"#,
                line.color
            );
        }
    }

    let legend_x = WIDTH - MARGIN_RIGHT + 16.0;
    let _ = writeln!(
        svg,
        r#"<text x="{legend_x:.1}" y="{:.1}" fill="{}" font-size="12">Scenario</text>"#,
        MARGIN_TOP + 4.0,
        theme.text
    );
    for (index, line) in lines.iter().enumerate() {
        let y = MARGIN_TOP + 24.0 + index as f64 * 18.0;
        let _ = writeln!(
            svg,
            r#"<rect x="{legend_x:.1}" y="{:.1}" width="12" height="3" fill="{}"/>"#,
            y - 5.0,
            line.color
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{y:.1}" fill="{}" font-size="11">{}</text>"#,
            legend_x + 18.0,
            theme.text,
            escape_html(line.name)
        );
    }

    let _ = writeln!(svg, "</svg>");
    svg
}

/// Horizontal placement: calendar days sit on a true day axis so missing
/// reporting days leave a gap; ordinal or mixed dates fall back to row order.
enum XScale {
    Days { first: NaiveDate, span: i64 },
    Rows { count: usize },
}

impl XScale {
    fn for_lines(lines: &[Line<'_>]) -> Self {
        let count = lines.iter().map(|line| line.series.len()).max().unwrap_or(0);
        let calendar: Option<Vec<NaiveDate>> = lines
            .iter()
            .flat_map(|line| line.series.points())
            .map(|point| match point.date {
                SeriesDate::Calendar(day) => Some(day),
                SeriesDate::Ordinal(_) => None,
            })
            .collect();

        match calendar.as_deref().map(|days| (days.iter().min(), days.iter().max())) {
            Some((Some(first), Some(last))) => XScale::Days {
                first: *first,
                span: (*last - *first).num_days(),
            },
            _ => XScale::Rows { count },
        }
    }

    /// Position within the plot area, 0.0 at the left edge and 1.0 at the right.
    fn fraction(&self, index: usize, date: &SeriesDate) -> f64 {
        match (self, date) {
            (XScale::Days { first, span }, SeriesDate::Calendar(day)) if *span > 0 => {
                (*day - *first).num_days() as f64 / *span as f64
            }
            (XScale::Rows { count }, _) if *count > 1 => index as f64 / (*count - 1) as f64,
            _ => 0.5,
        }
    }
}

fn placeholder(title: &str, message: &str, theme: &ColorTheme) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg class="chart" viewBox="0 0 {WIDTH} {HEIGHT}" xmlns="http://www.w3.org/2000/svg" role="img">"#
    );
    let _ = writeln!(
        svg,
        r#"<rect width="100%" height="100%" fill="{}"/>"#,
        theme.light_background
    );
    write_title(&mut svg, title, MARGIN_LEFT, theme);
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" fill="{}" font-size="14" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        HEIGHT / 2.0,
        theme.text,
        escape_html(message)
    );
    let _ = writeln!(svg, "</svg>");
    svg
}

fn write_title(svg: &mut String, title: &str, x: f64, theme: &ColorTheme) {
    let _ = writeln!(
        svg,
        r#"<text x="{x:.1}" y="26" fill="{}" font-size="16">{}</text>"#,
        theme.text,
        escape_html(title)
    );
}

fn date_label(date: &SeriesDate) -> String {
    match date {
        SeriesDate::Calendar(day) => day.format("%m/%d").to_string(),
        SeriesDate::Ordinal(day) => day.to_string(),
    }
}

/// Rounds the axis maximum up to 1, 2 or 5 times a power of ten.
fn nice_ceiling(max: f64) -> f64 {
    if max <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(max.log10().floor());
    [1.0, 2.0, 5.0, 10.0]
        .into_iter()
        .map(|factor| factor * magnitude)
        .find(|candidate| *candidate >= max)
        .unwrap_or(10.0 * magnitude)
}

fn format_tick(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}
