use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use daily_test_dashboard::models::ColumnSchema;
use daily_test_dashboard::report::{self, DashboardView, PageOptions};
use daily_test_dashboard::theme::ColorTheme;
use daily_test_dashboard::{loader, server};

#[derive(Parser)]
#[command(name = "daily-test-dashboard")]
#[command(about = "Dashboard for daily scenario test results", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the latest success split and NG category counts
    Summary {
        #[command(flatten)]
        source: SourceArgs,
        /// Print the full dashboard view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the dashboard as a single HTML page
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        page: PageArgs,
        #[arg(long, default_value = "dashboard.html")]
        out: PathBuf,
    },
    /// Serve the dashboard over HTTP
    Serve {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        page: PageArgs,
        #[arg(long, default_value = "0.0.0.0:8050")]
        bind: String,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Daily test sheet (header row, one row per day)
    #[arg(long, env = "DASHBOARD_CSV")]
    csv: PathBuf,
    #[arg(long, default_value = "Date")]
    date_column: String,
    #[arg(long, default_value = "シナリオテスト総計：シナリオ総数")]
    total_column: String,
    #[arg(long, default_value = "シナリオテスト総計：OK")]
    success_column: String,
    #[arg(long, default_value = "シナリオテスト総計：NG")]
    failure_column: String,
    #[arg(long, default_value = "Success Rate (%)")]
    rate_column: String,
    /// Substring that marks per-category NG columns
    #[arg(long, default_value = "NG")]
    marker: String,
}

impl SourceArgs {
    fn schema(&self) -> ColumnSchema {
        ColumnSchema {
            date: self.date_column.clone(),
            total: self.total_column.clone(),
            success: self.success_column.clone(),
            failure: self.failure_column.clone(),
            rate: self.rate_column.clone(),
            marker: self.marker.clone(),
        }
    }

    fn load_view(&self) -> anyhow::Result<DashboardView> {
        let dataset = loader::load_csv(&self.csv)
            .with_context(|| format!("failed to load {}", self.csv.display()))?;
        report::build_view(&dataset, &self.schema())
            .with_context(|| format!("failed to extract metrics from {}", self.csv.display()))
    }
}

#[derive(Args)]
struct PageArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

impl PageArgs {
    fn options(&self) -> PageOptions {
        let defaults = PageOptions::default();
        PageOptions {
            title: self.title.clone().unwrap_or(defaults.title),
            description: self.description.clone().unwrap_or(defaults.description),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let theme = ColorTheme::default();

    match cli.command {
        Commands::Summary { source, json } => {
            let view = source.load_view()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{}", report::build_summary(&view));
            }
        }
        Commands::Report { source, page, out } => {
            let view = source.load_view()?;
            let html = report::render_html(&view, &page.options(), &theme);
            std::fs::write(&out, html)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Dashboard written to {}.", out.display());
        }
        Commands::Serve { source, page, bind } => {
            let view = source.load_view()?;
            let html = report::render_html(&view, &page.options(), &theme);
            server::serve(&bind, server::DashboardState::new(html, view)).await?;
        }
    }

    Ok(())
}
