use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    response::{Html, Json},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tracing::info;

use crate::report::DashboardView;

/// The page is rendered once at startup; requests only read it.
#[derive(Clone)]
pub struct DashboardState {
    inner: Arc<RenderedDashboard>,
}

struct RenderedDashboard {
    html: String,
    view: DashboardView,
}

impl DashboardState {
    pub fn new(html: String, view: DashboardView) -> Self {
        Self {
            inner: Arc::new(RenderedDashboard { html, view }),
        }
    }
}

pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(dashboard_home))
        .route("/api/metrics", get(dashboard_metrics))
        .with_state(state)
}

pub async fn serve(bind_addr: &str, state: DashboardState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!("serving dashboard on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .await
        .context("dashboard server stopped")?;
    Ok(())
}

async fn dashboard_home(State(state): State<DashboardState>) -> Html<String> {
    Html(state.inner.html.clone())
}

async fn dashboard_metrics(State(state): State<DashboardState>) -> Json<DashboardView> {
    Json(state.inner.view.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader;
    use crate::models::ColumnSchema;
    use crate::report::{self, PageOptions};
    use crate::theme::ColorTheme;

    fn state() -> DashboardState {
        let sheet = "\
Date,シナリオテスト総計：シナリオ総数,シナリオテスト総計：OK,シナリオテスト総計：NG,Success Rate (%)
2024-01-01,10,8,2,80.0
";
        let dataset = loader::read_csv(sheet.as_bytes()).unwrap();
        let view = report::build_view(&dataset, &ColumnSchema::default()).unwrap();
        let html = report::render_html(&view, &PageOptions::default(), &ColorTheme::default());
        DashboardState::new(html, view)
    }

    #[tokio::test]
    async fn home_returns_rendered_page() {
        let Html(body) = dashboard_home(State(state())).await;
        assert!(body.contains("DAILY SCENARIO TEST REPORT"));
    }

    #[tokio::test]
    async fn metrics_returns_view() {
        let state = state();
        let Json(view) = dashboard_metrics(State(state.clone())).await;
        assert_eq!(view, state.inner.view);
        assert_eq!(view.latest_split.success_pct, 80.0);
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let err = serve("not-an-address", state()).await.unwrap_err();
        assert!(err.to_string().contains("failed to bind not-an-address"));
    }
}
