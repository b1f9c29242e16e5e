//! Dashboard HTTP API
//!
//! REST endpoints for the dashboard frontend.

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use super::types::*;
use super::DashboardReader;

/// Create the API router with all endpoints
pub fn create_router(reader: Arc<DashboardReader>) -> Router {
    Router::new()
        .route("/api/summary", get(get_summary))
        .route("/api/history", get(get_history))
        .with_state(reader)
        // CORS for frontend
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Bind and serve until the process is stopped
pub async fn serve(bind: &str, reader: Arc<DashboardReader>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind dashboard on {}", bind))?;
    info!(bind = %bind, "Dashboard API listening");
    axum::serve(listener, create_router(reader))
        .await
        .context("Dashboard server failed")
}

// ─────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────

/// GET /api/summary - Latest values, change and last-updated time
async fn get_summary(State(reader): State<Arc<DashboardReader>>) -> impl IntoResponse {
    match reader.summary() {
        Ok(summary) => Json(ApiResponse::success(summary)),
        Err(e) => {
            warn!(error = %e, "Failed to build summary");
            Json(ApiResponse::error(e.to_string()))
        }
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    item: Option<String>,
    #[serde(default)]
    order: OrderParam,
}

/// GET /api/history?item=VIX&order=desc - One item, or all items without `item`
async fn get_history(
    Query(query): Query<HistoryQuery>,
    State(reader): State<Arc<DashboardReader>>,
) -> impl IntoResponse {
    let item = query.item.as_deref().map(str::trim).filter(|i| !i.is_empty());
    match reader.history(item, query.order.into()) {
        Ok(history) => Json(ApiResponse::success(history)),
        Err(e) => {
            warn!(error = %e, "Failed to build history");
            Json(ApiResponse::error(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::HistoryStore;
    use crate::types::HistoryRow;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get_json(router: Router, uri: &str) -> serde_json::Value {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn summary_endpoint_reports_not_yet_run() {
        let dir = std::env::temp_dir().join(format!("marketwatch_api_{}", uuid::Uuid::new_v4()));
        let store = Arc::new(HistoryStore::new(dir.join("history_data.csv")));
        let router = create_router(Arc::new(DashboardReader::new(store)));

        let body = get_json(router, "/api/summary").await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "not_yet_run");
    }

    #[tokio::test]
    async fn history_endpoint_returns_selected_item_newest_first() {
        let dir = std::env::temp_dir().join(format!("marketwatch_api_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let store = Arc::new(HistoryStore::new(dir.join("history_data.csv")));
        store
            .append(HistoryRow::new("2026-01-01 08:00:00").with("US 10Y Yield", 4.1))
            .await
            .unwrap();
        store
            .append(HistoryRow::new("2026-01-02 08:00:00").with("US 10Y Yield", 4.3))
            .await
            .unwrap();
        let router = create_router(Arc::new(DashboardReader::new(store)));

        let body = get_json(router, "/api/history?item=US%2010Y%20Yield&order=desc").await;
        let points = &body["data"]["series"][0]["points"];
        assert_eq!(points[0]["timestamp"], "2026-01-02 08:00:00");
        assert_eq!(points[1]["value"], 4.1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
