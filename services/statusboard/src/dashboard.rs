//! Web dashboard with JSON API endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::probe::ProbeSet;
use crate::scheduler::{Scheduler, TriggerOutcome};
use crate::state::StateHandle;
use crate::status::ProbeResult;

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub state: StateHandle,
    pub scheduler: Arc<Scheduler>,
    pub probes: Arc<ProbeSet>,
}

/// Build the dashboard axum router
pub fn build_router(dashboard_state: DashboardState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/status", get(status_handler))
        .route("/api/components", get(components_handler))
        .route("/api/refresh", post(refresh_handler))
        .route("/api/interval", post(interval_handler))
        .route("/health", get(health_handler))
        .with_state(dashboard_state)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn section_rows(section: &str, results: &[ProbeResult]) -> String {
    results
        .iter()
        .map(|r| {
            let color = if r.online { "#155724" } else { "#383d41" };
            format!(
                r#"<tr style="border-bottom: 1px solid #dee2e6;">
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{} {}</td>
                    <td style="padding: 0.5rem; color: {};">{}</td>
                </tr>"#,
                section,
                r.glyph(),
                escape(&r.label),
                color,
                escape(&r.status)
            )
        })
        .collect()
}

async fn index_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;

    let (rows, last_updated) = match &state.snapshot {
        Some(snapshot) => {
            let rows = [
                section_rows("Bots", &snapshot.bots),
                section_rows("Websites", &snapshot.websites),
                section_rows("Discord", &snapshot.discord_services),
                section_rows("Other", &snapshot.custom_services),
            ]
            .concat();
            (
                rows,
                snapshot
                    .last_updated_utc
                    .format("%Y-%m-%d %H:%M:%S UTC")
                    .to_string(),
            )
        }
        None => (String::new(), "Never".to_string()),
    };

    let publish = match &state.last_publish {
        Some(record) if record.success => format!("OK ({})", escape(&record.url)),
        Some(record) => format!(
            "Failed ({}): {}",
            escape(&record.url),
            escape(record.error.as_deref().unwrap_or("unknown error"))
        ),
        None => "Not published".to_string(),
    };

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Statusboard</title>
    <script>
        function refreshNow() {{
            fetch('/api/refresh', {{ method: 'POST' }}).then(() => location.reload());
        }}
        setInterval(() => location.reload(), 30000);
    </script>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem;">
    <h1>Statusboard</h1>
    <p>Last Updated: {last_updated} &middot; Sink: {publish} &middot; Cycles: {cycles}</p>
    <button onclick="refreshNow()">Refresh now</button>
    <table style="width: 100%; border-collapse: collapse;">
        <thead>
            <tr style="border-bottom: 2px solid #dee2e6;">
                <th style="padding: 0.5rem; text-align: left;">Section</th>
                <th style="padding: 0.5rem; text-align: left;">Name</th>
                <th style="padding: 0.5rem; text-align: left;">Status</th>
            </tr>
        </thead>
        <tbody>{rows}</tbody>
    </table>
</body>
</html>"#,
        last_updated = last_updated,
        publish = publish,
        cycles = state.cycles_completed,
        rows = rows,
    );

    Html(html)
}

async fn status_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;

    Json(serde_json::json!({
        "snapshot": state.snapshot,
        "last_publish": state.last_publish,
        "cycles_completed": state.cycles_completed,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

async fn components_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    match dashboard.probes.list_components().await {
        Ok(components) => (StatusCode::OK, Json(serde_json::json!(components))),
        Err(e) => {
            tracing::warn!("Component catalog request failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}

async fn refresh_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    match dashboard.scheduler.trigger_update().await {
        TriggerOutcome::Completed(snapshot) => (StatusCode::OK, Json(serde_json::json!(snapshot))),
        TriggerOutcome::AlreadyRunning => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "refresh already running" })),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct IntervalRequest {
    minutes: u32,
}

async fn interval_handler(
    State(dashboard): State<DashboardState>,
    Json(request): Json<IntervalRequest>,
) -> impl IntoResponse {
    match dashboard.scheduler.set_interval(request.minutes).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "refresh_interval": request.minutes })),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
