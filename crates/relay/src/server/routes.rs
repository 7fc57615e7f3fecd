use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::AppState;
use crate::alert::AlertGroup;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn convert_alerts(
    State(state): State<Arc<AppState>>,
    Json(group): Json<AlertGroup>,
) -> Response {
    match state.converter.convert_group(&group) {
        Ok(documents) => (StatusCode::OK, Json(documents)).into_response(),
        Err(e) => {
            warn!(error = %e, "Rejected alert group for conversion");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Conversion failed",
                    "message": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

pub async fn telephone_webhook(
    State(state): State<Arc<AppState>>,
    Json(group): Json<AlertGroup>,
) -> Response {
    let Some(notifier) = state.telephone.as_ref() else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Telephone channel is not configured" })),
        )
            .into_response();
    };

    info!(
        receiver = %group.receiver,
        alerts = group.alerts.len(),
        "Received telephone webhook"
    );

    match notifier.notify(&group).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        // Alertmanager redelivers on any 5xx
        Err(e) => {
            error!(error = %e, retryable = e.is_retryable(), "Notification failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Notification failed",
                    "message": e.to_string(),
                    "retryable": e.is_retryable()
                })),
            )
                .into_response()
        }
    }
}

pub async fn metrics() -> Response {
    match crate::metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to gather metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
