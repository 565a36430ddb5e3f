use axum::extract::State;
use axum::Json;
use neurocore_core::metrics::{sample_shared, MetricsSnapshot};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/metrics — one fresh snapshot from the configured source.
pub async fn get_metrics(State(app): State<AppState>) -> Result<Json<MetricsSnapshot>, AppError> {
    let metrics = app.metrics.clone();
    // Live sampling refreshes sysinfo, which blocks.
    let snapshot = tokio::task::spawn_blocking(move || sample_shared(&metrics))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(snapshot))
}
