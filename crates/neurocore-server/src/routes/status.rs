use axum::extract::{Path, State};
use axum::Json;
use neurocore_core::executor::OptimizationStatus;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/status — every action's status in catalog order.
pub async fn list_statuses(State(app): State<AppState>) -> Json<Vec<OptimizationStatus>> {
    Json(app.executor.statuses())
}

/// GET /api/status/{id}
pub async fn get_status(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OptimizationStatus>, AppError> {
    Ok(Json(app.executor.status(&id)?))
}
