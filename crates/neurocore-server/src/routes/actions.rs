use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use neurocore_core::action::ActionInfo;
use neurocore_core::error::CoreError;
use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

/// GET /api/actions — catalog metadata in declaration order, optionally
/// filtered by `?category=`.
pub async fn list_actions(
    State(app): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<ActionInfo>> {
    let actions = app
        .executor
        .catalog()
        .list()
        .iter()
        .filter(|a| {
            query
                .category
                .as_deref()
                .map_or(true, |c| a.category.eq_ignore_ascii_case(c))
        })
        .map(|a| a.info())
        .collect();
    Json(actions)
}

/// GET /api/actions/{id}
pub async fn get_action(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionInfo>, AppError> {
    let action = app
        .executor
        .catalog()
        .get(&id)
        .ok_or_else(|| CoreError::UnknownAction(id.clone()))?;
    Ok(Json(action.info()))
}

/// POST /api/actions/{id}/run — claim the running slot and finish the work
/// in the background. Progress arrives on `/api/events`.
pub async fn run_action(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let pending = app.executor.begin_run(&id)?;
    let executor = app.executor.clone();
    tokio::spawn(async move {
        let result = executor.finish_run(pending).await;
        info!(success = result.success, message = %result.message, "background run finished");
    });
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "id": id, "status": "running" })),
    ))
}
