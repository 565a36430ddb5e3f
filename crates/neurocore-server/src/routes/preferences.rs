use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PutPreferenceBody {
    pub value: Value,
}

async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> neurocore_core::Result<T> + Send + 'static,
{
    let out = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(out)
}

/// GET /api/preferences/{key} — 404 when the key was never set.
pub async fn get_preference(
    State(app): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, AppError> {
    let store = app.prefs.clone();
    let lookup = key.clone();
    let value = run_blocking(move || store.get(&lookup)).await?;
    match value {
        Some(value) => Ok(Json(json!({ "key": key, "value": value }))),
        None => Err(AppError::not_found(format!("preference '{key}' is not set"))),
    }
}

/// PUT /api/preferences/{key} — body `{"value": <any JSON>}`.
pub async fn put_preference(
    State(app): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<PutPreferenceBody>,
) -> Result<Json<Value>, AppError> {
    if key.trim().is_empty() {
        return Err(AppError::bad_request("preference key must not be empty"));
    }
    let store = app.prefs.clone();
    let (k, v) = (key.clone(), body.value.clone());
    run_blocking(move || store.set(&k, v)).await?;
    Ok(Json(json!({ "key": key, "value": body.value })))
}

/// DELETE /api/preferences/{key}
pub async fn delete_preference(
    State(app): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, AppError> {
    let store = app.prefs.clone();
    let k = key.clone();
    let deleted = run_blocking(move || store.delete(&k)).await?;
    Ok(Json(json!({ "key": key, "deleted": deleted })))
}
