use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/config — the configuration the server started with, plus any
/// validation findings. Read-only; edits go through the YAML file.
pub async fn get_config(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let config = serde_json::to_value(app.config.as_ref())?;
    let warnings = serde_json::to_value(app.config.validate())?;
    Ok(Json(serde_json::json!({
        "config": config,
        "warnings": warnings,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use neurocore_core::config::Config;

    #[tokio::test]
    async fn get_config_reflects_loaded_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.qos.application = "valorant.exe".into();
        config.save(dir.path()).unwrap();

        let app = AppState::new(dir.path().to_path_buf()).unwrap();
        let json = get_config(State(app)).await.unwrap().0;
        assert_eq!(json["config"]["qos"]["application"], "valorant.exe");
        assert_eq!(json["config"]["version"], 1);
        assert_eq!(json["warnings"], serde_json::json!([]));
    }
}
