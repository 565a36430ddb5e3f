use axum::extract::State;
use axum::Json;
use neurocore_core::prefs::UiSettings;
use neurocore_core::types::Theme;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsBody {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub auto_switch: Option<bool>,
    #[serde(default)]
    pub sidebar_open: Option<bool>,
}

/// GET /api/settings
pub async fn get_settings(State(app): State<AppState>) -> Result<Json<UiSettings>, AppError> {
    let store = app.prefs.clone();
    let settings = tokio::task::spawn_blocking(move || UiSettings::load(store.as_ref()))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(settings))
}

/// PUT /api/settings — an unknown theme name is a 400.
pub async fn put_settings(
    State(app): State<AppState>,
    Json(body): Json<UpdateSettingsBody>,
) -> Result<Json<UiSettings>, AppError> {
    let theme = body
        .theme
        .as_deref()
        .map(str::parse::<Theme>)
        .transpose()?;

    let store = app.prefs.clone();
    let settings = tokio::task::spawn_blocking(move || {
        let mut settings = UiSettings::load(store.as_ref())?;
        if let Some(theme) = theme {
            settings.theme = theme;
        }
        if let Some(auto_switch) = body.auto_switch {
            settings.auto_switch = auto_switch;
        }
        if let Some(open) = body.sidebar_open {
            settings.sidebar_open = open;
        }
        settings.save(store.as_ref())?;
        Ok::<_, neurocore_core::CoreError>(settings)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(settings))
}
