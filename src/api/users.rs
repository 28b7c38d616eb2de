//! Admin user listing and per-user KPI embed configuration.

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::AdminUser;
use crate::shared::error::{ApiError, FieldError};
use crate::shared::models::User;
use crate::shared::state::AppState;

pub fn configure_user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/kpi-config", put(update_kpi_config))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.storage.get_all_users().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiConfigPayload {
    pub kpi_iframe_url: Option<String>,
}

impl KpiConfigPayload {
    /// Null clears the embed; a value must be an absolute http(s) URL.
    fn validate(self) -> Result<Option<String>, ApiError> {
        match self.kpi_iframe_url {
            None => Ok(None),
            Some(url) => {
                let trimmed = url.trim();
                if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
                    Ok(Some(trimmed.to_string()))
                } else {
                    Err(ApiError::Validation(vec![FieldError::new(
                        "kpiIframeUrl",
                        "kpiIframeUrl must be an http or https URL",
                    )]))
                }
            }
        }
    }
}

async fn update_kpi_config(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<KpiConfigPayload>,
) -> Result<Json<User>, ApiError> {
    let kpi_iframe_url = payload.validate()?;
    state
        .storage
        .update_user_kpi_config(id, kpi_iframe_url)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("User"))
}
