//! Top-level process CRUD. Reads are public; writes require admin.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::AdminUser;
use crate::shared::error::{ApiError, FieldError};
use crate::shared::models::{NewProcess, Process, ProcessCategory};
use crate::shared::state::AppState;

pub fn configure_process_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/processes", get(list_processes))
        .route("/processes", post(create_process))
        .route("/processes/:id", get(get_process))
        .route("/processes/:id", put(update_process))
        .route("/processes/:id", delete(delete_process))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPayload {
    pub name: String,
    pub category: String,
    pub icon: String,
}

impl ProcessPayload {
    /// Shape-checks the payload and parses the category enum, so a bad
    /// category yields a structured 400 rather than a body-rejection.
    fn validate(self) -> Result<NewProcess, ApiError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "name is required"));
        }
        if self.icon.trim().is_empty() {
            errors.push(FieldError::new("icon", "icon is required"));
        }
        match self.category.parse::<ProcessCategory>() {
            Ok(category) if errors.is_empty() => Ok(NewProcess {
                name: self.name,
                category,
                icon: self.icon,
            }),
            Ok(_) => Err(ApiError::Validation(errors)),
            Err(_) => {
                errors.push(FieldError::new(
                    "category",
                    "category must be one of strategic, operational, support",
                ));
                Err(ApiError::Validation(errors))
            }
        }
    }
}

async fn list_processes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Process>>, ApiError> {
    Ok(Json(state.storage.get_all_processes().await?))
}

async fn get_process(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<Process>, ApiError> {
    state
        .storage
        .get_process(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Process"))
}

async fn create_process(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Json(payload): Json<ProcessPayload>,
) -> Result<(StatusCode, Json<Process>), ApiError> {
    let process = payload.validate()?;
    let created = state.storage.create_process(process).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_process(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<ProcessPayload>,
) -> Result<Json<Process>, ApiError> {
    let process = payload.validate()?;
    state
        .storage
        .update_process(id, process)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Process"))
}

async fn delete_process(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.storage.get_process(id).await?.is_none() {
        return Err(ApiError::NotFound("Process"));
    }
    if state.storage.has_subprocesses_for_process(id).await? {
        return Err(ApiError::Conflict(
            "Cannot delete a process that still has subprocesses".to_string(),
        ));
    }
    state.storage.delete_process(id).await?;
    Ok(Json(serde_json::json!({ "message": "Process deleted" })))
}
