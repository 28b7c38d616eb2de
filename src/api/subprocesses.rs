//! Subprocess CRUD. Reads are public; writes require admin.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::AdminUser;
use crate::shared::error::{ApiError, FieldError};
use crate::shared::models::{NewSubprocess, Subprocess};
use crate::shared::state::AppState;

pub fn configure_subprocess_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/subprocesses", get(list_subprocesses))
        .route("/subprocesses", post(create_subprocess))
        .route("/subprocesses/:id", get(get_subprocess))
        .route("/subprocesses/:id", put(update_subprocess))
        .route("/subprocesses/:id", delete(delete_subprocess))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubprocessPayload {
    pub name: String,
    pub process_id: i32,
}

impl SubprocessPayload {
    fn validate(self) -> Result<NewSubprocess, ApiError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "name is required"));
        }
        if self.process_id <= 0 {
            errors.push(FieldError::new("processId", "processId must be positive"));
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(NewSubprocess {
            name: self.name,
            process_id: self.process_id,
        })
    }
}

async fn ensure_process_exists(state: &AppState, process_id: i32) -> Result<(), ApiError> {
    if state.storage.get_process(process_id).await?.is_none() {
        return Err(ApiError::Validation(vec![FieldError::new(
            "processId",
            "referenced process does not exist",
        )]));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubprocessListQuery {
    process_id: Option<i32>,
}

async fn list_subprocesses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SubprocessListQuery>,
) -> Result<Json<Vec<Subprocess>>, ApiError> {
    let subprocesses = match query.process_id {
        Some(process_id) => state.storage.get_subprocesses_by_process(process_id).await?,
        None => state.storage.get_all_subprocesses().await?,
    };
    Ok(Json(subprocesses))
}

async fn get_subprocess(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<Subprocess>, ApiError> {
    state
        .storage
        .get_subprocess(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Subprocess"))
}

async fn create_subprocess(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Json(payload): Json<SubprocessPayload>,
) -> Result<(StatusCode, Json<Subprocess>), ApiError> {
    let subprocess = payload.validate()?;
    ensure_process_exists(&state, subprocess.process_id).await?;
    let created = state.storage.create_subprocess(subprocess).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_subprocess(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<SubprocessPayload>,
) -> Result<Json<Subprocess>, ApiError> {
    let subprocess = payload.validate()?;
    ensure_process_exists(&state, subprocess.process_id).await?;
    state
        .storage
        .update_subprocess(id, subprocess)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Subprocess"))
}

async fn delete_subprocess(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.storage.get_subprocess(id).await?.is_none() {
        return Err(ApiError::NotFound("Subprocess"));
    }
    if state.storage.has_documents_for_subprocess(id).await? {
        return Err(ApiError::Conflict(
            "Cannot delete a subprocess that still has documents".to_string(),
        ));
    }
    state.storage.delete_subprocess(id).await?;
    Ok(Json(serde_json::json!({ "message": "Subprocess deleted" })))
}
