//! Buckets for documents that live outside the process tree.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::AdminUser;
use crate::shared::error::{ApiError, FieldError};
use crate::shared::models::{NewOtherDocType, OtherDocType};
use crate::shared::state::AppState;

pub fn configure_other_doc_type_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/other-doc-types", get(list_other_doc_types))
        .route("/other-doc-types", post(create_other_doc_type))
        .route("/other-doc-types/:id", get(get_other_doc_type))
        .route("/other-doc-types/:id", put(update_other_doc_type))
        .route("/other-doc-types/:id", delete(delete_other_doc_type))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherDocTypePayload {
    pub name: String,
    pub icon: String,
}

impl OtherDocTypePayload {
    fn validate(self) -> Result<NewOtherDocType, ApiError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "name is required"));
        }
        if self.icon.trim().is_empty() {
            errors.push(FieldError::new("icon", "icon is required"));
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(NewOtherDocType {
            name: self.name,
            icon: self.icon,
        })
    }
}

async fn list_other_doc_types(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<OtherDocType>>, ApiError> {
    Ok(Json(state.storage.get_all_other_doc_types().await?))
}

async fn get_other_doc_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<OtherDocType>, ApiError> {
    state
        .storage
        .get_other_doc_type(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Document type"))
}

async fn create_other_doc_type(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Json(payload): Json<OtherDocTypePayload>,
) -> Result<(StatusCode, Json<OtherDocType>), ApiError> {
    let other_doc_type = payload.validate()?;
    let created = state.storage.create_other_doc_type(other_doc_type).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_other_doc_type(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<OtherDocTypePayload>,
) -> Result<Json<OtherDocType>, ApiError> {
    let other_doc_type = payload.validate()?;
    state
        .storage
        .update_other_doc_type(id, other_doc_type)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Document type"))
}

async fn delete_other_doc_type(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.storage.get_other_doc_type(id).await?.is_none() {
        return Err(ApiError::NotFound("Document type"));
    }
    if state.storage.has_documents_for_other_doc_type(id).await? {
        return Err(ApiError::Conflict(
            "Cannot delete a document type that still has documents".to_string(),
        ));
    }
    state.storage.delete_other_doc_type(id).await?;
    Ok(Json(
        serde_json::json!({ "message": "Document type deleted" }),
    ))
}
