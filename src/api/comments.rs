//! Per-document comment threads. Reading is public, posting requires a
//! session; the author is always the session user.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::shared::error::{ApiError, FieldError};
use crate::shared::models::{Comment, NewComment};
use crate::shared::state::AppState;

pub fn configure_comment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents/:id/comments", get(list_comments))
        .route("/comments", post(create_comment))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPayload {
    pub document_id: i32,
    pub text: String,
}

impl CommentPayload {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        if self.document_id <= 0 {
            errors.push(FieldError::new("documentId", "documentId must be positive"));
        }
        if self.text.trim().is_empty() {
            errors.push(FieldError::new("text", "text is required"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

/// Unknown documents yield an empty list, not a 404.
async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<i32>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.storage.get_comments_by_document(document_id).await?))
}

async fn create_comment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CommentPayload>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    payload.validate()?;
    if state.storage.get_document(payload.document_id).await?.is_none() {
        return Err(ApiError::NotFound("Document"));
    }
    let created = state
        .storage
        .create_comment(NewComment {
            document_id: payload.document_id,
            user_id: user.id,
            text: payload.text,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}
