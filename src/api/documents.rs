//! Document CRUD with the type/FK exclusivity rule.
//!
//! A document of type `other` hangs off an other-doc-type bucket; every other
//! type hangs off a subprocess. Listings filtered by parent exclude inactive
//! documents, direct id lookup does not.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::AdminUser;
use crate::shared::error::{ApiError, FieldError};
use crate::shared::models::{Document, DocumentType, NewDocument};
use crate::shared::state::AppState;

pub fn configure_document_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents", get(list_documents))
        .route("/documents", post(create_document))
        .route("/documents/:id", get(get_document))
        .route("/documents/:id", put(update_document))
        .route("/documents/:id", delete(delete_document))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub subprocess_id: Option<i32>,
    pub other_doc_type_id: Option<i32>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub content: String,
    pub approval_date: String,
    pub approvers: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC).
fn parse_approval_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

impl DocumentPayload {
    fn validate(self) -> Result<NewDocument, ApiError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "name is required"));
        }
        if self.content.trim().is_empty() {
            errors.push(FieldError::new("content", "content is required"));
        }
        if self.approvers.trim().is_empty() {
            errors.push(FieldError::new("approvers", "approvers is required"));
        }

        let doc_type = match self.doc_type.parse::<DocumentType>() {
            Ok(doc_type) => Some(doc_type),
            Err(_) => {
                errors.push(FieldError::new(
                    "type",
                    "type must be one of manual, sop, template, other",
                ));
                None
            }
        };

        // Exactly one parent, dictated by the type.
        if let Some(doc_type) = doc_type {
            if doc_type == DocumentType::Other {
                if self.other_doc_type_id.is_none() {
                    errors.push(FieldError::new(
                        "otherDocTypeId",
                        "otherDocTypeId is required for documents of type other",
                    ));
                }
                if self.subprocess_id.is_some() {
                    errors.push(FieldError::new(
                        "subprocessId",
                        "subprocessId must be absent for documents of type other",
                    ));
                }
            } else {
                if self.subprocess_id.is_none() {
                    errors.push(FieldError::new(
                        "subprocessId",
                        "subprocessId is required for this document type",
                    ));
                }
                if self.other_doc_type_id.is_some() {
                    errors.push(FieldError::new(
                        "otherDocTypeId",
                        "otherDocTypeId must be absent for this document type",
                    ));
                }
            }
        }

        let approval_date = parse_approval_date(&self.approval_date);
        if approval_date.is_none() {
            errors.push(FieldError::new(
                "approvalDate",
                "approvalDate must be an RFC 3339 timestamp or YYYY-MM-DD",
            ));
        }

        match (doc_type, approval_date) {
            (Some(doc_type), Some(approval_date)) if errors.is_empty() => Ok(NewDocument {
                name: self.name,
                doc_type,
                subprocess_id: self.subprocess_id,
                other_doc_type_id: self.other_doc_type_id,
                version: self
                    .version
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| "1.0".to_string()),
                description: self.description,
                content: self.content,
                approval_date,
                approvers: self.approvers,
                keywords: self.keywords,
                active: self.active,
            }),
            _ => Err(ApiError::Validation(errors)),
        }
    }
}

async fn ensure_parent_exists(state: &AppState, document: &NewDocument) -> Result<(), ApiError> {
    if let Some(subprocess_id) = document.subprocess_id {
        if state.storage.get_subprocess(subprocess_id).await?.is_none() {
            return Err(ApiError::Validation(vec![FieldError::new(
                "subprocessId",
                "referenced subprocess does not exist",
            )]));
        }
    }
    if let Some(other_doc_type_id) = document.other_doc_type_id {
        if state
            .storage
            .get_other_doc_type(other_doc_type_id)
            .await?
            .is_none()
        {
            return Err(ApiError::Validation(vec![FieldError::new(
                "otherDocTypeId",
                "referenced document type does not exist",
            )]));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentListQuery {
    subprocess_id: Option<i32>,
    other_doc_type_id: Option<i32>,
    #[serde(rename = "type")]
    doc_type: Option<String>,
}

/// `subprocessId` takes precedence over `otherDocTypeId`; both filtered
/// branches return active documents only.
async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DocumentListQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    if let Some(subprocess_id) = query.subprocess_id {
        let doc_type = match query.doc_type.as_deref() {
            Some(raw) => Some(raw.parse::<DocumentType>().map_err(|_| {
                ApiError::Validation(vec![FieldError::new(
                    "type",
                    "type must be one of manual, sop, template, other",
                )])
            })?),
            None => None,
        };
        let documents = state
            .storage
            .get_documents_by_subprocess(subprocess_id, doc_type)
            .await?;
        return Ok(Json(documents));
    }
    if let Some(other_doc_type_id) = query.other_doc_type_id {
        let documents = state
            .storage
            .get_documents_by_other_doc_type(other_doc_type_id)
            .await?;
        return Ok(Json(documents));
    }
    Ok(Json(state.storage.get_all_documents().await?))
}

async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<Document>, ApiError> {
    state
        .storage
        .get_document(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Document"))
}

async fn create_document(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Json(payload): Json<DocumentPayload>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let document = payload.validate()?;
    ensure_parent_exists(&state, &document).await?;
    let created = state.storage.create_document(document).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_document(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<DocumentPayload>,
) -> Result<Json<Document>, ApiError> {
    let document = payload.validate()?;
    ensure_parent_exists(&state, &document).await?;
    state
        .storage
        .update_document(id, document)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Document"))
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.storage.delete_document(id).await? {
        return Err(ApiError::NotFound("Document"));
    }
    Ok(Json(serde_json::json!({ "message": "Document deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> DocumentPayload {
        DocumentPayload {
            name: "Calibration manual".to_string(),
            doc_type: "manual".to_string(),
            subprocess_id: Some(3),
            other_doc_type_id: None,
            version: None,
            description: None,
            content: "Step one".to_string(),
            approval_date: "2024-01-01".to_string(),
            approvers: "QA lead".to_string(),
            keywords: vec![],
            active: true,
        }
    }

    #[test]
    fn bare_date_is_midnight_utc() {
        let parsed = parse_approval_date("2024-01-01").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn valid_payload_defaults_version() {
        let document = payload().validate().unwrap();
        assert_eq!(document.version, "1.0");
        assert_eq!(document.doc_type, DocumentType::Manual);
    }

    #[test]
    fn other_type_requires_other_doc_type_id() {
        let mut bad = payload();
        bad.doc_type = "other".to_string();
        let Err(ApiError::Validation(errors)) = bad.validate() else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"otherDocTypeId"));
        assert!(fields.contains(&"subprocessId"));
    }

    #[test]
    fn non_other_type_rejects_other_doc_type_id() {
        let mut bad = payload();
        bad.other_doc_type_id = Some(1);
        let Err(ApiError::Validation(errors)) = bad.validate() else {
            panic!("expected validation error");
        };
        assert!(errors.iter().any(|e| e.field == "otherDocTypeId"));
    }

    #[test]
    fn unknown_type_and_bad_date_are_both_reported() {
        let mut bad = payload();
        bad.doc_type = "whitepaper".to_string();
        bad.approval_date = "yesterday".to_string();
        let Err(ApiError::Validation(errors)) = bad.validate() else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"type"));
        assert!(fields.contains(&"approvalDate"));
    }
}
