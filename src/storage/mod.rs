//! Repository contract with two interchangeable backends.
//!
//! Both backends assign sequential integer ids and server timestamps, list in
//! insertion order, and hide inactive documents from filtered listings while
//! keeping them reachable by direct id lookup.

pub mod database;
pub mod memory;

use async_trait::async_trait;

use crate::shared::models::{
    Comment, Document, DocumentType, NewComment, NewDocument, NewOtherDocType, NewProcess,
    NewSubprocess, NewUser, OtherDocType, Process, Subprocess, User,
};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("database query error: {0}")]
    Query(#[from] diesel::result::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    // Users
    async fn get_user(&self, id: i32) -> StorageResult<Option<User>>;
    /// Case-insensitive username lookup.
    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>>;
    async fn get_all_users(&self) -> StorageResult<Vec<User>>;
    async fn count_users(&self) -> StorageResult<i64>;
    async fn create_user(&self, user: NewUser) -> StorageResult<User>;
    async fn update_user_kpi_config(
        &self,
        id: i32,
        kpi_iframe_url: Option<String>,
    ) -> StorageResult<Option<User>>;

    // Processes
    async fn get_process(&self, id: i32) -> StorageResult<Option<Process>>;
    async fn get_all_processes(&self) -> StorageResult<Vec<Process>>;
    async fn create_process(&self, process: NewProcess) -> StorageResult<Process>;
    async fn update_process(&self, id: i32, process: NewProcess) -> StorageResult<Option<Process>>;
    async fn delete_process(&self, id: i32) -> StorageResult<bool>;
    async fn has_subprocesses_for_process(&self, process_id: i32) -> StorageResult<bool>;

    // Subprocesses
    async fn get_subprocess(&self, id: i32) -> StorageResult<Option<Subprocess>>;
    async fn get_all_subprocesses(&self) -> StorageResult<Vec<Subprocess>>;
    async fn get_subprocesses_by_process(&self, process_id: i32) -> StorageResult<Vec<Subprocess>>;
    async fn create_subprocess(&self, subprocess: NewSubprocess) -> StorageResult<Subprocess>;
    async fn update_subprocess(
        &self,
        id: i32,
        subprocess: NewSubprocess,
    ) -> StorageResult<Option<Subprocess>>;
    async fn delete_subprocess(&self, id: i32) -> StorageResult<bool>;
    async fn has_documents_for_subprocess(&self, subprocess_id: i32) -> StorageResult<bool>;

    // Documents
    async fn get_document(&self, id: i32) -> StorageResult<Option<Document>>;
    async fn get_all_documents(&self) -> StorageResult<Vec<Document>>;
    /// Active documents under a subprocess, optionally narrowed by type.
    async fn get_documents_by_subprocess(
        &self,
        subprocess_id: i32,
        doc_type: Option<DocumentType>,
    ) -> StorageResult<Vec<Document>>;
    /// Active documents under an other-doc-type bucket.
    async fn get_documents_by_other_doc_type(
        &self,
        other_doc_type_id: i32,
    ) -> StorageResult<Vec<Document>>;
    async fn create_document(&self, document: NewDocument) -> StorageResult<Document>;
    async fn update_document(
        &self,
        id: i32,
        document: NewDocument,
    ) -> StorageResult<Option<Document>>;
    async fn delete_document(&self, id: i32) -> StorageResult<bool>;

    // Other document types
    async fn get_other_doc_type(&self, id: i32) -> StorageResult<Option<OtherDocType>>;
    async fn get_all_other_doc_types(&self) -> StorageResult<Vec<OtherDocType>>;
    async fn create_other_doc_type(
        &self,
        other_doc_type: NewOtherDocType,
    ) -> StorageResult<OtherDocType>;
    async fn update_other_doc_type(
        &self,
        id: i32,
        other_doc_type: NewOtherDocType,
    ) -> StorageResult<Option<OtherDocType>>;
    async fn delete_other_doc_type(&self, id: i32) -> StorageResult<bool>;
    async fn has_documents_for_other_doc_type(
        &self,
        other_doc_type_id: i32,
    ) -> StorageResult<bool>;

    // Comments (append-only)
    /// Ascending by creation time.
    async fn get_comments_by_document(&self, document_id: i32) -> StorageResult<Vec<Comment>>;
    async fn create_comment(&self, comment: NewComment) -> StorageResult<Comment>;
}
