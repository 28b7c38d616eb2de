//! Map-backed store for tests and ephemeral deployments.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Storage, StorageResult};
use crate::shared::models::{
    Comment, Document, DocumentType, NewComment, NewDocument, NewOtherDocType, NewProcess,
    NewSubprocess, NewUser, OtherDocType, Process, Subprocess, User,
};

#[derive(Default)]
struct Inner {
    users: HashMap<i32, User>,
    processes: HashMap<i32, Process>,
    subprocesses: HashMap<i32, Subprocess>,
    documents: HashMap<i32, Document>,
    other_doc_types: HashMap<i32, OtherDocType>,
    comments: HashMap<i32, Comment>,
    next_user_id: i32,
    next_process_id: i32,
    next_subprocess_id: i32,
    next_document_id: i32,
    next_other_doc_type_id: i32,
    next_comment_id: i32,
}

pub struct MemStorage {
    inner: RwLock<Inner>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn by_id<T: Clone>(map: &HashMap<i32, T>, id_of: impl Fn(&T) -> i32) -> Vec<T> {
    let mut items: Vec<T> = map.values().cloned().collect();
    items.sort_by_key(|item| id_of(item));
    items
}

#[async_trait]
impl Storage for MemStorage {
    async fn get_user(&self, id: i32) -> StorageResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let needle = username.to_lowercase();
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|user| user.username.to_lowercase() == needle)
            .cloned())
    }

    async fn get_all_users(&self) -> StorageResult<Vec<User>> {
        Ok(by_id(&self.inner.read().await.users, |u| u.id))
    }

    async fn count_users(&self) -> StorageResult<i64> {
        Ok(self.inner.read().await.users.len() as i64)
    }

    async fn create_user(&self, user: NewUser) -> StorageResult<User> {
        let mut inner = self.inner.write().await;
        inner.next_user_id += 1;
        let created = User {
            id: inner.next_user_id,
            username: user.username,
            password: user.password,
            full_name: user.full_name,
            is_admin: user.is_admin,
            kpi_iframe_url: user.kpi_iframe_url,
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_user_kpi_config(
        &self,
        id: i32,
        kpi_iframe_url: Option<String>,
    ) -> StorageResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|user| {
            user.kpi_iframe_url = kpi_iframe_url;
            user.clone()
        }))
    }

    async fn get_process(&self, id: i32) -> StorageResult<Option<Process>> {
        Ok(self.inner.read().await.processes.get(&id).cloned())
    }

    async fn get_all_processes(&self) -> StorageResult<Vec<Process>> {
        Ok(by_id(&self.inner.read().await.processes, |p| p.id))
    }

    async fn create_process(&self, process: NewProcess) -> StorageResult<Process> {
        let mut inner = self.inner.write().await;
        inner.next_process_id += 1;
        let now = Utc::now();
        let created = Process {
            id: inner.next_process_id,
            name: process.name,
            category: process.category,
            icon: process.icon,
            created_at: now,
            updated_at: now,
        };
        inner.processes.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_process(&self, id: i32, process: NewProcess) -> StorageResult<Option<Process>> {
        let mut inner = self.inner.write().await;
        Ok(inner.processes.get_mut(&id).map(|existing| {
            existing.name = process.name;
            existing.category = process.category;
            existing.icon = process.icon;
            existing.updated_at = Utc::now();
            existing.clone()
        }))
    }

    async fn delete_process(&self, id: i32) -> StorageResult<bool> {
        Ok(self.inner.write().await.processes.remove(&id).is_some())
    }

    async fn has_subprocesses_for_process(&self, process_id: i32) -> StorageResult<bool> {
        Ok(self
            .inner
            .read()
            .await
            .subprocesses
            .values()
            .any(|s| s.process_id == process_id))
    }

    async fn get_subprocess(&self, id: i32) -> StorageResult<Option<Subprocess>> {
        Ok(self.inner.read().await.subprocesses.get(&id).cloned())
    }

    async fn get_all_subprocesses(&self) -> StorageResult<Vec<Subprocess>> {
        Ok(by_id(&self.inner.read().await.subprocesses, |s| s.id))
    }

    async fn get_subprocesses_by_process(&self, process_id: i32) -> StorageResult<Vec<Subprocess>> {
        let mut items: Vec<Subprocess> = self
            .inner
            .read()
            .await
            .subprocesses
            .values()
            .filter(|s| s.process_id == process_id)
            .cloned()
            .collect();
        items.sort_by_key(|s| s.id);
        Ok(items)
    }

    async fn create_subprocess(&self, subprocess: NewSubprocess) -> StorageResult<Subprocess> {
        let mut inner = self.inner.write().await;
        inner.next_subprocess_id += 1;
        let now = Utc::now();
        let created = Subprocess {
            id: inner.next_subprocess_id,
            name: subprocess.name,
            process_id: subprocess.process_id,
            created_at: now,
            updated_at: now,
        };
        inner.subprocesses.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_subprocess(
        &self,
        id: i32,
        subprocess: NewSubprocess,
    ) -> StorageResult<Option<Subprocess>> {
        let mut inner = self.inner.write().await;
        Ok(inner.subprocesses.get_mut(&id).map(|existing| {
            existing.name = subprocess.name;
            existing.process_id = subprocess.process_id;
            existing.updated_at = Utc::now();
            existing.clone()
        }))
    }

    async fn delete_subprocess(&self, id: i32) -> StorageResult<bool> {
        Ok(self.inner.write().await.subprocesses.remove(&id).is_some())
    }

    async fn has_documents_for_subprocess(&self, subprocess_id: i32) -> StorageResult<bool> {
        Ok(self
            .inner
            .read()
            .await
            .documents
            .values()
            .any(|d| d.subprocess_id == Some(subprocess_id)))
    }

    async fn get_document(&self, id: i32) -> StorageResult<Option<Document>> {
        Ok(self.inner.read().await.documents.get(&id).cloned())
    }

    async fn get_all_documents(&self) -> StorageResult<Vec<Document>> {
        Ok(by_id(&self.inner.read().await.documents, |d| d.id))
    }

    async fn get_documents_by_subprocess(
        &self,
        subprocess_id: i32,
        doc_type: Option<DocumentType>,
    ) -> StorageResult<Vec<Document>> {
        let mut items: Vec<Document> = self
            .inner
            .read()
            .await
            .documents
            .values()
            .filter(|d| d.subprocess_id == Some(subprocess_id) && d.active)
            .filter(|d| doc_type.map_or(true, |t| d.doc_type == t))
            .cloned()
            .collect();
        items.sort_by_key(|d| d.id);
        Ok(items)
    }

    async fn get_documents_by_other_doc_type(
        &self,
        other_doc_type_id: i32,
    ) -> StorageResult<Vec<Document>> {
        let mut items: Vec<Document> = self
            .inner
            .read()
            .await
            .documents
            .values()
            .filter(|d| d.other_doc_type_id == Some(other_doc_type_id) && d.active)
            .cloned()
            .collect();
        items.sort_by_key(|d| d.id);
        Ok(items)
    }

    async fn create_document(&self, document: NewDocument) -> StorageResult<Document> {
        let mut inner = self.inner.write().await;
        inner.next_document_id += 1;
        let now = Utc::now();
        let created = Document {
            id: inner.next_document_id,
            name: document.name,
            doc_type: document.doc_type,
            subprocess_id: document.subprocess_id,
            other_doc_type_id: document.other_doc_type_id,
            version: document.version,
            description: document.description,
            content: document.content,
            approval_date: document.approval_date,
            approvers: document.approvers,
            keywords: document.keywords,
            active: document.active,
            created_at: now,
            updated_at: now,
        };
        inner.documents.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_document(
        &self,
        id: i32,
        document: NewDocument,
    ) -> StorageResult<Option<Document>> {
        let mut inner = self.inner.write().await;
        Ok(inner.documents.get_mut(&id).map(|existing| {
            existing.name = document.name;
            existing.doc_type = document.doc_type;
            existing.subprocess_id = document.subprocess_id;
            existing.other_doc_type_id = document.other_doc_type_id;
            existing.version = document.version;
            existing.description = document.description;
            existing.content = document.content;
            existing.approval_date = document.approval_date;
            existing.approvers = document.approvers;
            existing.keywords = document.keywords;
            existing.active = document.active;
            existing.updated_at = Utc::now();
            existing.clone()
        }))
    }

    async fn delete_document(&self, id: i32) -> StorageResult<bool> {
        Ok(self.inner.write().await.documents.remove(&id).is_some())
    }

    async fn get_other_doc_type(&self, id: i32) -> StorageResult<Option<OtherDocType>> {
        Ok(self.inner.read().await.other_doc_types.get(&id).cloned())
    }

    async fn get_all_other_doc_types(&self) -> StorageResult<Vec<OtherDocType>> {
        Ok(by_id(&self.inner.read().await.other_doc_types, |t| t.id))
    }

    async fn create_other_doc_type(
        &self,
        other_doc_type: NewOtherDocType,
    ) -> StorageResult<OtherDocType> {
        let mut inner = self.inner.write().await;
        inner.next_other_doc_type_id += 1;
        let now = Utc::now();
        let created = OtherDocType {
            id: inner.next_other_doc_type_id,
            name: other_doc_type.name,
            icon: other_doc_type.icon,
            created_at: now,
            updated_at: now,
        };
        inner.other_doc_types.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_other_doc_type(
        &self,
        id: i32,
        other_doc_type: NewOtherDocType,
    ) -> StorageResult<Option<OtherDocType>> {
        let mut inner = self.inner.write().await;
        Ok(inner.other_doc_types.get_mut(&id).map(|existing| {
            existing.name = other_doc_type.name;
            existing.icon = other_doc_type.icon;
            existing.updated_at = Utc::now();
            existing.clone()
        }))
    }

    async fn delete_other_doc_type(&self, id: i32) -> StorageResult<bool> {
        Ok(self
            .inner
            .write()
            .await
            .other_doc_types
            .remove(&id)
            .is_some())
    }

    async fn has_documents_for_other_doc_type(
        &self,
        other_doc_type_id: i32,
    ) -> StorageResult<bool> {
        Ok(self
            .inner
            .read()
            .await
            .documents
            .values()
            .any(|d| d.other_doc_type_id == Some(other_doc_type_id)))
    }

    async fn get_comments_by_document(&self, document_id: i32) -> StorageResult<Vec<Comment>> {
        let mut items: Vec<Comment> = self
            .inner
            .read()
            .await
            .comments
            .values()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn create_comment(&self, comment: NewComment) -> StorageResult<Comment> {
        let mut inner = self.inner.write().await;
        inner.next_comment_id += 1;
        let created = Comment {
            id: inner.next_comment_id,
            document_id: comment.document_id,
            user_id: comment.user_id,
            text: comment.text,
            created_at: Utc::now(),
        };
        inner.comments.insert(created.id, created.clone());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ProcessCategory;

    fn sample_process() -> NewProcess {
        NewProcess {
            name: "Production".to_string(),
            category: ProcessCategory::Operational,
            icon: "hammer-line".to_string(),
        }
    }

    fn sample_document(subprocess_id: i32, active: bool) -> NewDocument {
        NewDocument {
            name: "Quality Manual".to_string(),
            doc_type: DocumentType::Manual,
            subprocess_id: Some(subprocess_id),
            other_doc_type_id: None,
            version: "1.0".to_string(),
            description: None,
            content: "body".to_string(),
            approval_date: Utc::now(),
            approvers: "Quality Dept".to_string(),
            keywords: vec!["quality".to_string()],
            active,
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_equal_entity() {
        let store = MemStorage::new();
        let created = store.create_process(sample_process()).await.unwrap();
        assert_eq!(created.id, 1);

        let fetched = store.get_process(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Production");
        assert_eq!(fetched.category, ProcessCategory::Operational);
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[tokio::test]
    async fn ids_are_sequential_per_entity() {
        let store = MemStorage::new();
        let first = store.create_process(sample_process()).await.unwrap();
        let second = store.create_process(sample_process()).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        // Independent counter per entity type.
        let other = store
            .create_other_doc_type(NewOtherDocType {
                name: "Internal Policies".to_string(),
                icon: "file-text-line".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(other.id, 1);
    }

    #[tokio::test]
    async fn update_missing_id_returns_none_and_mutates_nothing() {
        let store = MemStorage::new();
        let result = store.update_process(99, sample_process()).await.unwrap();
        assert!(result.is_none());
        assert!(store.get_all_processes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_delete_returns_false() {
        let store = MemStorage::new();
        let process = store.create_process(sample_process()).await.unwrap();
        assert!(store.delete_process(process.id).await.unwrap());
        assert!(!store.delete_process(process.id).await.unwrap());
    }

    #[tokio::test]
    async fn listing_hides_inactive_documents_but_get_returns_them() {
        let store = MemStorage::new();
        let process = store.create_process(sample_process()).await.unwrap();
        let subprocess = store
            .create_subprocess(NewSubprocess {
                name: "Quality Control".to_string(),
                process_id: process.id,
            })
            .await
            .unwrap();

        let visible = store
            .create_document(sample_document(subprocess.id, true))
            .await
            .unwrap();
        let hidden = store
            .create_document(sample_document(subprocess.id, false))
            .await
            .unwrap();

        let listed = store
            .get_documents_by_subprocess(subprocess.id, None)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, visible.id);

        assert!(store.get_document(hidden.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn subprocess_type_filter_applies() {
        let store = MemStorage::new();
        let process = store.create_process(sample_process()).await.unwrap();
        let subprocess = store
            .create_subprocess(NewSubprocess {
                name: "Processing".to_string(),
                process_id: process.id,
            })
            .await
            .unwrap();

        store
            .create_document(sample_document(subprocess.id, true))
            .await
            .unwrap();
        let mut sop = sample_document(subprocess.id, true);
        sop.doc_type = DocumentType::Sop;
        store.create_document(sop).await.unwrap();

        let manuals = store
            .get_documents_by_subprocess(subprocess.id, Some(DocumentType::Manual))
            .await
            .unwrap();
        assert_eq!(manuals.len(), 1);
        assert_eq!(manuals[0].doc_type, DocumentType::Manual);
    }

    #[tokio::test]
    async fn username_lookup_is_case_insensitive() {
        let store = MemStorage::new();
        store
            .create_user(NewUser {
                username: "Andrea".to_string(),
                password: "hash".to_string(),
                full_name: "Andrea Vin".to_string(),
                is_admin: true,
                kpi_iframe_url: None,
            })
            .await
            .unwrap();

        let found = store.get_user_by_username("aNdReA").await.unwrap();
        assert!(found.is_some());
        assert!(store.get_user_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn comments_sorted_by_creation_time() {
        let store = MemStorage::new();
        for text in ["first", "second", "third"] {
            store
                .create_comment(NewComment {
                    document_id: 1,
                    user_id: 1,
                    text: text.to_string(),
                })
                .await
                .unwrap();
        }

        let comments = store.get_comments_by_document(1).await.unwrap();
        let texts: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn deleting_process_leaves_no_cascade() {
        let store = MemStorage::new();
        let process = store.create_process(sample_process()).await.unwrap();
        store
            .create_subprocess(NewSubprocess {
                name: "Audits".to_string(),
                process_id: process.id,
            })
            .await
            .unwrap();

        assert!(store
            .has_subprocesses_for_process(process.id)
            .await
            .unwrap());
        store.delete_process(process.id).await.unwrap();
        // The subprocess row survives; the route layer is the cascade guard.
        assert_eq!(store.get_all_subprocesses().await.unwrap().len(), 1);
    }
}
