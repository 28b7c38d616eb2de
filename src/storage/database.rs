//! Postgres-backed store (diesel + r2d2).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use super::{Storage, StorageResult};
use crate::config::DatabaseConfig;
use crate::shared::models::{
    Comment, Document, DocumentType, NewComment, NewDocument, NewOtherDocType, NewProcess,
    NewSubprocess, NewUser, OtherDocType, Process, ProcessCategory, Subprocess, User,
};
use crate::shared::schema::{comments, documents, other_doc_types, processes, subprocesses, users};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

diesel::define_sql_function! {
    fn lower(x: diesel::sql_types::Text) -> diesel::sql_types::Text;
}

pub fn create_pool(config: &DatabaseConfig) -> anyhow::Result<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(&config.url);
    let pool = Pool::builder()
        .max_size(config.max_connections)
        .build(manager)?;
    Ok(pool)
}

pub struct DbStorage {
    pool: DbPool,
}

impl DbStorage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn run_migrations(&self) -> anyhow::Result<()> {
        let mut conn = self.pool.get()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("migrations failed: {e}"))?;
        Ok(())
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
struct UserRow {
    username: String,
    password: String,
    full_name: String,
    is_admin: bool,
    kpi_iframe_url: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = processes)]
struct ProcessRow {
    name: String,
    category: ProcessCategory,
    icon: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = processes)]
struct ProcessChangeset {
    name: String,
    category: ProcessCategory,
    icon: String,
    updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = subprocesses)]
struct SubprocessRow {
    name: String,
    process_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = subprocesses)]
struct SubprocessChangeset {
    name: String,
    process_id: i32,
    updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = other_doc_types)]
struct OtherDocTypeRow {
    name: String,
    icon: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = other_doc_types)]
struct OtherDocTypeChangeset {
    name: String,
    icon: String,
    updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = documents)]
struct DocumentRow {
    name: String,
    doc_type: DocumentType,
    subprocess_id: Option<i32>,
    other_doc_type_id: Option<i32>,
    version: String,
    description: Option<String>,
    content: String,
    approval_date: DateTime<Utc>,
    approvers: String,
    keywords: Vec<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

// Full-replace semantics: None must overwrite with NULL, not be skipped.
#[derive(AsChangeset)]
#[diesel(table_name = documents)]
#[diesel(treat_none_as_null = true)]
struct DocumentChangeset {
    name: String,
    doc_type: DocumentType,
    subprocess_id: Option<i32>,
    other_doc_type_id: Option<i32>,
    version: String,
    description: Option<String>,
    content: String,
    approval_date: DateTime<Utc>,
    approvers: String,
    keywords: Vec<String>,
    active: bool,
    updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = comments)]
struct CommentRow {
    document_id: i32,
    user_id: i32,
    text: String,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl Storage for DbStorage {
    async fn get_user(&self, id: i32) -> StorageResult<Option<User>> {
        let mut conn = self.pool.get()?;
        Ok(users::table.find(id).first(&mut conn).optional()?)
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let mut conn = self.pool.get()?;
        Ok(users::table
            .filter(lower(users::username).eq(username.to_lowercase()))
            .first(&mut conn)
            .optional()?)
    }

    async fn get_all_users(&self) -> StorageResult<Vec<User>> {
        let mut conn = self.pool.get()?;
        Ok(users::table.order(users::id.asc()).load(&mut conn)?)
    }

    async fn count_users(&self) -> StorageResult<i64> {
        let mut conn = self.pool.get()?;
        Ok(users::table.count().get_result(&mut conn)?)
    }

    async fn create_user(&self, user: NewUser) -> StorageResult<User> {
        let mut conn = self.pool.get()?;
        let row = UserRow {
            username: user.username,
            password: user.password,
            full_name: user.full_name,
            is_admin: user.is_admin,
            kpi_iframe_url: user.kpi_iframe_url,
        };
        Ok(diesel::insert_into(users::table)
            .values(&row)
            .get_result(&mut conn)?)
    }

    async fn update_user_kpi_config(
        &self,
        id: i32,
        kpi_iframe_url: Option<String>,
    ) -> StorageResult<Option<User>> {
        let mut conn = self.pool.get()?;
        Ok(diesel::update(users::table.find(id))
            .set(users::kpi_iframe_url.eq(kpi_iframe_url))
            .get_result(&mut conn)
            .optional()?)
    }

    async fn get_process(&self, id: i32) -> StorageResult<Option<Process>> {
        let mut conn = self.pool.get()?;
        Ok(processes::table.find(id).first(&mut conn).optional()?)
    }

    async fn get_all_processes(&self) -> StorageResult<Vec<Process>> {
        let mut conn = self.pool.get()?;
        Ok(processes::table
            .order(processes::id.asc())
            .load(&mut conn)?)
    }

    async fn create_process(&self, process: NewProcess) -> StorageResult<Process> {
        let mut conn = self.pool.get()?;
        let now = Utc::now();
        let row = ProcessRow {
            name: process.name,
            category: process.category,
            icon: process.icon,
            created_at: now,
            updated_at: now,
        };
        Ok(diesel::insert_into(processes::table)
            .values(&row)
            .get_result(&mut conn)?)
    }

    async fn update_process(&self, id: i32, process: NewProcess) -> StorageResult<Option<Process>> {
        let mut conn = self.pool.get()?;
        let changes = ProcessChangeset {
            name: process.name,
            category: process.category,
            icon: process.icon,
            updated_at: Utc::now(),
        };
        Ok(diesel::update(processes::table.find(id))
            .set(&changes)
            .get_result(&mut conn)
            .optional()?)
    }

    async fn delete_process(&self, id: i32) -> StorageResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(diesel::delete(processes::table.find(id)).execute(&mut conn)? > 0)
    }

    async fn has_subprocesses_for_process(&self, process_id: i32) -> StorageResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(diesel::select(exists(
            subprocesses::table.filter(subprocesses::process_id.eq(process_id)),
        ))
        .get_result(&mut conn)?)
    }

    async fn get_subprocess(&self, id: i32) -> StorageResult<Option<Subprocess>> {
        let mut conn = self.pool.get()?;
        Ok(subprocesses::table.find(id).first(&mut conn).optional()?)
    }

    async fn get_all_subprocesses(&self) -> StorageResult<Vec<Subprocess>> {
        let mut conn = self.pool.get()?;
        Ok(subprocesses::table
            .order(subprocesses::id.asc())
            .load(&mut conn)?)
    }

    async fn get_subprocesses_by_process(&self, process_id: i32) -> StorageResult<Vec<Subprocess>> {
        let mut conn = self.pool.get()?;
        Ok(subprocesses::table
            .filter(subprocesses::process_id.eq(process_id))
            .order(subprocesses::id.asc())
            .load(&mut conn)?)
    }

    async fn create_subprocess(&self, subprocess: NewSubprocess) -> StorageResult<Subprocess> {
        let mut conn = self.pool.get()?;
        let now = Utc::now();
        let row = SubprocessRow {
            name: subprocess.name,
            process_id: subprocess.process_id,
            created_at: now,
            updated_at: now,
        };
        Ok(diesel::insert_into(subprocesses::table)
            .values(&row)
            .get_result(&mut conn)?)
    }

    async fn update_subprocess(
        &self,
        id: i32,
        subprocess: NewSubprocess,
    ) -> StorageResult<Option<Subprocess>> {
        let mut conn = self.pool.get()?;
        let changes = SubprocessChangeset {
            name: subprocess.name,
            process_id: subprocess.process_id,
            updated_at: Utc::now(),
        };
        Ok(diesel::update(subprocesses::table.find(id))
            .set(&changes)
            .get_result(&mut conn)
            .optional()?)
    }

    async fn delete_subprocess(&self, id: i32) -> StorageResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(diesel::delete(subprocesses::table.find(id)).execute(&mut conn)? > 0)
    }

    async fn has_documents_for_subprocess(&self, subprocess_id: i32) -> StorageResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(diesel::select(exists(
            documents::table.filter(documents::subprocess_id.eq(subprocess_id)),
        ))
        .get_result(&mut conn)?)
    }

    async fn get_document(&self, id: i32) -> StorageResult<Option<Document>> {
        let mut conn = self.pool.get()?;
        Ok(documents::table.find(id).first(&mut conn).optional()?)
    }

    async fn get_all_documents(&self) -> StorageResult<Vec<Document>> {
        let mut conn = self.pool.get()?;
        Ok(documents::table
            .order(documents::id.asc())
            .load(&mut conn)?)
    }

    async fn get_documents_by_subprocess(
        &self,
        subprocess_id: i32,
        doc_type: Option<DocumentType>,
    ) -> StorageResult<Vec<Document>> {
        let mut conn = self.pool.get()?;
        let mut query = documents::table
            .filter(documents::subprocess_id.eq(subprocess_id))
            .filter(documents::active.eq(true))
            .into_boxed();
        if let Some(doc_type) = doc_type {
            query = query.filter(documents::doc_type.eq(doc_type.as_str()));
        }
        Ok(query.order(documents::id.asc()).load(&mut conn)?)
    }

    async fn get_documents_by_other_doc_type(
        &self,
        other_doc_type_id: i32,
    ) -> StorageResult<Vec<Document>> {
        let mut conn = self.pool.get()?;
        Ok(documents::table
            .filter(documents::other_doc_type_id.eq(other_doc_type_id))
            .filter(documents::active.eq(true))
            .order(documents::id.asc())
            .load(&mut conn)?)
    }

    async fn create_document(&self, document: NewDocument) -> StorageResult<Document> {
        let mut conn = self.pool.get()?;
        let now = Utc::now();
        let row = DocumentRow {
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
        Ok(diesel::insert_into(documents::table)
            .values(&row)
            .get_result(&mut conn)?)
    }

    async fn update_document(
        &self,
        id: i32,
        document: NewDocument,
    ) -> StorageResult<Option<Document>> {
        let mut conn = self.pool.get()?;
        let changes = DocumentChangeset {
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
            updated_at: Utc::now(),
        };
        Ok(diesel::update(documents::table.find(id))
            .set(&changes)
            .get_result(&mut conn)
            .optional()?)
    }

    async fn delete_document(&self, id: i32) -> StorageResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(diesel::delete(documents::table.find(id)).execute(&mut conn)? > 0)
    }

    async fn get_other_doc_type(&self, id: i32) -> StorageResult<Option<OtherDocType>> {
        let mut conn = self.pool.get()?;
        Ok(other_doc_types::table.find(id).first(&mut conn).optional()?)
    }

    async fn get_all_other_doc_types(&self) -> StorageResult<Vec<OtherDocType>> {
        let mut conn = self.pool.get()?;
        Ok(other_doc_types::table
            .order(other_doc_types::id.asc())
            .load(&mut conn)?)
    }

    async fn create_other_doc_type(
        &self,
        other_doc_type: NewOtherDocType,
    ) -> StorageResult<OtherDocType> {
        let mut conn = self.pool.get()?;
        let now = Utc::now();
        let row = OtherDocTypeRow {
            name: other_doc_type.name,
            icon: other_doc_type.icon,
            created_at: now,
            updated_at: now,
        };
        Ok(diesel::insert_into(other_doc_types::table)
            .values(&row)
            .get_result(&mut conn)?)
    }

    async fn update_other_doc_type(
        &self,
        id: i32,
        other_doc_type: NewOtherDocType,
    ) -> StorageResult<Option<OtherDocType>> {
        let mut conn = self.pool.get()?;
        let changes = OtherDocTypeChangeset {
            name: other_doc_type.name,
            icon: other_doc_type.icon,
            updated_at: Utc::now(),
        };
        Ok(diesel::update(other_doc_types::table.find(id))
            .set(&changes)
            .get_result(&mut conn)
            .optional()?)
    }

    async fn delete_other_doc_type(&self, id: i32) -> StorageResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(diesel::delete(other_doc_types::table.find(id)).execute(&mut conn)? > 0)
    }

    async fn has_documents_for_other_doc_type(
        &self,
        other_doc_type_id: i32,
    ) -> StorageResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(diesel::select(exists(
            documents::table.filter(documents::other_doc_type_id.eq(other_doc_type_id)),
        ))
        .get_result(&mut conn)?)
    }

    async fn get_comments_by_document(&self, document_id: i32) -> StorageResult<Vec<Comment>> {
        let mut conn = self.pool.get()?;
        Ok(comments::table
            .filter(comments::document_id.eq(document_id))
            .order((comments::created_at.asc(), comments::id.asc()))
            .load(&mut conn)?)
    }

    async fn create_comment(&self, comment: NewComment) -> StorageResult<Comment> {
        let mut conn = self.pool.get()?;
        let row = CommentRow {
            document_id: comment.document_id,
            user_id: comment.user_id,
            text: comment.text,
            created_at: Utc::now(),
        };
        Ok(diesel::insert_into(comments::table)
            .values(&row)
            .get_result(&mut conn)?)
    }
}
