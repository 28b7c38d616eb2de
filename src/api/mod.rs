//! REST route modules, one per entity. Each exposes a
//! `configure_*_routes()` that returns a `Router<Arc<AppState>>` merged in
//! the top-level router.

pub mod comments;
pub mod documents;
pub mod other_doc_types;
pub mod processes;
pub mod subprocesses;
pub mod users;

use axum::Router;
use std::sync::Arc;

use crate::shared::state::AppState;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(processes::configure_process_routes())
        .merge(subprocesses::configure_subprocess_routes())
        .merge(documents::configure_document_routes())
        .merge(comments::configure_comment_routes())
        .merge(other_doc_types::configure_other_doc_type_routes())
        .merge(users::configure_user_routes())
}
