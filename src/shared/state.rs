use std::sync::Arc;

use crate::auth::session::SessionManager;
use crate::storage::Storage;

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub sessions: Arc<SessionManager>,
}
