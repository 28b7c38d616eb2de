pub mod error;
pub mod models;
pub mod schema;
pub mod state;
