pub mod api;
pub mod api_router;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod embedded_ui;
pub mod shared;
pub mod storage;
