//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server exposing the manual triggers.

mod auth;
mod handlers;
mod server;

pub use auth::TRIGGER_TOKEN_HEADER;
pub use handlers::{ApiError, AppState, SERVICE_NAME};
pub use server::HttpServer;
