//! HTTP surface for the queue API
//!
//! Serves the public queue endpoints plus health and metrics over a single
//! axum router. Every queue response uses the `{status, message, data}`
//! envelope; callers never see a bare stack trace.

pub mod auth;
pub mod server;

pub use auth::AuthedUser;
pub use server::{create_router, ApiState, HttpServer};
