//! HTTP request surface for the clip pipeline.
//!
//! One bearer-authenticated endpoint accepts a storage path plus clip
//! configuration, runs the full pipeline synchronously and responds with
//! the uploaded clip keys.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
