// vidshare - video-sharing platform backend

// Core types and primitives
pub mod core;

// Infrastructure - document store, media host, auth plumbing
pub mod infrastructure;

// Stored documents and their access helpers
pub mod entities;

// Read composition over the document store
pub mod feeds;

// Business operations and the HTTP surface
pub mod services;
pub mod api;

// Common utilities
pub mod app_state;
pub mod config;
pub mod error;
pub mod response;

// Re-exports for convenience
pub use api::create_router;
pub use app_state::AppState;
pub use error::{AppError, AppResult};
