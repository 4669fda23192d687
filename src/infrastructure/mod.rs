// Core infrastructure modules
pub mod database;              // Document store interface
pub mod sqlite_database;       // SQLite-backed document store
pub mod query;                 // Filters, updates and aggregation pipelines
pub mod media;                 // External media host
pub mod security;              // Passwords and tokens
pub mod middleware;            // Viewer middleware and extractor
pub mod viewer;                // Viewer context

// Re-export core infrastructure components
pub use database::{DeleteOp, DocumentStore, Store};
pub use media::{MediaHost, MediaService, ResourceKind, UploadedMedia};
pub use security::SecurityService;
pub use sqlite_database::SqliteDocumentStore;
pub use viewer::ViewerContext;
