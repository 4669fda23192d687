// Request middleware - resolves the acting user before handlers run

pub mod viewer_context_extractor;
pub mod viewer_context_middleware;

pub use viewer_context_extractor::Viewer;
pub use viewer_context_middleware::*;
