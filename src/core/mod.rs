// Core types and primitives shared by the store, pipelines and entities

pub mod document;
pub mod strong_types;

// Re-export commonly used types
pub use strong_types::{DocId, Timestamp};
