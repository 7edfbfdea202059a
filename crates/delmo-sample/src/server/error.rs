//! # Store Errors

/// Errors the in-memory store and its client can report.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Store closed")]
    StoreClosed,
    #[error("Store dropped response channel")]
    StoreDropped,
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}
