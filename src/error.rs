//! # Model Errors
//!
//! This module defines the error type shared by every pipeline, hook and
//! transport. Hooks and transports return [`ModelError`] directly, so a failure
//! raised anywhere in a pipeline reaches the caller unchanged.

use crate::transport::Response;
use serde_json::Value;

/// Message carried by the rejection `save` produces when nothing changed.
pub const SAME_OBJECT: &str = "same object.";

/// Convenience alias used throughout the crate.
pub type Result<T, E = ModelError> = std::result::Result<T, E>;

/// Errors that can occur while running a model operation.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The response interpreter rejected a status code outside the 2xx range.
    #[error("Invalid status. {status}: {status_text}")]
    InvalidStatus {
        status: u16,
        status_text: String,
        response: Box<Response>,
    },

    /// `find` received a body that is not a JSON array.
    #[error("response body is not an array")]
    NotAnArray { body: Value },

    /// Produced by [`step::fail_with`](crate::step::fail_with).
    #[error("{message}")]
    Rejected { message: String, params: Vec<Value> },

    /// A transport verb was called on a transport that does not provide it.
    #[error("'transport.{operation}' is not implemented")]
    Unimplemented {
        operation: &'static str,
        params: Vec<Value>,
    },

    /// An instance method was called on an instance built with `bind: false`.
    #[error("instance is not bound to a model")]
    Unbound,

    /// A realtime stream was requested from a model without a push channel or address.
    #[error("realtime is not configured: {0}")]
    RealtimeUnavailable(&'static str),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid address: {0}")]
    Address(#[from] url::ParseError),

    /// Free-form failure raised by a hook or transport.
    #[error("{0}")]
    Custom(String),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ModelError {
    pub fn custom(message: impl Into<String>) -> Self {
        ModelError::Custom(message.into())
    }

    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ModelError::Other(Box::new(error))
    }

    /// Builds the error the default response interpreter raises.
    pub fn invalid_status(response: Response) -> Self {
        ModelError::InvalidStatus {
            status: response.status,
            status_text: response.status_text.clone(),
            response: Box::new(response),
        }
    }

    /// Status code of an [`InvalidStatus`](ModelError::InvalidStatus) failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ModelError::InvalidStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True only for an invalid-status failure with code 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// True for the rejection `save` produces when the remote copy is identical.
    pub fn is_same_object(&self) -> bool {
        matches!(self, ModelError::Rejected { message, .. } if message == SAME_OBJECT)
    }
}
