//! # Transport Capability
//!
//! The four verbs a model delegates its network I/O to. The library never
//! talks to the network itself: a consumer supplies a [`Transport`] (an HTTP
//! client, an in-process store, a mock) and every pipeline calls into it.
//!
//! | Verb | HTTP | Used by |
//! |------|------|---------|
//! | [`create`](Transport::create) | `POST /` | `insert`, `save` |
//! | [`read`](Transport::read) | `GET /:id`, `GET /?query` | `by_id`, `find`, `save` |
//! | [`replace`](Transport::replace) | `PUT /:id` | `update`, `save` |
//! | [`remove`](Transport::remove) | `DELETE /:id` | `delete_by_id` |
//!
//! Every provided method fails with [`ModelError::Unimplemented`], naming the
//! verb and echoing its arguments, so a transport only implements what it
//! supports.

use crate::error::{ModelError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// A transport response: status line plus decoded JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub body: Value,
}

impl Response {
    /// Builds a response with the canonical reason phrase for `status`.
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            status_text: reason_phrase(status).to_string(),
            body,
        }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn not_found(body: Value) -> Self {
        Self::new(404, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// The capability a model delegates its I/O to.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `POST` a new document.
    async fn create(&self, body: Value) -> Result<Response> {
        Err(unimplemented("create", vec![body]))
    }

    /// `GET` a document by identifier, or a list by query.
    async fn read(&self, id_or_query: Value) -> Result<Response> {
        Err(unimplemented("read", vec![id_or_query]))
    }

    /// `PUT` a document under an identifier.
    async fn replace(&self, id: Value, body: Value) -> Result<Response> {
        Err(unimplemented("replace", vec![id, body]))
    }

    /// `DELETE` a document by identifier.
    async fn remove(&self, id: Value) -> Result<Response> {
        Err(unimplemented("remove", vec![id]))
    }

    /// Base address of the resource, used to derive push-channel addresses.
    fn address(&self) -> Option<Url> {
        None
    }
}

fn unimplemented(operation: &'static str, params: Vec<Value>) -> ModelError {
    ModelError::Unimplemented { operation, params }
}

/// The built-in transport: every verb fails as unimplemented.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unimplemented;

#[async_trait]
impl Transport for Unimplemented {}
