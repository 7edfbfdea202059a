//! # Store Messages
//!
//! Requests sent from a [`StoreClient`](super::StoreClient) to the
//! [`StoreActor`](super::StoreActor), and the notifications the actor
//! broadcasts after every write.
//!
//! The request set mirrors the four REST verbs the library's transport speaks,
//! with `GET` split into a lookup by id and a query by example.

use super::error::StoreError;
use delmo::Event;
use serde_json::{Map, Value};
use tokio::sync::oneshot;

/// One-shot reply channel used by the store.
pub type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

#[derive(Debug)]
pub enum StoreRequest {
    Insert {
        document: Value,
        respond_to: Reply<Value>,
    },
    Get {
        id: String,
        respond_to: Reply<Value>,
    },
    Query {
        filter: Map<String, Value>,
        respond_to: Reply<Vec<Value>>,
    },
    Replace {
        id: String,
        document: Value,
        respond_to: Reply<Value>,
    },
    Remove {
        id: String,
        respond_to: Reply<Value>,
    },
}

/// A write the store has committed.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub event: Event,
    pub document: Value,
}
