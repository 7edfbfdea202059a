//! # Memory Transport
//!
//! Adapts a [`StoreClient`] to the library's [`Transport`] and [`PushChannel`].
//!
//! Store outcomes are reported the way an HTTP server would report them:
//!
//! | Store result | Response |
//! |--------------|----------|
//! | success | `200` with the document (or list) as body |
//! | `NotFound` | `404` with `{"message": ...}` |
//! | `InvalidDocument`, unusable id | `400` with `{"message": ...}` |
//! | store gone | `Err`, like a refused connection |
//!
//! Push subscriptions are keyed by the last path segment of the address, so
//! `memory://localhost/api/user/inserted` receives `inserted` notifications.

use crate::server::{StoreClient, StoreError};
use async_trait::async_trait;
use delmo::{Event, ModelError, PushChannel, Response, Result, Transport};
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use url::Url;

#[derive(Clone)]
pub struct MemoryTransport {
    store: StoreClient,
    address: Url,
}

impl MemoryTransport {
    pub fn new(store: StoreClient, address: Url) -> Self {
        Self { store, address }
    }

    pub fn store(&self) -> &StoreClient {
        &self.store
    }
}

/// Store ids are strings; numbers are accepted and converted.
fn key(id: &Value) -> Option<String> {
    match id {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    Response::new(400, json!({ "message": message.into() }))
}

/// Turns a store outcome into a response; only a vanished store is an `Err`.
fn respond(result: std::result::Result<Value, StoreError>) -> Result<Response> {
    match result {
        Ok(body) => Ok(Response::ok(body)),
        Err(e @ StoreError::NotFound(_)) => Ok(Response::not_found(json!({ "message": e.to_string() }))),
        Err(e @ StoreError::InvalidDocument(_)) => Ok(bad_request(e.to_string())),
        Err(e) => Err(ModelError::other(e)),
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn create(&self, body: Value) -> Result<Response> {
        respond(self.store.insert(body).await)
    }

    async fn read(&self, id_or_query: Value) -> Result<Response> {
        match id_or_query {
            Value::Object(filter) => {
                let found = self.store.query(filter).await;
                respond(found.map(Value::Array))
            }
            id => match key(&id) {
                Some(id) => respond(self.store.get(id).await),
                None => Ok(bad_request(format!("unusable id: {id}"))),
            },
        }
    }

    async fn replace(&self, id: Value, body: Value) -> Result<Response> {
        match key(&id) {
            Some(id) => respond(self.store.replace(id, body).await),
            None => Ok(bad_request(format!("unusable id: {id}"))),
        }
    }

    async fn remove(&self, id: Value) -> Result<Response> {
        match key(&id) {
            Some(id) => respond(self.store.remove(id).await),
            None => Ok(bad_request(format!("unusable id: {id}"))),
        }
    }

    fn address(&self) -> Option<Url> {
        Some(self.address.clone())
    }
}

impl PushChannel for MemoryTransport {
    fn subscribe(&self, address: Url) -> BoxStream<'static, Result<String>> {
        let segment = address
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default();
        let Some(event) = Event::ALL.into_iter().find(|event| event.as_str() == segment) else {
            warn!(%address, "No such push channel");
            let error = ModelError::custom(format!("no push channel at {address}"));
            return stream::once(async move { Err(error) }).boxed();
        };
        debug!(%address, %event, "Push channel opened");

        stream::unfold(self.store.subscribe(), move |mut notifications| async move {
            loop {
                match notifications.recv().await {
                    Ok(notification) if notification.event == event => {
                        let message = notification.document.to_string();
                        return Some((Ok(message), notifications));
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(%event, missed, "Push channel lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}
