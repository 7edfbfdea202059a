//! # In-Memory Document Store
//!
//! The `StoreActor` owns a collection of JSON documents and processes requests
//! one at a time in its own task, so the collection needs no lock.
//!
//! | Request | Success | Failure |
//! |---------|---------|---------|
//! | `Insert` | stored document with a fresh `_id` | `InvalidDocument` unless an object |
//! | `Get` | the document | `NotFound` |
//! | `Query` | every document matching all filter fields, in insertion order | |
//! | `Replace` | the new document, `_id` kept | `NotFound`, `InvalidDocument` |
//! | `Remove` | the removed document | `NotFound` |
//!
//! Every committed write is broadcast: `Insert` as `inserted`, `Replace` as
//! `updated`, both of them also as `saved`, and `Remove` as `deleted`.

use super::client::StoreClient;
use super::error::StoreError;
use super::message::{Notification, StoreRequest};
use delmo::Event;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Field holding the identifier the store assigns.
pub const ID_FIELD: &str = "_id";

const NOTIFICATION_CAPACITY: usize = 256;

pub struct StoreActor {
    name: String,
    receiver: mpsc::Receiver<StoreRequest>,
    notifications: broadcast::Sender<Notification>,
    documents: BTreeMap<u64, Value>,
    next_id: u64,
}

impl StoreActor {
    /// Creates the store and a client connected to it. The store does nothing
    /// until [`run`](StoreActor::run) is spawned.
    pub fn new(name: impl Into<String>, buffer_size: usize) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        let actor = Self {
            name: name.into(),
            receiver,
            notifications: notifications.clone(),
            documents: BTreeMap::new(),
            next_id: 1,
        };
        (actor, StoreClient::new(sender, notifications))
    }

    /// Processes requests until every client is dropped.
    pub async fn run(mut self) {
        info!(store = %self.name, "Store started");

        while let Some(request) = self.receiver.recv().await {
            match request {
                StoreRequest::Insert {
                    document,
                    respond_to,
                } => {
                    debug!(store = %self.name, ?document, "Insert");
                    let _ = respond_to.send(self.insert(document));
                }
                StoreRequest::Get { id, respond_to } => {
                    let found = self.find(&id).cloned();
                    debug!(store = %self.name, %id, found = found.is_some(), "Get");
                    let _ = respond_to.send(found.ok_or(StoreError::NotFound(id)));
                }
                StoreRequest::Query { filter, respond_to } => {
                    let matches = self.query(&filter);
                    debug!(store = %self.name, ?filter, count = matches.len(), "Query");
                    let _ = respond_to.send(Ok(matches));
                }
                StoreRequest::Replace {
                    id,
                    document,
                    respond_to,
                } => {
                    debug!(store = %self.name, %id, ?document, "Replace");
                    let _ = respond_to.send(self.replace(id, document));
                }
                StoreRequest::Remove { id, respond_to } => {
                    debug!(store = %self.name, %id, "Remove");
                    let _ = respond_to.send(self.remove(id));
                }
            }
        }

        info!(store = %self.name, size = self.documents.len(), "Shutdown");
    }

    fn key(id: &str) -> Option<u64> {
        id.parse().ok()
    }

    fn find(&self, id: &str) -> Option<&Value> {
        Self::key(id).and_then(|key| self.documents.get(&key))
    }

    fn insert(&mut self, document: Value) -> Result<Value, StoreError> {
        let Value::Object(mut fields) = document else {
            warn!(store = %self.name, "Insert rejected: not an object");
            return Err(StoreError::InvalidDocument("expected an object".to_string()));
        };

        let key = self.next_id;
        self.next_id += 1;
        fields.insert(ID_FIELD.to_string(), Value::String(key.to_string()));

        let document = Value::Object(fields);
        self.documents.insert(key, document.clone());
        info!(store = %self.name, id = key, size = self.documents.len(), "Inserted");

        self.notify(Event::Inserted, &document);
        self.notify(Event::Saved, &document);
        Ok(document)
    }

    fn replace(&mut self, id: String, document: Value) -> Result<Value, StoreError> {
        let Some(key) = Self::key(&id).filter(|key| self.documents.contains_key(key)) else {
            warn!(store = %self.name, %id, "Not found");
            return Err(StoreError::NotFound(id));
        };
        let Value::Object(mut fields) = document else {
            warn!(store = %self.name, %id, "Replace rejected: not an object");
            return Err(StoreError::InvalidDocument("expected an object".to_string()));
        };

        fields.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        let document = Value::Object(fields);
        self.documents.insert(key, document.clone());
        info!(store = %self.name, %id, "Replaced");

        self.notify(Event::Updated, &document);
        self.notify(Event::Saved, &document);
        Ok(document)
    }

    fn remove(&mut self, id: String) -> Result<Value, StoreError> {
        match Self::key(&id).and_then(|key| self.documents.remove(&key)) {
            Some(document) => {
                info!(store = %self.name, %id, size = self.documents.len(), "Removed");
                self.notify(Event::Deleted, &document);
                Ok(document)
            }
            None => {
                warn!(store = %self.name, %id, "Not found");
                Err(StoreError::NotFound(id))
            }
        }
    }

    fn query(&self, filter: &Map<String, Value>) -> Vec<Value> {
        self.documents
            .values()
            .filter(|document| {
                filter
                    .iter()
                    .all(|(field, expected)| document.get(field) == Some(expected))
            })
            .cloned()
            .collect()
    }

    fn notify(&self, event: Event, document: &Value) {
        let notification = Notification {
            event,
            document: document.clone(),
        };
        // No subscribers is fine.
        let _ = self.notifications.send(notification);
    }
}
