//! # Store Client
//!
//! A cheap, cloneable handle to a running [`StoreActor`](super::StoreActor).

use super::error::StoreError;
use super::message::{Notification, StoreRequest};
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc, oneshot};

#[derive(Clone)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
    notifications: broadcast::Sender<Notification>,
}

impl StoreClient {
    pub fn new(
        sender: mpsc::Sender<StoreRequest>,
        notifications: broadcast::Sender<Notification>,
    ) -> Self {
        Self {
            sender,
            notifications,
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, StoreError>>) -> StoreRequest,
    ) -> Result<T, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| StoreError::StoreClosed)?;
        response.await.map_err(|_| StoreError::StoreDropped)?
    }

    pub async fn insert(&self, document: Value) -> Result<Value, StoreError> {
        self.request(|respond_to| StoreRequest::Insert {
            document,
            respond_to,
        })
        .await
    }

    pub async fn get(&self, id: impl Into<String>) -> Result<Value, StoreError> {
        let id = id.into();
        self.request(|respond_to| StoreRequest::Get { id, respond_to })
            .await
    }

    pub async fn query(&self, filter: Map<String, Value>) -> Result<Vec<Value>, StoreError> {
        self.request(|respond_to| StoreRequest::Query { filter, respond_to })
            .await
    }

    pub async fn replace(
        &self,
        id: impl Into<String>,
        document: Value,
    ) -> Result<Value, StoreError> {
        let id = id.into();
        self.request(|respond_to| StoreRequest::Replace {
            id,
            document,
            respond_to,
        })
        .await
    }

    pub async fn remove(&self, id: impl Into<String>) -> Result<Value, StoreError> {
        let id = id.into();
        self.request(|respond_to| StoreRequest::Remove { id, respond_to })
            .await
    }

    /// Receives every notification broadcast from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }
}
