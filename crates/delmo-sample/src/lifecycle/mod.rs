//! # System Lifecycle
//!
//! [`UserSystem`] wires the sample together:
//!
//! ```text
//! StoreActor ◄── StoreClient ◄── MemoryTransport ◄── User model
//!     │                               ▲
//!     └──── notifications ────────────┘ (push channel)
//! ```
//!
//! ## Graceful Shutdown
//!
//! The store stops when its last client is dropped. [`UserSystem::shutdown`]
//! drops the model, transport and client it holds and waits for the store task.
//! Instances bound to the model keep it alive, so drop them first.

use crate::model::user;
use crate::server::{StoreActor, StoreClient};
use crate::transport::MemoryTransport;
use delmo::{Config, Model};
use tokio::task::{JoinError, JoinHandle};
use tracing::info;
use url::Url;

const BUFFER_SIZE: usize = 32;

pub struct UserSystem {
    pub store: StoreClient,
    pub users: Model,
    handle: JoinHandle<()>,
}

impl UserSystem {
    /// Starts the store and defines the `User` model against it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(address: Url) -> Self {
        let (actor, store) = StoreActor::new("users", BUFFER_SIZE);
        let handle = tokio::spawn(actor.run());

        let transport = MemoryTransport::new(store.clone(), address);
        let users = user::define(
            Config::new()
                .transport(transport.clone())
                .push(transport),
        );
        info!(model = %users.name(), address = ?users.address().map(Url::as_str), "User system ready");

        Self {
            store,
            users,
            handle,
        }
    }

    pub async fn shutdown(self) -> Result<(), JoinError> {
        info!("Shutting down user system");
        drop(self.users);
        drop(self.store);
        self.handle.await
    }
}
