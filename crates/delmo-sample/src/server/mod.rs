//! An in-process stand-in for a REST resource server.
//!
//! [`StoreActor`] keeps the documents; [`StoreClient`] talks to it over a
//! channel. Nothing in here knows about models: the
//! [`MemoryTransport`](crate::transport::MemoryTransport) adapts the store to
//! the library's transport and push interfaces.

pub mod actor;
pub mod client;
pub mod error;
pub mod message;

pub use actor::{StoreActor, ID_FIELD};
pub use client::StoreClient;
pub use error::StoreError;
pub use message::{Notification, StoreRequest};
