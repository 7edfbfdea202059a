//! # delmo sample
//!
//! An end-to-end demo of `delmo` without a network.
//!
//! - [`server`]: an in-memory document store running as a tokio actor.
//! - [`transport`]: [`MemoryTransport`](transport::MemoryTransport), the store
//!   behind the library's `Transport` and `PushChannel` traits.
//! - [`model`]: the `User` model and its hooks.
//! - [`lifecycle`]: [`UserSystem`](lifecycle::UserSystem), which starts and
//!   stops everything.
//!
//! ```bash
//! RUST_LOG=info cargo run -p delmo-sample
//! DELMO_ADDRESS=http://localhost:3000/api/user RUST_LOG=debug cargo run -p delmo-sample
//! ```

pub mod lifecycle;
pub mod model;
pub mod server;
pub mod transport;

/// Environment variable holding the resource address.
pub const ADDRESS_VAR: &str = "DELMO_ADDRESS";

/// Address used when [`ADDRESS_VAR`] is unset.
pub const DEFAULT_ADDRESS: &str = "memory://localhost/api/user/";
