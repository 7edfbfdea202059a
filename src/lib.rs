//! # delmo
//!
//! > **Data models for remote JSON resources.**
//!
//! A [`Model`] is a named type standing between application code and a remote
//! collection. It turns "insert this", "save that", "find these" into calls on a
//! pluggable [`Transport`], passing data through a small set of user hooks on the
//! way out and on the way back.
//!
//! ## 🏗️ Design
//!
//! ### Pipelines built from hooks
//! Each operation is a chain of [`Step`]s: async functions from one value to the
//! next. Hooks are steps, transport calls are steps, and the [`step`] module glues
//! them together. Hooks may be synchronous or asynchronous; both fail through the
//! same [`Result`], so an error raised anywhere reaches the caller unchanged.
//!
//! | Operation | Pipeline |
//! |-----------|----------|
//! | `insert` | validate → serialize → demodelize → `create` → response |
//! | `update` | (id ‖ validate → serialize → demodelize) → `replace` → response |
//! | `delete_by_id` | id if present → `remove` → response |
//! | `by_id` | id if present → `read` → response → modelize → deserialize |
//! | `find` | `read` → response → array check → each (modelize → deserialize) |
//! | `save` | no id → insert; otherwise compare with the remote copy and replace |
//!
//! ### Inheritance
//! Model types derive from one another. A child's [`Config`] is deep-merged over
//! its parent's and resolved once, into one complete [`Options`] per
//! [`Operation`]. See [`options`] for the precedence rules.
//!
//! ### Transport and push
//! The crate does no I/O of its own. [`Transport`] is the four-verb capability the
//! pipelines call; [`PushChannel`] is the optional source of realtime messages.
//! Both are traits so tests can use the [`mock`] implementations.
//!
//! ## 🗺️ Module Tour
//!
//! - [`model`] and [`instance`]: the public face. Define a type, call operations.
//! - [`options`]: hooks, per-operation overrides, resolution.
//! - `pipeline` (internal): the six operations, assembled per call.
//! - [`step`]: sequence, join, parallel, each, branch, fail.
//! - [`identity`]: the "does this document already exist remotely" rule.
//! - [`transport`], [`realtime`]: the consumed capabilities.
//! - [`error`]: [`ModelError`] and friends.
//! - [`mock`], [`tracing`](mod@crate::tracing): testing and observability.
//!
//! ## 🚀 Quick Start
//!
//! ```rust
//! use delmo::{Config, Model};
//! use delmo::mock::MockTransport;
//! use delmo::step;
//! use serde_json::{json, Value};
//!
//! # #[tokio::main]
//! # async fn main() -> delmo::Result<()> {
//! let transport = MockTransport::echo();
//! let user = Model::new(
//!     "User",
//!     Config::new()
//!         .transport(transport.clone())
//!         .serialize(step::from_fn(|mut data: Value| {
//!             data["kind"] = json!("user");
//!             Ok(data)
//!         })),
//! );
//!
//! let created = user.insert(json!({"username": "taro"})).await?;
//! assert_eq!(created, json!({"username": "taro", "kind": "user"}));
//! # Ok(())
//! # }
//! ```
//!
//! A runnable end-to-end demo against an in-memory server lives in the
//! `delmo-sample` workspace member:
//!
//! ```bash
//! RUST_LOG=info cargo run -p delmo-sample
//! ```

pub mod error;
pub mod identity;
pub mod instance;
pub mod mock;
pub mod model;
pub mod options;
mod pipeline;
pub mod realtime;
pub mod step;
pub mod tracing;
pub mod transport;

pub use error::{ModelError, Result};
pub use instance::Instance;
pub use model::Model;
pub use options::{Config, Hooks, Operation, Options};
pub use realtime::{Event, PushChannel, Realtime};
pub use step::Step;
pub use transport::{Response, Transport, Unimplemented};
