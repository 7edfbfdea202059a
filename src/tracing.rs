//! # Observability
//!
//! Every public model operation opens a span named after the operation and
//! carrying the model name, so log lines from hooks, transports and the save
//! fallback nest under the call that caused them.
//!
//! ```text
//! INFO Model defined model="User" hooks=["id", "validate"] bind=true subscriptions=0
//! INFO save{model="User"}: Remote copy missing, inserting instead
//! INFO Realtime subscription opened model="User" event=inserted address=ws://localhost/api/user/inserted
//! ```
//!
//! Levels are controlled with `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=info cargo run -p delmo-sample
//! RUST_LOG=delmo=debug cargo run -p delmo-sample
//! ```
//!
//! Libraries never install a subscriber on their own; applications call
//! [`setup_tracing`] once at startup.

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Calling it twice is harmless: the second call leaves the first subscriber in place.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // model="..." already says where a line came from
        .compact()
        .try_init();
}
