//! # Realtime Subscription
//!
//! Optional push notifications on top of the CRUD pipelines. A model configured
//! with a [`Realtime`] selection and a [`PushChannel`] subscribes, for every
//! selected [`Event`], to `<base address>/<event>` and re-emits each parsed
//! message on its own event table. Consumers observe the table with
//! [`Model::listen`](crate::Model::listen).
//!
//! Nothing here is needed for CRUD to work: with realtime off (the default), no
//! channel, no address or no tokio runtime, the model simply never emits.

use crate::error::Result;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Capacity of each per-event broadcast channel.
const EVENT_CAPACITY: usize = 64;

/// The push events a model can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Event {
    Inserted,
    Updated,
    Saved,
    Deleted,
}

impl Event {
    pub const ALL: [Event; 4] = [Event::Inserted, Event::Updated, Event::Saved, Event::Deleted];

    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Inserted => "inserted",
            Event::Updated => "updated",
            Event::Saved => "saved",
            Event::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which events a model subscribes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Realtime {
    pub inserted: bool,
    pub updated: bool,
    pub saved: bool,
    pub deleted: bool,
}

impl Realtime {
    pub fn all() -> Self {
        Self::only(&Event::ALL)
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn only(events: &[Event]) -> Self {
        let mut realtime = Self::none();
        for event in events {
            match event {
                Event::Inserted => realtime.inserted = true,
                Event::Updated => realtime.updated = true,
                Event::Saved => realtime.saved = true,
                Event::Deleted => realtime.deleted = true,
            }
        }
        realtime
    }

    pub fn contains(&self, event: Event) -> bool {
        match event {
            Event::Inserted => self.inserted,
            Event::Updated => self.updated,
            Event::Saved => self.saved,
            Event::Deleted => self.deleted,
        }
    }

    pub fn is_enabled(&self) -> bool {
        Event::ALL.iter().any(|event| self.contains(*event))
    }

    pub fn events(&self) -> impl Iterator<Item = Event> + '_ {
        Event::ALL.into_iter().filter(|event| self.contains(*event))
    }
}

/// The consumed push transport.
///
/// `subscribe` opens a channel at `address` and yields raw text messages until
/// the channel closes.
pub trait PushChannel: Send + Sync {
    fn subscribe(&self, address: Url) -> BoxStream<'static, Result<String>>;
}

/// Per-model observer table: one broadcast channel per event.
#[derive(Debug)]
pub struct EventTable {
    inserted: broadcast::Sender<Value>,
    updated: broadcast::Sender<Value>,
    saved: broadcast::Sender<Value>,
    deleted: broadcast::Sender<Value>,
}

impl Default for EventTable {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY)
    }
}

impl EventTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            inserted: broadcast::channel(capacity).0,
            updated: broadcast::channel(capacity).0,
            saved: broadcast::channel(capacity).0,
            deleted: broadcast::channel(capacity).0,
        }
    }

    fn sender(&self, event: Event) -> &broadcast::Sender<Value> {
        match event {
            Event::Inserted => &self.inserted,
            Event::Updated => &self.updated,
            Event::Saved => &self.saved,
            Event::Deleted => &self.deleted,
        }
    }

    /// Registers a new observer for `event`.
    pub fn listen(&self, event: Event) -> broadcast::Receiver<Value> {
        self.sender(event).subscribe()
    }

    /// Delivers `payload` to every observer of `event`; returns how many got it.
    pub fn emit(&self, event: Event, payload: Value) -> usize {
        self.sender(event).send(payload).unwrap_or(0)
    }
}

/// Address of the push channel for `event` under `base`.
///
/// The event name is appended as a path segment and `http(s)` becomes `ws(s)`:
/// `http://host/api/user` → `ws://host/api/user/inserted`.
pub fn event_address(base: &Url, event: Event) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let mut address = base.join(event.as_str())?;

    let scheme = match address.scheme() {
        "http" => Some("ws"),
        "https" => Some("wss"),
        _ => None,
    };
    if let Some(scheme) = scheme {
        if address.set_scheme(scheme).is_err() {
            warn!(%address, scheme, "Could not switch push address scheme");
        }
    }
    Ok(address)
}

/// Parses every raw message of a push stream as JSON.
pub fn parsed(messages: BoxStream<'static, Result<String>>) -> BoxStream<'static, Result<Value>> {
    messages
        .map(|message| message.and_then(|raw| Ok(serde_json::from_str(&raw)?)))
        .boxed()
}

/// Background tasks forwarding push messages into an [`EventTable`].
///
/// The tasks are aborted when this value is dropped.
#[derive(Debug, Default)]
pub struct Subscriptions {
    handles: Vec<JoinHandle<()>>,
}

impl Subscriptions {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Opens one subscription per selected event.
pub(crate) fn start(
    model: &str,
    realtime: Realtime,
    push: Option<&Arc<dyn PushChannel>>,
    base: Option<&Url>,
    events: &Arc<EventTable>,
) -> Subscriptions {
    let mut subscriptions = Subscriptions::default();
    if !realtime.is_enabled() {
        return subscriptions;
    }
    let Some(push) = push else {
        warn!(model, "Realtime enabled without a push channel");
        return subscriptions;
    };
    let Some(base) = base else {
        warn!(model, "Realtime enabled without a base address");
        return subscriptions;
    };
    let Ok(runtime) = Handle::try_current() else {
        warn!(model, "Realtime enabled outside a tokio runtime");
        return subscriptions;
    };

    for event in realtime.events() {
        let address = match event_address(base, event) {
            Ok(address) => address,
            Err(e) => {
                warn!(model, %event, error = %e, "Invalid push address");
                continue;
            }
        };
        info!(model, %event, %address, "Realtime subscription opened");

        let mut messages = parsed(push.subscribe(address));
        let events = Arc::clone(events);
        let model = model.to_string();
        subscriptions.handles.push(runtime.spawn(async move {
            while let Some(message) = messages.next().await {
                match message {
                    Ok(payload) => {
                        let delivered = events.emit(event, payload);
                        debug!(model = %model, %event, delivered, "Push message");
                    }
                    Err(e) => warn!(model = %model, %event, error = %e, "Skipping push message"),
                }
            }
            info!(model = %model, %event, "Realtime subscription closed");
        }));
    }
    subscriptions
}

/// Convenience for callers that only hold the raw parts.
pub fn open(push: &dyn PushChannel, base: &Url, event: Event) -> Result<BoxStream<'static, Result<Value>>> {
    let address = event_address(base, event)?;
    Ok(parsed(push.subscribe(address)))
}
