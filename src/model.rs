//! # Model Types
//!
//! A [`Model`] is a named data-access type. It owns its resolved options, its
//! transport, and (when realtime is on) its push subscriptions. Handles are
//! cheap to clone and all clones share one definition.
//!
//! Types are derived from one another with [`Model::inherits`]; the child's
//! configuration is merged over the parent's and resolved once.
//!
//! ```text
//! Model::base()
//!    └── Model::new("User", config)          == base().inherits("User", config)
//!           └── user.inherits("Admin", config)
//! ```

use crate::error::{ModelError, Result};
use crate::identity;
use crate::instance::Instance;
use crate::options::{Config, Operation, Options, Resolved};
use crate::pipeline;
use crate::realtime::{self, Event, EventTable, PushChannel, Subscriptions};
use crate::transport::{Response, Transport, Unimplemented};
use futures::stream::BoxStream;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};
use url::Url;

const BASE: &str = "Model";

#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

struct ModelInner {
    name: String,
    config: Config,
    options: Resolved,
    transport: Arc<dyn Transport>,
    push: Option<Arc<dyn PushChannel>>,
    address: Option<Url>,
    bind: bool,
    events: Arc<EventTable>,
    // Aborts the push tasks once the last handle goes away.
    _subscriptions: Subscriptions,
}

impl Model {
    /// The root type: every hook at its built-in default, no transport.
    pub fn base() -> Model {
        Model::define(BASE, Config::defaults())
    }

    /// A direct subtype of [`Model::base`].
    pub fn new(name: impl Into<String>, config: Config) -> Model {
        Model::base().inherits(name, config)
    }

    /// Derives a subtype whose configuration is `config` merged over this one's.
    pub fn inherits(&self, name: impl Into<String>, config: Config) -> Model {
        let name = name.into();
        debug!(model = %name, parent = %self.name(), "Deriving model");
        Model::define(name, config.or(&self.inner.config))
    }

    fn define(name: impl Into<String>, config: Config) -> Model {
        let name = name.into();
        let options = config.resolve();
        let transport = config
            .transport
            .clone()
            .unwrap_or_else(|| Arc::new(Unimplemented));
        let push = config.push.clone();
        let address = config.address.clone().or_else(|| transport.address());
        let bind = config.bind.unwrap_or(true);
        let realtime = config.realtime.unwrap_or_default();

        let events = Arc::new(EventTable::default());
        let subscriptions = realtime::start(&name, realtime, push.as_ref(), address.as_ref(), &events);
        info!(
            model = %name,
            hooks = ?config.hooks.names(),
            bind,
            subscriptions = subscriptions.len(),
            "Model defined"
        );

        Model {
            inner: Arc::new(ModelInner {
                name,
                config,
                options,
                transport,
                push,
                address,
                bind,
                events,
                _subscriptions: subscriptions,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The merged configuration this type was defined with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn options(&self, operation: Operation) -> &Options {
        self.inner.options.get(operation)
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.inner.transport)
    }

    pub fn address(&self) -> Option<&Url> {
        self.inner.address.as_ref()
    }

    pub fn binds(&self) -> bool {
        self.inner.bind
    }

    /// True when both handles refer to the same model type.
    pub fn ptr_eq(&self, other: &Model) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Wraps `data` as an instance of this type, bound unless `bind` is off.
    pub fn instance(&self, data: Value) -> Instance {
        if self.inner.bind {
            Instance::bound(self.clone(), data)
        } else {
            Instance::new(data)
        }
    }

    /// Does `data` carry a present identifier under the `hasId` options?
    pub fn has_id(&self, data: &Value) -> Result<bool> {
        let id = &self.options(Operation::HasId).id;
        Ok(identity::is_present(&id(data)?))
    }

    #[instrument(skip_all, fields(model = %self.name()))]
    pub async fn insert(&self, data: impl Into<Value>) -> Result<Value> {
        pipeline::insert(self)(data.into()).await
    }

    #[instrument(skip_all, fields(model = %self.name()))]
    pub async fn update(&self, data: impl Into<Value>) -> Result<Value> {
        pipeline::update(self)(data.into()).await
    }

    /// Removes a record. Accepts a document carrying an id or the bare id.
    #[instrument(skip_all, fields(model = %self.name()))]
    pub async fn delete_by_id(&self, id_or_data: impl Into<Value>) -> Result<Value> {
        pipeline::delete_by_id(self)(id_or_data.into()).await
    }

    /// Fetches one record. Accepts a document carrying an id or the bare id.
    #[instrument(skip_all, fields(model = %self.name()))]
    pub async fn by_id(&self, id_or_data: impl Into<Value>) -> Result<Instance> {
        pipeline::by_id(self)(id_or_data.into()).await
    }

    /// Queries the transport; the body must be an array.
    #[instrument(skip_all, fields(model = %self.name()))]
    pub async fn find(&self, query: impl Into<Value>) -> Result<Vec<Instance>> {
        let found = pipeline::find(self)(query.into()).await?;
        debug!(count = found.len(), "Found records");
        Ok(found)
    }

    /// Inserts when `data` has no id, otherwise replaces the remote copy.
    ///
    /// Fails with a `"same object."` rejection when the remote copy is already
    /// identical, and inserts when the remote copy does not exist (404).
    #[instrument(skip_all, fields(model = %self.name()))]
    pub async fn save(&self, data: impl Into<Value>) -> Result<Value> {
        pipeline::save(self)(data.into()).await
    }

    // Raw transport verbs, bypassing every hook.

    pub async fn get(&self, id_or_query: impl Into<Value>) -> Result<Response> {
        self.inner.transport.read(id_or_query.into()).await
    }

    pub async fn post(&self, body: impl Into<Value>) -> Result<Response> {
        self.inner.transport.create(body.into()).await
    }

    pub async fn put(&self, id: impl Into<Value>, body: impl Into<Value>) -> Result<Response> {
        self.inner.transport.replace(id.into(), body.into()).await
    }

    pub async fn delete(&self, id: impl Into<Value>) -> Result<Response> {
        self.inner.transport.remove(id.into()).await
    }

    /// Registers an observer for a push event on this type.
    pub fn listen(&self, event: Event) -> broadcast::Receiver<Value> {
        self.inner.events.listen(event)
    }

    /// Emits `payload` to this type's observers; returns how many received it.
    pub fn emit(&self, event: Event, payload: Value) -> usize {
        self.inner.events.emit(event, payload)
    }

    /// Opens a dedicated stream of `event` messages, independent of the realtime switch.
    pub fn stream(&self, event: Event) -> Result<BoxStream<'static, Result<Value>>> {
        let push = self
            .inner
            .push
            .as_ref()
            .ok_or(ModelError::RealtimeUnavailable("no push channel"))?;
        let base = self
            .inner
            .address
            .as_ref()
            .ok_or(ModelError::RealtimeUnavailable("no address"))?;
        realtime::open(push.as_ref(), base, event)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.inner.name)
            .field("config", &self.inner.config)
            .finish()
    }
}
