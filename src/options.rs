//! # Option Resolution
//!
//! A model is configured with a partial [`Config`]: a handful of [`Hooks`] at
//! the type level, optional per-[`Operation`] overrides, a transport, and a few
//! switches. Resolution turns that into one complete [`Options`] per operation,
//! once, when the model type is defined.
//!
//! ## Precedence
//!
//! ```text
//! child.operations[op]  ─┐
//! parent.operations[op] ─┤  merged per operation, child first
//! child.hooks           ─┤  merged at type level, child first
//! parent.hooks          ─┤
//! built-in defaults     ─┘  (the base `Model`)
//! ```
//!
//! Hooks are atomic: two `validate` hooks are never combined, the one with the
//! higher precedence wins outright. Nested maps (the per-operation table) are
//! merged key by key.
//!
//! ## Built-in defaults
//!
//! | Hook | Default |
//! |------|---------|
//! | `id` | the `"id"` field |
//! | `validate`, `serialize`, `demodelize`, `deserialize` | pass through |
//! | `response` | 2xx → body, otherwise [`ModelError::InvalidStatus`] |
//! | `modelize` | [`Model::instance`], also for a `null` body |

use crate::error::{ModelError, Result};
use crate::identity::{self, IdFn};
use crate::instance::Instance;
use crate::model::Model;
use crate::realtime::{PushChannel, Realtime};
use crate::step::{self, Step, StepFuture};
use crate::transport::{Response, Transport, Unimplemented};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Wraps a response body into an instance of the given model.
pub type Modelize = Arc<dyn Fn(Model, Value) -> StepFuture<Instance> + Send + Sync>;

/// Lifts a synchronous function into a [`Modelize`] hook.
pub fn modelize_fn<F>(f: F) -> Modelize
where
    F: Fn(Model, Value) -> Result<Instance> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |model: Model, data: Value| -> StepFuture<Instance> {
        let f = Arc::clone(&f);
        Box::pin(async move { f(model, data) })
    })
}

/// The operations a model exposes, each resolved independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    HasId,
    Insert,
    Update,
    DeleteById,
    ById,
    Find,
    Save,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::HasId,
        Operation::Insert,
        Operation::Update,
        Operation::DeleteById,
        Operation::ById,
        Operation::Find,
        Operation::Save,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::HasId => "hasId",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::DeleteById => "deleteById",
            Operation::ById => "byId",
            Operation::Find => "find",
            Operation::Save => "save",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A partial set of hooks. Unset hooks fall through to the next level.
#[derive(Clone, Default)]
pub struct Hooks {
    pub id: Option<IdFn>,
    pub validate: Option<Step<Value, Value>>,
    pub serialize: Option<Step<Value, Value>>,
    /// Converts a document to its wire format.
    pub demodelize: Option<Step<Value, Value>>,
    /// Interprets a transport response into a body.
    pub response: Option<Step<Response, Value>>,
    pub modelize: Option<Modelize>,
    pub deserialize: Option<Step<Instance, Instance>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every hook set to its built-in default.
    pub fn defaults() -> Self {
        Self {
            id: Some(builtin::id()),
            validate: Some(step::identity()),
            serialize: Some(step::identity()),
            demodelize: Some(step::identity()),
            response: Some(builtin::response()),
            modelize: Some(builtin::modelize()),
            deserialize: Some(step::identity()),
        }
    }

    pub fn id(mut self, id: IdFn) -> Self {
        self.id = Some(id);
        self
    }

    pub fn validate(mut self, validate: Step<Value, Value>) -> Self {
        self.validate = Some(validate);
        self
    }

    pub fn serialize(mut self, serialize: Step<Value, Value>) -> Self {
        self.serialize = Some(serialize);
        self
    }

    pub fn demodelize(mut self, demodelize: Step<Value, Value>) -> Self {
        self.demodelize = Some(demodelize);
        self
    }

    pub fn response(mut self, response: Step<Response, Value>) -> Self {
        self.response = Some(response);
        self
    }

    pub fn modelize(mut self, modelize: Modelize) -> Self {
        self.modelize = Some(modelize);
        self
    }

    pub fn deserialize(mut self, deserialize: Step<Instance, Instance>) -> Self {
        self.deserialize = Some(deserialize);
        self
    }

    /// Fills every hook `self` leaves unset from `fallback`.
    pub fn or(self, fallback: &Hooks) -> Hooks {
        Hooks {
            id: self.id.or_else(|| fallback.id.clone()),
            validate: self.validate.or_else(|| fallback.validate.clone()),
            serialize: self.serialize.or_else(|| fallback.serialize.clone()),
            demodelize: self.demodelize.or_else(|| fallback.demodelize.clone()),
            response: self.response.or_else(|| fallback.response.clone()),
            modelize: self.modelize.or_else(|| fallback.modelize.clone()),
            deserialize: self.deserialize.or_else(|| fallback.deserialize.clone()),
        }
    }

    /// Names of the hooks that are set.
    pub fn names(&self) -> Vec<&'static str> {
        let slots = [
            ("id", self.id.is_some()),
            ("validate", self.validate.is_some()),
            ("serialize", self.serialize.is_some()),
            ("demodelize", self.demodelize.is_some()),
            ("response", self.response.is_some()),
            ("modelize", self.modelize.is_some()),
            ("deserialize", self.deserialize.is_some()),
        ];
        slots
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hooks").field(&self.names()).finish()
    }
}

/// A complete, resolved hook set for one operation.
#[derive(Clone)]
pub struct Options {
    pub id: IdFn,
    pub validate: Step<Value, Value>,
    pub serialize: Step<Value, Value>,
    pub demodelize: Step<Value, Value>,
    pub response: Step<Response, Value>,
    pub modelize: Modelize,
    pub deserialize: Step<Instance, Instance>,
}

impl Options {
    /// Resolves `operation` over `general`; gaps left by both take the built-in.
    pub fn resolve(operation: Option<&Hooks>, general: &Hooks) -> Self {
        let hooks = match operation {
            Some(specific) => specific.clone().or(general),
            None => general.clone(),
        };
        Self {
            id: hooks.id.unwrap_or_else(builtin::id),
            validate: hooks.validate.unwrap_or_else(step::identity),
            serialize: hooks.serialize.unwrap_or_else(step::identity),
            demodelize: hooks.demodelize.unwrap_or_else(step::identity),
            response: hooks.response.unwrap_or_else(builtin::response),
            modelize: hooks.modelize.unwrap_or_else(builtin::modelize),
            deserialize: hooks.deserialize.unwrap_or_else(step::identity),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options").finish_non_exhaustive()
    }
}

/// One resolved [`Options`] per operation.
#[derive(Clone, Debug)]
pub struct Resolved {
    has_id: Options,
    insert: Options,
    update: Options,
    delete_by_id: Options,
    by_id: Options,
    find: Options,
    save: Options,
}

impl Resolved {
    pub fn get(&self, operation: Operation) -> &Options {
        match operation {
            Operation::HasId => &self.has_id,
            Operation::Insert => &self.insert,
            Operation::Update => &self.update,
            Operation::DeleteById => &self.delete_by_id,
            Operation::ById => &self.by_id,
            Operation::Find => &self.find,
            Operation::Save => &self.save,
        }
    }
}

/// The configuration a model type is defined with.
///
/// Every field is optional; [`Config::or`] fills the gaps from the parent type.
#[derive(Clone, Default)]
pub struct Config {
    pub hooks: Hooks,
    pub operations: HashMap<Operation, Hooks>,
    pub transport: Option<Arc<dyn Transport>>,
    pub push: Option<Arc<dyn PushChannel>>,
    /// Base address for push subscriptions; defaults to the transport's.
    pub address: Option<Url>,
    /// Whether instances carry a handle to their model. Defaults to `true`.
    pub bind: Option<bool>,
    pub realtime: Option<Realtime>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration of the base `Model`: every slot filled.
    pub fn defaults() -> Self {
        Self {
            hooks: Hooks::defaults(),
            operations: HashMap::new(),
            transport: Some(Arc::new(Unimplemented)),
            push: None,
            address: None,
            bind: Some(true),
            realtime: Some(Realtime::none()),
        }
    }

    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn push<P: PushChannel + 'static>(mut self, push: P) -> Self {
        self.push = Some(Arc::new(push));
        self
    }

    pub fn shared_push(mut self, push: Arc<dyn PushChannel>) -> Self {
        self.push = Some(push);
        self
    }

    pub fn address(mut self, address: Url) -> Self {
        self.address = Some(address);
        self
    }

    pub fn bind(mut self, bind: bool) -> Self {
        self.bind = Some(bind);
        self
    }

    pub fn realtime(mut self, realtime: Realtime) -> Self {
        self.realtime = Some(realtime);
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Overrides hooks for a single operation.
    pub fn operation(mut self, operation: Operation, hooks: Hooks) -> Self {
        self.operations.insert(operation, hooks);
        self
    }

    pub fn id(mut self, id: IdFn) -> Self {
        self.hooks = self.hooks.id(id);
        self
    }

    pub fn validate(mut self, validate: Step<Value, Value>) -> Self {
        self.hooks = self.hooks.validate(validate);
        self
    }

    pub fn serialize(mut self, serialize: Step<Value, Value>) -> Self {
        self.hooks = self.hooks.serialize(serialize);
        self
    }

    pub fn demodelize(mut self, demodelize: Step<Value, Value>) -> Self {
        self.hooks = self.hooks.demodelize(demodelize);
        self
    }

    pub fn response(mut self, response: Step<Response, Value>) -> Self {
        self.hooks = self.hooks.response(response);
        self
    }

    pub fn modelize(mut self, modelize: Modelize) -> Self {
        self.hooks = self.hooks.modelize(modelize);
        self
    }

    pub fn deserialize(mut self, deserialize: Step<Instance, Instance>) -> Self {
        self.hooks = self.hooks.deserialize(deserialize);
        self
    }

    /// Deep-merges `self` over `parent`: whatever `self` sets wins.
    pub fn or(self, parent: &Config) -> Config {
        let mut operations = parent.operations.clone();
        for (operation, hooks) in self.operations {
            let merged = match parent.operations.get(&operation) {
                Some(inherited) => hooks.or(inherited),
                None => hooks,
            };
            operations.insert(operation, merged);
        }

        Config {
            hooks: self.hooks.or(&parent.hooks),
            operations,
            transport: self.transport.or_else(|| parent.transport.clone()),
            push: self.push.or_else(|| parent.push.clone()),
            address: self.address.or_else(|| parent.address.clone()),
            bind: self.bind.or(parent.bind),
            realtime: self.realtime.or(parent.realtime),
        }
    }

    /// Resolves one complete [`Options`] per operation.
    pub fn resolve(&self) -> Resolved {
        let resolve = |operation: Operation| Options::resolve(self.operations.get(&operation), &self.hooks);
        Resolved {
            has_id: resolve(Operation::HasId),
            insert: resolve(Operation::Insert),
            update: resolve(Operation::Update),
            delete_by_id: resolve(Operation::DeleteById),
            by_id: resolve(Operation::ById),
            find: resolve(Operation::Find),
            save: resolve(Operation::Save),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operations: Vec<_> = self.operations.keys().map(Operation::as_str).collect();
        f.debug_struct("Config")
            .field("hooks", &self.hooks)
            .field("operations", &operations)
            .field("transport", &self.transport.is_some())
            .field("push", &self.push.is_some())
            .field("address", &self.address.as_ref().map(Url::as_str))
            .field("bind", &self.bind)
            .field("realtime", &self.realtime)
            .finish()
    }
}

mod builtin {
    use super::*;

    pub fn id() -> IdFn {
        identity::field("id")
    }

    pub fn response() -> Step<Response, Value> {
        step::from_fn(|response: Response| {
            if response.is_success() {
                Ok(response.body)
            } else {
                Err(ModelError::invalid_status(response))
            }
        })
    }

    pub fn modelize() -> Modelize {
        modelize_fn(|model, data| Ok(model.instance(data)))
    }
}
