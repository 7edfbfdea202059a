//! The six operation pipelines.
//!
//! Each function assembles a fresh [`Step`] from a model's resolved options and
//! its transport. Building is cheap (a handful of `Arc` clones), so models
//! assemble the pipeline per call and hook swaps never need invalidation.

use crate::error::{ModelError, SAME_OBJECT};
use crate::identity;
use crate::instance::Instance;
use crate::model::Model;
use crate::options::{Operation, Options};
use crate::sequence;
use crate::step::{self, Predicate, Step, StepFuture};
use crate::transport::{Response, Transport};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

fn create(transport: Arc<dyn Transport>) -> Step<Value, Response> {
    step::from_async(move |body: Value| {
        let transport = Arc::clone(&transport);
        async move { transport.create(body).await }
    })
}

fn read(transport: Arc<dyn Transport>) -> Step<Value, Response> {
    step::from_async(move |id_or_query: Value| {
        let transport = Arc::clone(&transport);
        async move { transport.read(id_or_query).await }
    })
}

fn replace(transport: Arc<dyn Transport>) -> Step<(Value, Value), Response> {
    step::from_async(move |(id, body): (Value, Value)| {
        let transport = Arc::clone(&transport);
        async move { transport.replace(id, body).await }
    })
}

fn remove(transport: Arc<dyn Transport>) -> Step<Value, Response> {
    step::from_async(move |id: Value| {
        let transport = Arc::clone(&transport);
        async move { transport.remove(id).await }
    })
}

fn has_id(model: &Model) -> Predicate<Value> {
    identity::has_id(model.options(Operation::HasId).id.clone())
}

/// validate → serialize → demodelize
fn outgoing(options: &Options) -> Step<Value, Value> {
    sequence!(
        options.validate.clone(),
        options.serialize.clone(),
        options.demodelize.clone(),
    )
}

/// modelize → deserialize
fn incoming(model: &Model, options: &Options) -> Step<Value, Instance> {
    let model = model.clone();
    let modelize = options.modelize.clone();
    let modelize: Step<Value, Instance> =
        Arc::new(move |data: Value| -> StepFuture<Instance> { modelize(model.clone(), data) });
    sequence!(modelize, options.deserialize.clone())
}

fn require_array() -> Step<Value, Vec<Value>> {
    step::from_fn(|body: Value| match body {
        Value::Array(items) => Ok(items),
        body => Err(ModelError::NotAnArray { body }),
    })
}

pub(crate) fn insert(model: &Model) -> Step<Value, Value> {
    let options = model.options(Operation::Insert);
    sequence!(
        outgoing(options),
        create(model.transport()),
        options.response.clone(),
    )
}

pub(crate) fn update(model: &Model) -> Step<Value, Value> {
    let options = model.options(Operation::Update);
    sequence!(
        step::join(identity::extract(options.id.clone()), outgoing(options)),
        replace(model.transport()),
        options.response.clone(),
    )
}

pub(crate) fn delete_by_id(model: &Model) -> Step<Value, Value> {
    let options = model.options(Operation::DeleteById);
    sequence!(
        step::when(has_id(model), identity::extract(options.id.clone())),
        remove(model.transport()),
        options.response.clone(),
    )
}

pub(crate) fn by_id(model: &Model) -> Step<Value, Instance> {
    let options = model.options(Operation::ById);
    sequence!(
        step::when(has_id(model), identity::extract(options.id.clone())),
        read(model.transport()),
        options.response.clone(),
        incoming(model, options),
    )
}

pub(crate) fn find(model: &Model) -> Step<Value, Vec<Instance>> {
    let options = model.options(Operation::Find);
    sequence!(
        read(model.transport()),
        options.response.clone(),
        require_array(),
        step::each(incoming(model, options)),
    )
}

/// ```text
/// has id? ── no ──► insert
///    │
///   yes ─► validate ─► (data, remote copy) ─► equal? ── yes ──► "same object."
///                                               │
///                                               no ─► serialize ─► demodelize ─► replace ─► response
/// ```
///
/// The remote copy comes from `by_id`; a 404 there inserts `data` instead and
/// the insert result is compared in its place.
pub(crate) fn save(model: &Model) -> Step<Value, Value> {
    let options = model.options(Operation::Save);
    let insert = insert(model);

    let remote = sequence!(
        fetch_or_insert(by_id(model), insert.clone()),
        options.demodelize.clone(),
    );
    let store = sequence!(
        step::first(),
        options.serialize.clone(),
        options.demodelize.clone(),
        step::join(identity::extract(options.id.clone()), step::identity()),
        replace(model.transport()),
        options.response.clone(),
    );
    let existing = sequence!(
        options.validate.clone(),
        step::join(step::identity(), remote),
        step::branch(unchanged(), step::fail_with(SAME_OBJECT), store),
    );

    step::branch(has_id(model), existing, insert)
}

fn fetch_or_insert(by_id: Step<Value, Instance>, insert: Step<Value, Value>) -> Step<Value, Value> {
    step::from_async(move |data: Value| {
        let by_id = Arc::clone(&by_id);
        let insert = Arc::clone(&insert);
        async move {
            match by_id(data.clone()).await {
                Ok(found) => {
                    debug!("Remote copy found");
                    Ok(found.into_data())
                }
                Err(e) if e.is_not_found() => {
                    info!("Remote copy missing, inserting instead");
                    insert(data).await
                }
                Err(e) => Err(e),
            }
        }
    })
}

fn unchanged() -> Predicate<(Value, Value)> {
    step::predicate(|(data, remote): &(Value, Value)| Ok(same_value(data, remote)))
}

/// Deep equality where numbers compare by value, so `1` equals `1.0`.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                x.as_f64() == y.as_f64()
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_value(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| same_value(x, y)))
        }
        _ => a == b,
    }
}
