//! # Mock Transport
//!
//! Utilities for testing models without a server.
//!
//! [`MockTransport`] answers transport calls from a queue of expectations and
//! records every call it sees. [`MockPushChannel`] lets a test publish push
//! messages to whatever addresses a model subscribed to.
//!
//! ```rust
//! use delmo::{Config, Model};
//! use delmo::mock::MockTransport;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let transport = MockTransport::new();
//! transport.expect_read(json!(12)).return_ok(json!({"id": 12, "name": "taro"}));
//!
//! let user = Model::new("User", Config::new().transport(transport.clone()));
//! let taro = user.by_id(json!(12)).await.unwrap();
//! assert_eq!(taro["name"], "taro");
//!
//! transport.verify(); // every expectation was consumed
//! # }
//! ```

use crate::error::{ModelError, Result};
use crate::realtime::PushChannel;
use crate::transport::{Response, Transport};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use url::Url;

/// A transport call as the mock saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create { body: Value },
    Read { id_or_query: Value },
    Replace { id: Value, body: Value },
    Remove { id: Value },
}

struct Expectation {
    call: Call,
    response: Result<Response>,
}

#[derive(Default)]
struct State {
    expectations: VecDeque<Expectation>,
    calls: Vec<Call>,
    echo: bool,
    address: Option<Url>,
}

/// A transport with expectation tracking for fluent testing.
///
/// Clones share state, so hand one clone to the model and keep another to
/// set expectations and [`verify`](MockTransport::verify).
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    /// Creates a mock that panics on any call it was not told to expect.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock that answers unexpected calls with `200` and echoes the
    /// request: the body for create/replace, the argument for read/remove.
    pub fn echo() -> Self {
        let mock = Self::default();
        mock.lock().echo = true;
        mock
    }

    /// Reports `address` from [`Transport::address`].
    pub fn with_address(self, address: Url) -> Self {
        self.lock().address = Some(address);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn expect(&self, call: Call) -> ExpectationBuilder {
        ExpectationBuilder {
            call,
            state: Arc::clone(&self.state),
        }
    }

    /// Expects a `create` with exactly `body`.
    pub fn expect_create(&self, body: Value) -> ExpectationBuilder {
        self.expect(Call::Create { body })
    }

    /// Expects a `read` with exactly `id_or_query`.
    pub fn expect_read(&self, id_or_query: Value) -> ExpectationBuilder {
        self.expect(Call::Read { id_or_query })
    }

    /// Expects a `replace` with exactly `id` and `body`.
    pub fn expect_replace(&self, id: Value, body: Value) -> ExpectationBuilder {
        self.expect(Call::Replace { id, body })
    }

    /// Expects a `remove` with exactly `id`.
    pub fn expect_remove(&self, id: Value) -> ExpectationBuilder {
        self.expect(Call::Remove { id })
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let state = self.lock();
        if !state.expectations.is_empty() {
            let remaining: Vec<_> = state.expectations.iter().map(|e| &e.call).collect();
            panic!(
                "Not all expectations were met. {} remaining: {:?}",
                remaining.len(),
                remaining
            );
        }
    }

    fn answer(&self, call: Call) -> Result<Response> {
        let mut state = self.lock();
        state.calls.push(call.clone());

        match state.expectations.pop_front() {
            Some(expectation) => {
                if expectation.call != call {
                    // Unlock first so the mutex is not poisoned.
                    drop(state);
                    panic!(
                        "Unexpected transport call.\n  expected: {:?}\n  received: {:?}",
                        expectation.call, call
                    );
                }
                expectation.response
            }
            None if state.echo => Ok(Response::ok(match call {
                Call::Create { body } | Call::Replace { body, .. } => body,
                Call::Read { id_or_query } => id_or_query,
                Call::Remove { id } => id,
            })),
            None => {
                drop(state);
                panic!("Unexpected transport call with no expectation left: {call:?}");
            }
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn create(&self, body: Value) -> Result<Response> {
        self.answer(Call::Create { body })
    }

    async fn read(&self, id_or_query: Value) -> Result<Response> {
        self.answer(Call::Read { id_or_query })
    }

    async fn replace(&self, id: Value, body: Value) -> Result<Response> {
        self.answer(Call::Replace { id, body })
    }

    async fn remove(&self, id: Value) -> Result<Response> {
        self.answer(Call::Remove { id })
    }

    fn address(&self) -> Option<Url> {
        self.lock().address.clone()
    }
}

/// Builder for a single expectation.
pub struct ExpectationBuilder {
    call: Call,
    state: Arc<Mutex<State>>,
}

impl ExpectationBuilder {
    fn push(self, response: Result<Response>) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.expectations.push_back(Expectation {
            call: self.call,
            response,
        });
    }

    /// Answers with `200 OK` and `body`.
    pub fn return_ok(self, body: Value) {
        self.push(Ok(Response::ok(body)));
    }

    /// Answers with an arbitrary status.
    pub fn return_status(self, status: u16, body: Value) {
        self.push(Ok(Response::new(status, body)));
    }

    /// Fails the call outright, as a broken connection would.
    pub fn return_err(self, error: ModelError) {
        self.push(Err(error));
    }
}

/// An in-process [`PushChannel`]. Tests publish raw text to an address and
/// every subscriber of that address receives it.
#[derive(Clone)]
pub struct MockPushChannel {
    sender: broadcast::Sender<(Url, String)>,
    subscriptions: Arc<Mutex<Vec<Url>>>,
}

impl Default for MockPushChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPushChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            sender,
            subscriptions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Addresses subscribed to so far, in order.
    pub fn subscriptions(&self) -> Vec<Url> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Sends `message` to the subscribers of `address`; returns the number of open streams.
    pub fn publish(&self, address: &Url, message: impl Into<String>) -> usize {
        self.sender
            .send((address.clone(), message.into()))
            .unwrap_or(0)
    }
}

impl PushChannel for MockPushChannel {
    fn subscribe(&self, address: Url) -> BoxStream<'static, Result<String>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(address.clone());

        let receiver = self.sender.subscribe();
        stream::unfold(receiver, move |mut receiver| {
            let address = address.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok((target, message)) if target == address => {
                            return Some((Ok(message), receiver));
                        }
                        Ok(_) | Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_expectations_answer_in_order() {
        let mock = MockTransport::new();
        mock.expect_create(json!({"a": 1})).return_ok(json!({"id": 1, "a": 1}));
        mock.expect_read(json!(1)).return_status(404, json!("gone"));

        let created = mock.create(json!({"a": 1})).await.unwrap();
        assert_eq!(created.body, json!({"id": 1, "a": 1}));

        let missing = mock.read(json!(1)).await.unwrap();
        assert_eq!(missing.status, 404);

        mock.verify();
        assert_eq!(
            mock.calls(),
            vec![
                Call::Create { body: json!({"a": 1}) },
                Call::Read { id_or_query: json!(1) },
            ]
        );
    }

    #[tokio::test]
    async fn test_echo_mode() {
        let mock = MockTransport::echo();
        let response = mock.replace(json!(3), json!({"id": 3})).await.unwrap();
        assert_eq!(response.body, json!({"id": 3}));
        assert_eq!(mock.remove(json!(3)).await.unwrap().body, json!(3));
    }

    #[tokio::test]
    async fn test_return_err() {
        let mock = MockTransport::new();
        mock.expect_remove(json!(1)).return_err(ModelError::custom("connection reset"));
        let err = mock.remove(json!(1)).await.unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
    }

    #[test]
    #[should_panic(expected = "Not all expectations were met")]
    fn test_verify_panics_on_leftovers() {
        let mock = MockTransport::new();
        mock.expect_read(json!(1)).return_ok(json!(null));
        mock.verify();
    }

    #[tokio::test]
    #[should_panic(expected = "Unexpected transport call")]
    async fn test_mismatched_call_panics() {
        let mock = MockTransport::new();
        mock.expect_read(json!(1)).return_ok(json!(null));
        let _ = mock.read(json!(2)).await;
    }

    #[tokio::test]
    async fn test_push_channel_routes_by_address() {
        let push = MockPushChannel::new();
        let users = Url::parse("ws://localhost/api/user/inserted").unwrap();
        let posts = Url::parse("ws://localhost/api/post/inserted").unwrap();
        let mut stream = push.subscribe(users.clone());

        push.publish(&posts, "post");
        push.publish(&users, "user");

        assert_eq!(stream.next().await.unwrap().unwrap(), "user");
        assert_eq!(push.subscriptions(), vec![users]);
    }
}
