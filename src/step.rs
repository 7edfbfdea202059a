//! # Step Combinators
//!
//! Every model operation is assembled from [`Step`]s: shared async functions
//! from one value to the next. Hooks are steps too, so a pipeline is nothing
//! more than hooks and transport calls glued together with the combinators in
//! this module.
//!
//! | Combinator | Shape |
//! |------------|-------|
//! | [`sequence!`](crate::sequence) / [`then`] | `a → b → c`, stops at the first `Err` |
//! | [`join`] / [`parallel`] | same input to every step, polled concurrently, ordered results |
//! | [`each`] | one step over every element of a `Vec`, concurrently, order kept |
//! | [`branch`] / [`when`] | pick a step from a [`Verdict`] |
//! | [`fail_with`] | always `Err(ModelError::Rejected)` |
//!
//! Combinators only propagate failures. Recovering from one is the job of the
//! pipeline that needs it (see `save`).
//!
//! ```rust
//! use delmo::step::{self, Step};
//! use delmo::sequence;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let double: Step<i64, i64> = step::from_fn(|n: i64| Ok(n * 2));
//! let describe: Step<i64, String> = step::from_fn(|n: i64| Ok(format!("n = {n}")));
//! let pipeline = sequence!(double.clone(), double, describe);
//!
//! assert_eq!(pipeline(5).await.unwrap(), "n = 20");
//! # }
//! ```

use crate::error::{ModelError, Result};
use futures::future::{self, BoxFuture};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

/// The deferred result every step produces.
pub type StepFuture<T> = BoxFuture<'static, Result<T>>;

/// A shareable async function from `I` to `O`.
pub type Step<I, O> = Arc<dyn Fn(I) -> StepFuture<O> + Send + Sync>;

/// Outcome of a branch predicate.
///
/// `Ready` is decided on the spot and the chosen branch starts without an
/// extra suspension point; `Deferred` is awaited first.
pub enum Verdict {
    Ready(Result<bool>),
    Deferred(StepFuture<bool>),
}

/// Decides which side of a [`branch`] runs.
pub type Predicate<I> = Arc<dyn Fn(&I) -> Verdict + Send + Sync>;

/// Lifts a synchronous fallible function into a step.
///
/// The function runs when the returned future is first polled, so an `Err`
/// lands in the same channel as an async failure.
pub fn from_fn<I, O, F>(f: F) -> Step<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Result<O> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |input: I| -> StepFuture<O> {
        let f = Arc::clone(&f);
        Box::pin(async move { f(input) })
    })
}

/// Lifts an async function into a step.
pub fn from_async<I, O, F, Fut>(f: F) -> Step<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    Arc::new(move |input: I| -> StepFuture<O> { Box::pin(f(input)) })
}

/// Passes its input through unchanged.
pub fn identity<T: Send + 'static>() -> Step<T, T> {
    Arc::new(|input: T| -> StepFuture<T> { Box::pin(future::ready(Ok(input))) })
}

/// Keeps the left half of a pair.
pub fn first<A, B>() -> Step<(A, B), A>
where
    A: Send + 'static,
    B: Send + 'static,
{
    from_fn(|(left, _): (A, B)| Ok(left))
}

/// Runs `first`, then feeds its output to `next`.
pub fn then<A, B, C>(first: Step<A, B>, next: Step<B, C>) -> Step<A, C>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
{
    Arc::new(move |input: A| -> StepFuture<C> {
        let pending = first(input);
        let next = Arc::clone(&next);
        Box::pin(async move {
            let value = pending.await?;
            next(value).await
        })
    })
}

/// Chains any number of steps with [`then`].
#[macro_export]
macro_rules! sequence {
    ($only:expr $(,)?) => {
        $only
    };
    ($first:expr, $($rest:expr),+ $(,)?) => {
        $crate::step::then($first, $crate::sequence!($($rest),+))
    };
}

/// Runs two steps concurrently on the same input.
pub fn join<I, A, B>(left: Step<I, A>, right: Step<I, B>) -> Step<I, (A, B)>
where
    I: Clone + Send + 'static,
    A: Send + 'static,
    B: Send + 'static,
{
    Arc::new(move |input: I| -> StepFuture<(A, B)> {
        let left = left(input.clone());
        let right = right(input);
        Box::pin(future::try_join(left, right))
    })
}

/// Runs every step concurrently on the same input; results follow `steps` order.
pub fn parallel<I, O>(steps: Vec<Step<I, O>>) -> Step<I, Vec<O>>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
{
    Arc::new(move |input: I| -> StepFuture<Vec<O>> {
        let pending: Vec<_> = steps.iter().map(|step| step(input.clone())).collect();
        Box::pin(future::try_join_all(pending))
    })
}

/// Maps `step` over every element concurrently; results follow input order.
pub fn each<I, O>(step: Step<I, O>) -> Step<Vec<I>, Vec<O>>
where
    I: Send + 'static,
    O: Send + 'static,
{
    Arc::new(move |items: Vec<I>| -> StepFuture<Vec<O>> {
        let pending: Vec<_> = items.into_iter().map(|item| step(item)).collect();
        Box::pin(future::try_join_all(pending))
    })
}

/// Runs `on_true` or `on_false` depending on `test`.
pub fn branch<I, O>(test: Predicate<I>, on_true: Step<I, O>, on_false: Step<I, O>) -> Step<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    Arc::new(move |input: I| -> StepFuture<O> {
        match test(&input) {
            Verdict::Ready(Ok(true)) => on_true(input),
            Verdict::Ready(Ok(false)) => on_false(input),
            Verdict::Ready(Err(err)) => Box::pin(future::ready(Err(err))),
            Verdict::Deferred(pending) => {
                let on_true = Arc::clone(&on_true);
                let on_false = Arc::clone(&on_false);
                Box::pin(async move {
                    if pending.await? {
                        on_true(input).await
                    } else {
                        on_false(input).await
                    }
                })
            }
        }
    })
}

/// [`branch`] whose false side passes the input through.
pub fn when<T: Send + 'static>(test: Predicate<T>, on_true: Step<T, T>) -> Step<T, T> {
    branch(test, on_true, identity())
}

/// Wraps a synchronous test as an immediately decided predicate.
pub fn predicate<I, F>(f: F) -> Predicate<I>
where
    I: 'static,
    F: Fn(&I) -> Result<bool> + Send + Sync + 'static,
{
    Arc::new(move |input: &I| Verdict::Ready(f(input)))
}

/// A step that always fails with `message`, keeping its input as context.
pub fn fail_with<I, O>(message: impl Into<String>) -> Step<I, O>
where
    I: Serialize + Send + 'static,
    O: Send + 'static,
{
    let message = message.into();
    Arc::new(move |input: I| -> StepFuture<O> {
        let params = serde_json::to_value(&input)
            .map(|value| vec![value])
            .unwrap_or_default();
        Box::pin(future::ready(Err(ModelError::Rejected {
            message: message.clone(),
            params,
        })))
    })
}
