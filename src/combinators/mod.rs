//! Aggregating many promises into one.
//!
//! | Combinator | Fulfills with | Rejects with |
//! |---|---|---|
//! | [all] | every value, in input order | the first rejection |
//! | [all_settled] | every [Outcome](crate::futures::promise::Outcome), in input order | never |
//! | [any] | the first value | an [AggregateError](crate::error::AggregateError) once every input rejected |
//! | [race] | the first value, if the first settlement is a fulfillment | the first reason, if it is a rejection |
//!
//! Each takes anything iterable whose items are promises or [Input]s, so plain
//! values can be mixed in with [Input::Value]. All of them return a pending
//! promise immediately and settle it from observers of the inputs, never
//! inline. Once the aggregate has settled, inputs settling later are ignored.
//!
//! ```
//! use pledge::combinators::{all, Input};
//! use pledge::futures::promise::{Outcome, Promise};
//! use pledge::task::Executor;
//!
//! let p = all([
//!     Input::Value(1),
//!     Input::Promise(Promise::<u32, String>::fulfilled(2)),
//!     Input::Value(3),
//! ]);
//!
//! Executor::run();
//! assert_eq!(p.outcome(), Some(Outcome::Fulfilled(vec![1, 2, 3])));
//! ```
mod all;
mod all_settled;
mod any;
mod race;

pub use all::all;
pub use all_settled::all_settled;
pub use any::any;
pub use race::race;

use crate::futures::promise::Promise;

/// One input to a combinator.
#[derive(Debug, Clone)]
pub enum Input<T, E> {
    /// Used as if it were an already fulfilled promise.
    Value(T),
    Promise(Promise<T, E>),
}

impl<T: Clone + 'static, E: Clone + 'static> Input<T, E> {
    pub fn into_promise(self) -> Promise<T, E> {
        match self {
            Input::Value(v) => Promise::fulfilled(v),
            Input::Promise(p) => p,
        }
    }
}

impl<T, E> From<Promise<T, E>> for Input<T, E> {
    fn from(p: Promise<T, E>) -> Self {
        Input::Promise(p)
    }
}

/// Types a combinator accepts as inputs.
pub trait IntoInput {
    type Value: Clone + 'static;
    type Error: Clone + 'static;

    fn into_input(self) -> Input<Self::Value, Self::Error>;
}

impl<T: Clone + 'static, E: Clone + 'static> IntoInput for Input<T, E> {
    type Value = T;
    type Error = E;

    fn into_input(self) -> Input<T, E> {
        self
    }
}

impl<T: Clone + 'static, E: Clone + 'static> IntoInput for Promise<T, E> {
    type Value = T;
    type Error = E;

    fn into_input(self) -> Input<T, E> {
        Input::Promise(self)
    }
}

fn promises<I>(
    inputs: I,
) -> Vec<Promise<<I::Item as IntoInput>::Value, <I::Item as IntoInput>::Error>>
where
    I: IntoIterator,
    I::Item: IntoInput,
{
    inputs
        .into_iter()
        .map(|input| input.into_input().into_promise())
        .collect()
}

/// Per-index results plus a count of the slots still empty.
struct Slots<T> {
    slots: Vec<Option<T>>,
    remaining: usize,
}

impl<T> Slots<T> {
    fn new(n: usize) -> Self {
        Self {
            slots: (0..n).map(|_| None).collect(),
            remaining: n,
        }
    }

    /// Fill slot `idx`. Returns every slot once the last one is filled.
    fn fill(&mut self, idx: usize, value: T) -> Option<Vec<T>> {
        if self.remaining == 0 {
            return None;
        }

        let slot = self.slots.get_mut(idx)?;

        if slot.is_none() {
            self.remaining -= 1;
        }
        *slot = Some(value);

        if self.remaining > 0 {
            return None;
        }

        self.slots.iter_mut().map(Option::take).collect()
    }
}
