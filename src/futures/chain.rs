//! Deriving promises from promises.
//!
//! Every operation here returns a new, pending promise straight away and
//! settles it once the source promise settles. Handlers return a `Result`:
//! `Ok` fulfills the derived promise, `Err` rejects it. A failing handler
//! therefore never unwinds into the caller; it simply turns into a rejection
//! further down the chain, and a later [Promise::recover_with] can turn it
//! back into a value.
//!
//! ```
//! use pledge::futures::promise::{Outcome, Promise};
//! use pledge::task::Executor;
//!
//! let p = Promise::<u32, String>::fulfilled(2)
//!     .and_then(|v| if v > 1 { Err(format!("{v} is too big")) } else { Ok(v) })
//!     .and_then(|v| Ok(v * 10)) // skipped
//!     .recover_with(|e| Ok::<_, ()>(e.len() as u32));
//!
//! Executor::run();
//! assert_eq!(p.outcome(), Some(Outcome::Fulfilled(12)));
//! ```
use super::promise::Promise;

impl<T: Clone + 'static, E: Clone + 'static> Promise<T, E> {
    /// Run `on_fulfilled` or `on_rejected`, depending on how this promise
    /// settles, and settle the returned promise with the handler's result.
    pub fn continue_with<U, F>(
        &self,
        on_fulfilled: impl FnOnce(T) -> Result<U, F> + 'static,
        on_rejected: impl FnOnce(E) -> Result<U, F> + 'static,
    ) -> Promise<U, F>
    where
        U: Clone + 'static,
        F: Clone + 'static,
    {
        let (derived, resolver) = Promise::deferred();
        let on_err = resolver.clone();

        self.observe(
            move |value| resolver.settle(on_fulfilled(value)),
            move |reason| on_err.settle(on_rejected(reason)),
        );

        derived
    }

    /// Transform the value. A rejection passes through untouched.
    pub fn and_then<U>(
        &self,
        on_fulfilled: impl FnOnce(T) -> Result<U, E> + 'static,
    ) -> Promise<U, E>
    where
        U: Clone + 'static,
    {
        self.continue_with(on_fulfilled, Err)
    }

    /// Handle a rejection. A fulfillment passes through untouched.
    pub fn recover_with<F>(
        &self,
        on_rejected: impl FnOnce(E) -> Result<T, F> + 'static,
    ) -> Promise<T, F>
    where
        F: Clone + 'static,
    {
        self.continue_with(Ok, on_rejected)
    }

    /// Run `on_settled` whatever the outcome, then pass the original value or
    /// reason on unchanged.
    pub fn finally_run(&self, on_settled: impl FnOnce() + 'static) -> Promise<T, E> {
        let (derived, resolver) = Promise::deferred();
        let on_err = resolver.clone();

        // Only one of the two observers ever runs, but both need to own the
        // callback.
        let on_settled = std::rc::Rc::new(std::cell::Cell::new(Some(on_settled)));
        let on_settled2 = on_settled.clone();

        self.observe(
            move |value| {
                if let Some(f) = on_settled.take() {
                    f();
                }
                resolver.fulfill(value);
            },
            move |reason| {
                if let Some(f) = on_settled2.take() {
                    f();
                }
                on_err.reject(reason);
            },
        );

        derived
    }

    /// Like [Promise::and_then], but the handler produces another promise and
    /// the returned promise follows whichever way that one settles.
    pub fn flat_then<U>(
        &self,
        on_fulfilled: impl FnOnce(T) -> Promise<U, E> + 'static,
    ) -> Promise<U, E>
    where
        U: Clone + 'static,
    {
        let (derived, resolver) = Promise::deferred();
        let on_err = resolver.clone();

        self.observe(
            move |value| {
                let next = on_fulfilled(value);
                let rejecter = resolver.clone();
                next.observe(move |v| resolver.fulfill(v), move |e| rejecter.reject(e));
            },
            move |reason| on_err.reject(reason),
        );

        derived
    }
}
