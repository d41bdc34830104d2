//! The promise state machine.
//!
//! A [Promise] is a handle to a value that may not exist yet. It starts out
//! pending and is settled at most once, either *fulfilled* with a `T` or
//! *rejected* with an `E`, by the [Resolver] that was handed to its executor.
//!
//! Interested parties register observers with [Promise::observe]. Observers
//! are never called from inside [Resolver::fulfill] or [Resolver::reject], nor
//! from inside `observe` itself: every invocation is queued on the thread's
//! [Executor] and happens on a later turn. This holds whether the promise was
//! already settled when the observer was registered or not, so code reading a
//! promise behaves the same regardless of timing.
//!
//! # Example
//!
//! ```
//! use pledge::futures::promise::{Outcome, Promise};
//! use pledge::task::Executor;
//!
//! let p = Promise::<u32, String>::new(|resolver| {
//!     resolver.fulfill(1);
//!     resolver.reject("too late".into()); // ignored, already settled
//!     Ok(())
//! });
//!
//! p.observe(|v| println!("got {v}"), |e| println!("failed: {e}"));
//!
//! Executor::run();
//! assert_eq!(p.outcome(), Some(Outcome::Fulfilled(1)));
//! ```
use std::{
    any::Any,
    cell::{Cell, RefCell},
    fmt, mem,
    rc::Rc,
};

use log::trace;

use crate::task::Executor;

/// Lifecycle of a promise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

/// How a promise was settled.
///
/// This is also the per-input record produced by
/// [all_settled](crate::combinators::all_settled).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Outcome<T, E> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Outcome::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }

    /// The value, if fulfilled.
    pub fn fulfilled(self) -> Option<T> {
        match self {
            Outcome::Fulfilled(v) => Some(v),
            Outcome::Rejected(_) => None,
        }
    }

    /// The reason, if rejected.
    pub fn rejected(self) -> Option<E> {
        match self {
            Outcome::Fulfilled(_) => None,
            Outcome::Rejected(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        self.into()
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(value: Result<T, E>) -> Self {
        match value {
            Ok(v) => Outcome::Fulfilled(v),
            Err(e) => Outcome::Rejected(e),
        }
    }
}

impl<T, E> From<Outcome<T, E>> for Result<T, E> {
    fn from(value: Outcome<T, E>) -> Self {
        match value {
            Outcome::Fulfilled(v) => Ok(v),
            Outcome::Rejected(e) => Err(e),
        }
    }
}

struct Reaction<T, E> {
    on_fulfilled: Box<dyn FnOnce(T)>,
    on_rejected: Box<dyn FnOnce(E)>,
}

struct Inner<T, E> {
    state: State<T, E>,
    reactions: Vec<Reaction<T, E>>,
    release: fn(Vec<Reaction<T, E>>) -> Box<dyn Any>,
}

fn release<T: 'static, E: 'static>(reactions: Vec<Reaction<T, E>>) -> Box<dyn Any> {
    Box::new(reactions)
}

thread_local! {
    static RELEASED: RefCell<Vec<Box<dyn Any>>> = const { RefCell::new(Vec::new()) };
    static RELEASING: Cell<bool> = const { Cell::new(false) };
}

// Pending reactions own the resolvers of derived promises, which own the
// next link's reactions, and so on. Dropping them in place would recurse once
// per link, so they are parked here and dropped by the outermost `drop`.
impl<T, E> Drop for Inner<T, E> {
    fn drop(&mut self) {
        if self.reactions.is_empty() {
            return;
        }

        let reactions = (self.release)(mem::take(&mut self.reactions));

        let Ok(nested) = RELEASING.try_with(|r| r.replace(true)) else {
            // Thread-locals are being torn down.
            return;
        };

        let parked = RELEASED.try_with(|r| r.borrow_mut().push(reactions));
        if parked.is_err() || nested {
            return;
        }

        while let Some(next) = RELEASED.with(|r| r.borrow_mut().pop()) {
            drop(next);
        }

        RELEASING.with(|r| r.set(false));
    }
}

/// A settle-once container for an eventual value or failure.
///
/// Cloning a `Promise` clones the handle, not the computation: all clones
/// observe the same settlement.
///
/// See the [module-level documentation](self) for more information.
pub struct Promise<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Promise")
            .field(&self.inner.borrow().state)
            .finish()
    }
}

/// The right to settle one promise.
///
/// Handed to the executor passed to [Promise::new]. Both methods consume
/// nothing and may be called any number of times; only the first call on any
/// clone has an effect.
pub struct Resolver<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Resolver<T, E> {
    /// Settle the promise with `value`.
    pub fn fulfill(&self, value: T) {
        self.settle(Ok(value))
    }

    /// Settle the promise with `reason`.
    pub fn reject(&self, reason: E) {
        self.settle(Err(reason))
    }

    /// Fulfill on `Ok`, reject on `Err`.
    pub fn settle(&self, result: Result<T, E>) {
        let reactions = {
            let mut inner = self.inner.borrow_mut();

            if !matches!(inner.state, State::Pending) {
                trace!("ignoring settlement of an already settled promise");
                return;
            }

            inner.state = match &result {
                Ok(v) => State::Fulfilled(v.clone()),
                Err(e) => State::Rejected(e.clone()),
            };

            mem::take(&mut inner.reactions)
        };

        trace!(
            "promise {}, dispatching {} observer(s)",
            if result.is_ok() { "fulfilled" } else { "rejected" },
            reactions.len()
        );

        match result {
            Ok(value) => {
                for reaction in reactions {
                    let value = value.clone();
                    Executor::defer(move || (reaction.on_fulfilled)(value));
                }
            }
            Err(reason) => {
                for reaction in reactions {
                    let reason = reason.clone();
                    Executor::defer(move || (reaction.on_rejected)(reason));
                }
            }
        }
    }

    /// Whether the promise is still pending.
    pub fn is_pending(&self) -> bool {
        matches!(self.inner.borrow().state, State::Pending)
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Promise<T, E> {
    /// Create a promise and run `executor` on it right away.
    ///
    /// The executor receives the promise's [Resolver]. If it returns `Err`,
    /// the promise is rejected with that error, unless the executor settled it
    /// before failing.
    pub fn new(executor: impl FnOnce(Resolver<T, E>) -> Result<(), E>) -> Self {
        let (promise, resolver) = Self::deferred();

        if let Err(reason) = executor(resolver.clone()) {
            resolver.reject(reason);
        }

        promise
    }

    /// Create a pending promise and hand its resolver to the caller.
    ///
    /// ```
    /// use pledge::futures::promise::Promise;
    ///
    /// let (p, resolver) = Promise::<&str, ()>::deferred();
    /// assert!(p.is_pending());
    /// resolver.fulfill("done");
    /// assert!(!p.is_pending());
    /// ```
    pub fn deferred() -> (Self, Resolver<T, E>) {
        let inner = Rc::new(RefCell::new(Inner {
            state: State::Pending,
            reactions: Vec::new(),
            release: release::<T, E>,
        }));

        (
            Self {
                inner: inner.clone(),
            },
            Resolver { inner },
        )
    }

    /// A promise already fulfilled with `value`.
    pub fn fulfilled(value: T) -> Self {
        Self::settled(State::Fulfilled(value))
    }

    /// A promise already rejected with `reason`.
    pub fn rejected(reason: E) -> Self {
        Self::settled(State::Rejected(reason))
    }

    fn settled(state: State<T, E>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state,
                reactions: Vec::new(),
                release: release::<T, E>,
            })),
        }
    }

    /// Register one observer for each outcome.
    ///
    /// Exactly one of the two will eventually be called, once, if the promise
    /// ever settles. Neither is called before this function returns: if the
    /// promise is already settled, the matching observer is queued behind
    /// whatever the executor has queued so far.
    pub fn observe(
        &self,
        on_fulfilled: impl FnOnce(T) + 'static,
        on_rejected: impl FnOnce(E) + 'static,
    ) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;

        match &inner.state {
            State::Pending => inner.reactions.push(Reaction {
                on_fulfilled: Box::new(on_fulfilled),
                on_rejected: Box::new(on_rejected),
            }),
            State::Fulfilled(v) => {
                let v = v.clone();
                Executor::defer(move || on_fulfilled(v));
            }
            State::Rejected(e) => {
                let e = e.clone();
                Executor::defer(move || on_rejected(e));
            }
        }
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> State<T, E> {
        self.inner.borrow().state.clone()
    }

    /// The outcome, or `None` while pending.
    pub fn outcome(&self) -> Option<Outcome<T, E>> {
        match &self.inner.borrow().state {
            State::Pending => None,
            State::Fulfilled(v) => Some(Outcome::Fulfilled(v.clone())),
            State::Rejected(e) => Some(Outcome::Rejected(e.clone())),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.inner.borrow().state, State::Pending)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc, time::Duration};

    use super::{Outcome, Promise, State};
    use crate::{futures::timer::Timer, task::Executor};

    type Log = Rc<RefCell<Vec<String>>>;

    fn observe_into(p: &Promise<u32, String>, log: &Log, name: &'static str) {
        let ok = log.clone();
        let err = log.clone();
        p.observe(
            move |v| ok.borrow_mut().push(format!("{name}:ok:{v}")),
            move |e| err.borrow_mut().push(format!("{name}:err:{e}")),
        );
    }

    #[test]
    fn fulfill_then_reject_keeps_first() {
        crate::init_test_logging();
        let p = Promise::<u32, String>::new(|r| {
            r.fulfill(1);
            r.reject("E".into());
            r.fulfill(2);
            Ok(())
        });
        assert_eq!(p.state(), State::Fulfilled(1));
    }

    #[test]
    fn reject_then_fulfill_keeps_first() {
        crate::init_test_logging();
        let p = Promise::<u32, String>::new(|r| {
            r.reject("E".into());
            r.fulfill(1);
            r.reject("F".into());
            Ok(())
        });
        assert_eq!(p.state(), State::Rejected("E".into()));
    }

    #[test]
    fn settle_once_across_resolver_clones() {
        crate::init_test_logging();
        let (p, r) = Promise::<u32, String>::deferred();
        let r2 = r.clone();
        r2.fulfill(3);
        r.fulfill(4);
        assert!(!r.is_pending());
        assert_eq!(p.outcome(), Some(Outcome::Fulfilled(3)));
    }

    #[test]
    fn executor_error_rejects() {
        crate::init_test_logging();
        let p = Promise::<u32, String>::new(|_| Err("exploded".into()));
        assert_eq!(p.outcome(), Some(Outcome::Rejected("exploded".into())));
    }

    #[test]
    fn executor_error_after_settle_is_ignored() {
        crate::init_test_logging();
        let p = Promise::<u32, String>::new(|r| {
            r.fulfill(9);
            Err("exploded".into())
        });
        assert_eq!(p.outcome(), Some(Outcome::Fulfilled(9)));
    }

    #[test]
    fn observers_fire_once_in_registration_order() {
        crate::init_test_logging();
        let log = Log::default();
        let (p, r) = Promise::deferred();

        observe_into(&p, &log, "A");
        observe_into(&p, &log, "B");

        r.fulfill(5);
        r.fulfill(6);
        assert!(log.borrow().is_empty());

        Executor::run();
        assert_eq!(*log.borrow(), vec!["A:ok:5", "B:ok:5"]);
    }

    #[test]
    fn settlement_never_dispatches_inline() {
        crate::init_test_logging();
        let log = Log::default();
        let (p, r) = Promise::deferred();
        observe_into(&p, &log, "A");

        r.reject("boom".into());
        log.borrow_mut().push("after reject".into());

        Executor::run();
        assert_eq!(*log.borrow(), vec!["after reject", "A:err:boom"]);
    }

    #[test]
    fn late_registration_is_async() {
        crate::init_test_logging();
        let log = Log::default();
        let p = Promise::fulfilled(7);

        observe_into(&p, &log, "late");
        assert!(log.borrow().is_empty());

        Executor::run();
        assert_eq!(*log.borrow(), vec!["late:ok:7"]);
    }

    #[test]
    fn late_registration_runs_after_queued_work() {
        crate::init_test_logging();
        let log = Log::default();
        let p = Promise::rejected("X".to_string());

        {
            let log = log.clone();
            Executor::defer(move || log.borrow_mut().push("queued first".into()));
        }
        observe_into(&p, &log, "late");

        Executor::run();
        assert_eq!(*log.borrow(), vec!["queued first", "late:err:X"]);
    }

    #[test]
    fn observer_registered_during_dispatch_runs_in_later_turn() {
        crate::init_test_logging();
        let log = Log::default();
        let (p, r) = Promise::<u32, String>::deferred();

        {
            let log = log.clone();
            let p2 = p.clone();
            p.observe(
                move |v| {
                    log.borrow_mut().push(format!("A:ok:{v}"));
                    observe_into(&p2, &log, "nested");
                },
                |_| {},
            );
        }
        observe_into(&p, &log, "B");

        r.fulfill(1);
        Executor::run();

        assert_eq!(*log.borrow(), vec!["A:ok:1", "B:ok:1", "nested:ok:1"]);
    }

    #[test]
    fn settles_after_timer() {
        crate::init_test_logging();
        let log = Log::default();
        let p = Promise::<u32, String>::new(|r| {
            Timer::schedule_after(Duration::from_millis(100), move || r.fulfill(42));
            Ok(())
        });
        observe_into(&p, &log, "A");

        assert!(p.is_pending());
        Executor::run();

        assert_eq!(*log.borrow(), vec!["A:ok:42"]);
        assert_eq!(Timer::now(), Duration::from_millis(100));
    }

    #[test]
    fn dropped_resolver_leaves_promise_pending() {
        crate::init_test_logging();
        let p = Promise::<u32, String>::new(|_r| Ok(()));
        Executor::run();
        assert!(p.is_pending());
        assert_eq!(p.outcome(), None);
    }

    #[test]
    fn outcome_conversions() {
        crate::init_test_logging();
        let ok: Outcome<u8, &str> = Ok(1).into();
        let err: Outcome<u8, &str> = Err("e").into();

        assert!(ok.is_fulfilled());
        assert!(err.is_rejected());
        assert_eq!(ok.into_result(), Ok(1));
        assert_eq!(err.clone().fulfilled(), None);
        assert_eq!(err.rejected(), Some("e"));
    }
}
