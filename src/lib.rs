//! # `pledge`: single-threaded promises with combinators
//!
//! This crate implements a deferred-computation primitive, the
//! [Promise](futures::promise::Promise), together with the usual family of
//! combinators over collections of promises ([all](combinators::all),
//! [all_settled](combinators::all_settled), [any](combinators::any) and
//! [race](combinators::race)).
//!
//! A promise is settled exactly once, by the executor closure that created
//! it. Everything that reacts to a settlement (observers, chained handlers,
//! combinators) runs later, from a per-thread first-in first-out job queue,
//! never from inside the call that settled it. The queue is driven by the
//! [task] module, which can also run `async` tasks and lets promises be
//! `.await`ed.
//!
//! Delays are measured on a virtual clock owned by the executor (see
//! [futures::timer]), so code that waits "500ms" runs instantly and
//! deterministically.
//!
//! ## Example
//!
//! ```
//! use pledge::combinators::race;
//! use pledge::futures::promise::Outcome;
//! use pledge::futures::timer::Timer;
//! use pledge::task::Executor;
//! use std::time::Duration;
//!
//! let fast = Timer::resolve_after::<_, String>(Duration::from_millis(100), "fast");
//! let slow = Timer::resolve_after(Duration::from_millis(500), "slow");
//!
//! let winner = race([fast, slow]).and_then(|v| Ok(v.to_uppercase()));
//!
//! Executor::run();
//! assert_eq!(winner.outcome(), Some(Outcome::Fulfilled("FAST".to_string())));
//! ```
pub mod combinators;
pub mod error;
pub mod futures;
pub(crate) mod reactor;
pub mod task;

/// Route `log` output through the test harness. `RUST_LOG=trace` shows
/// settlement, executor and timer activity for a failing test.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
