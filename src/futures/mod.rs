//! Promises and the futures built around them.
//!
//! - `promise`: the [Promise](promise::Promise) state machine, its
//!   [Resolver](promise::Resolver) and the observer protocol.
//! - `chain`: deriving new promises from settled ones (`continue_with`,
//!   `and_then`, `recover_with`, `finally_run`, `flat_then`).
//! - `wait`: awaiting a promise from `async` code.
//! - `timer`: scheduling callbacks and delayed promises on the virtual clock.
//!
//! Promises are single-threaded: they, and every callback attached to them,
//! live on the thread whose [Executor](crate::task::Executor) runs them.
pub mod chain;
pub mod promise;
pub mod timer;
pub mod wait;
