//! Error types.
//!
//! Failures of the promises themselves are never raised: they travel as
//! rejection reasons chosen by the caller (`E` in `Promise<T, E>`). The types
//! here cover the two cases the crate produces on its own: the runtime giving
//! up on a future that can no longer make progress, and [any](crate::combinators::any)
//! finding that every one of its inputs was rejected.
use thiserror::Error;

/// Errors produced by the runtime.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The executor ran out of queued jobs and timers while the future passed
    /// to [Executor::block_on](crate::task::Executor::block_on) was still
    /// pending. Nothing left on this thread could ever wake it.
    #[error("executor stalled before the future completed")]
    Stalled,
}

/// Rejection reason of [any](crate::combinators::any) when no input fulfilled.
///
/// Holds one reason per input, in the order the inputs were given (not the
/// order in which they were rejected). An empty aggregate means `any` was
/// called with no inputs at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("all {} inputs were rejected", .reasons.len())]
pub struct AggregateError<E> {
    reasons: Vec<E>,
}

impl<E> AggregateError<E> {
    pub(crate) fn new(reasons: Vec<E>) -> Self {
        Self { reasons }
    }

    /// The rejection reasons, index-aligned with the inputs.
    pub fn reasons(&self) -> &[E] {
        &self.reasons
    }

    pub fn into_reasons(self) -> Vec<E> {
        self.reasons
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }
}
