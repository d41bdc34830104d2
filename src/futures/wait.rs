//! Awaiting promises from `async` code.
//!
//! [Promise] implements [IntoFuture], so inside a task started with
//! [Executor::spawn](crate::task::Executor::spawn) or
//! [Executor::block_on](crate::task::Executor::block_on) a promise can simply
//! be `.await`ed. The output is `Ok(value)` or `Err(reason)`.
//!
//! ```
//! use pledge::futures::promise::Promise;
//! use pledge::futures::timer::Timer;
//! use pledge::task::Executor;
//! use std::time::Duration;
//!
//! let slow = Timer::resolve_after::<_, ()>(Duration::from_secs(5), "slow");
//! assert_eq!(Executor::block_on(slow.wait()), Ok(Ok("slow")));
//! assert_eq!(Timer::now(), Duration::from_secs(5));
//! ```
use std::{
    cell::RefCell,
    future::{Future, IntoFuture},
    pin::Pin,
    rc::Rc,
    task::{Context, Poll, Waker},
};

use super::promise::Promise;

type WakerSlot = Rc<RefCell<Option<Waker>>>;

/// Future returned by [Promise::wait].
pub struct Wait<T, E> {
    promise: Promise<T, E>,
    waker: Option<WakerSlot>,
}

fn wake(slot: &WakerSlot) {
    if let Some(waker) = slot.borrow_mut().take() {
        waker.wake();
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Future for Wait<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some(outcome) = this.promise.outcome() {
            return Poll::Ready(outcome.into_result());
        }

        match &this.waker {
            Some(slot) => {
                *slot.borrow_mut() = Some(cx.waker().clone());
            }
            None => {
                // One observer pair for the lifetime of this future; later
                // polls only swap the waker it will call.
                let slot = Rc::new(RefCell::new(Some(cx.waker().clone())));
                let on_fulfilled = slot.clone();
                let on_rejected = slot.clone();

                this.promise
                    .observe(move |_| wake(&on_fulfilled), move |_| wake(&on_rejected));
                this.waker = Some(slot);
            }
        }

        Poll::Pending
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Promise<T, E> {
    /// A future that completes when this promise settles.
    pub fn wait(&self) -> Wait<T, E> {
        Wait {
            promise: self.clone(),
            waker: None,
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> IntoFuture for Promise<T, E> {
    type Output = Result<T, E>;
    type IntoFuture = Wait<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        Wait {
            promise: self,
            waker: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;

    use crate::{
        futures::{promise::Promise, timer::Timer},
        task::Executor,
    };

    #[test]
    fn await_fulfilled() -> Result<()> {
        let p = Promise::<u32, String>::fulfilled(1);
        assert_eq!(Executor::block_on(async move { p.await })?, Ok(1));
        Ok(())
    }

    #[test]
    fn await_rejected() -> Result<()> {
        let p = Promise::<u32, String>::rejected("no".into());
        assert_eq!(Executor::block_on(p.wait())?, Err("no".to_string()));
        Ok(())
    }

    #[test]
    fn await_sequence_of_timers() -> Result<()> {
        let total = Executor::block_on(async {
            let a = Timer::resolve_after::<u32, ()>(Duration::from_millis(100), 1).await;
            let b = Timer::resolve_after::<u32, ()>(Duration::from_millis(200), 2).await;
            a.and_then(|a| b.map(|b| a + b))
        })?;

        assert_eq!(total, Ok(3));
        assert_eq!(Timer::now(), Duration::from_millis(300));
        Ok(())
    }

    #[test]
    fn many_waiters_on_one_promise() -> Result<()> {
        let (p, r) = Promise::<&str, ()>::deferred();
        let p2 = p.clone();
        let a = Executor::spawn(async move { p2.await });
        let b = Executor::spawn(p.wait());

        Timer::schedule_after(Duration::from_millis(10), move || r.fulfill("hi"));
        Executor::run();

        assert_eq!(a.outcome().and_then(|o| o.fulfilled()), Some("hi"));
        assert_eq!(b.outcome().and_then(|o| o.fulfilled()), Some("hi"));
        Ok(())
    }
}
