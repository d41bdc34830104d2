pub use clock::TimerToken;
use clock::VirtualClock;
use log::trace;
use std::{cell::RefCell, time::Duration};

mod clock;

type Callback = Box<dyn FnMut()>;

pub(crate) struct Reactor {}

thread_local! {
    static REACTOR: RefCell<VirtualClock<Callback>> = RefCell::new(VirtualClock::new());
}

impl Reactor {
    pub fn schedule(delay: Duration, period: Option<Duration>, cb: Callback) -> TimerToken {
        REACTOR.with(|r| r.borrow_mut().schedule(delay, period, cb))
    }

    pub fn cancel(token: TimerToken) -> bool {
        REACTOR.with(|r| r.borrow_mut().cancel(token))
    }

    pub fn now() -> Duration {
        REACTOR.with(|r| r.borrow().now())
    }

    pub fn has_timers() -> bool {
        REACTOR.with(|r| !r.borrow().is_empty())
    }

    pub fn advance_to(t: Duration) {
        REACTOR.with(|r| r.borrow_mut().advance_to(t))
    }

    /// Fire the earliest timer due no later than `limit`. Returns `false` if
    /// there was none.
    ///
    /// The callback runs with the reactor unborrowed so that it may schedule
    /// or cancel timers itself.
    pub fn react(limit: Option<Duration>) -> bool {
        let Some(expired) = REACTOR.with(|r| r.borrow_mut().expire(limit)) else {
            return false;
        };

        let mut cb = expired.obj;

        trace!("timer {:?} fired at {:?}", expired.token, Self::now());
        cb();

        if let Some(period) = expired.period {
            REACTOR.with(|r| r.borrow_mut().rearm(expired.token, period, cb));
        }

        true
    }
}
