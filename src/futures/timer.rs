//! Timers on a virtual clock.
//!
//! Each thread has a clock that starts at zero and only moves forward when
//! the executor runs out of queued jobs and fires the next timer. A timer
//! scheduled for 500ms therefore "takes" 500ms of virtual time and no real
//! time at all, and timers always fire in deadline order (ties in the order
//! they were scheduled).
//!
//! The promise core does not depend on this module. It exists so that
//! promises can settle after a delay, which is what tests and demos of
//! ordering need, and so that a [race](crate::combinators::race) can be given
//! a deadline.
//!
//! # Example
//!
//! Give a slow computation 200ms to finish:
//!
//! ```
//! use pledge::combinators::race;
//! use pledge::futures::promise::Outcome;
//! use pledge::futures::timer::Timer;
//! use pledge::task::Executor;
//! use std::time::Duration;
//!
//! let work = Timer::resolve_after(Duration::from_millis(500), "result");
//! let deadline = Timer::reject_after(Duration::from_millis(200), "timed out");
//! let p = race([work, deadline]);
//!
//! Executor::run();
//! assert_eq!(p.outcome(), Some(Outcome::Rejected("timed out")));
//! ```
use std::{convert::Infallible, time::Duration};

pub use crate::reactor::TimerToken;

use super::promise::Promise;
use crate::reactor::Reactor;

/// Entry points for scheduling work on this thread's virtual clock.
pub struct Timer;

impl Timer {
    /// Run `f` once, `delay` after the current virtual time.
    pub fn schedule_after(delay: Duration, f: impl FnOnce() + 'static) -> TimerToken {
        let mut f = Some(f);
        Reactor::schedule(
            delay,
            None,
            Box::new(move || {
                if let Some(f) = f.take() {
                    f()
                }
            }),
        )
    }

    /// Run `f` every `period`, starting one period from now, until the
    /// returned token is cancelled. `f` may cancel its own token.
    ///
    /// A zero period is treated as one nanosecond, so that virtual time keeps
    /// moving.
    pub fn schedule_every(period: Duration, f: impl FnMut() + 'static) -> TimerToken {
        let period = period.max(Duration::from_nanos(1));
        Reactor::schedule(period, Some(period), Box::new(f))
    }

    /// Cancel a timer. Returns `false` if it had already fired (one-shot
    /// timers) or was cancelled before.
    pub fn cancel(token: TimerToken) -> bool {
        Reactor::cancel(token)
    }

    /// The current virtual time.
    pub fn now() -> Duration {
        Reactor::now()
    }

    /// A promise fulfilled once `d` has elapsed.
    #[must_use]
    pub fn sleep(d: Duration) -> Promise<(), Infallible> {
        Self::resolve_after(d, ())
    }

    /// A promise fulfilled with `value` once `d` has elapsed.
    pub fn resolve_after<T, E>(d: Duration, value: T) -> Promise<T, E>
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        Promise::new(|resolver| {
            Self::schedule_after(d, move || resolver.fulfill(value));
            Ok(())
        })
    }

    /// A promise rejected with `reason` once `d` has elapsed.
    pub fn reject_after<T, E>(d: Duration, reason: E) -> Promise<T, E>
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        Promise::new(|resolver| {
            Self::schedule_after(d, move || resolver.reject(reason));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc, time::Duration};

    use super::Timer;
    use crate::{futures::promise::Outcome, task::Executor};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn fires_in_deadline_order() {
        crate::init_test_logging();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (name, delay) in [("c", 300), ("a", 100), ("b", 200)] {
            let log = log.clone();
            Timer::schedule_after(ms(delay), move || {
                log.borrow_mut().push((name, Timer::now()))
            });
        }

        Executor::run();
        assert_eq!(
            *log.borrow(),
            vec![("a", ms(100)), ("b", ms(200)), ("c", ms(300))]
        );
    }

    #[test]
    fn cancelled_timer_never_fires() {
        crate::init_test_logging();
        let fired = Rc::new(RefCell::new(false));
        let fired2 = fired.clone();
        let token = Timer::schedule_after(ms(10), move || *fired2.borrow_mut() = true);

        assert!(Timer::cancel(token));
        Executor::run();

        assert!(!*fired.borrow());
        assert!(!Timer::cancel(token));
    }

    #[test]
    fn timer_can_cancel_a_later_one() {
        crate::init_test_logging();
        let fired = Rc::new(RefCell::new(Vec::new()));
        let f2 = fired.clone();
        let later = Timer::schedule_after(ms(20), move || f2.borrow_mut().push("later"));
        let f1 = fired.clone();
        Timer::schedule_after(ms(10), move || {
            f1.borrow_mut().push("first");
            Timer::cancel(later);
        });

        Executor::run();
        assert_eq!(*fired.borrow(), vec!["first"]);
    }

    #[test]
    fn jobs_drain_between_timers() {
        crate::init_test_logging();
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in ["t1", "t2"] {
            let log = log.clone();
            Timer::schedule_after(ms(10), move || {
                log.borrow_mut().push(name.to_string());
                let log = log.clone();
                Executor::defer(move || log.borrow_mut().push(format!("{name} job")));
            });
        }

        Executor::run();
        assert_eq!(*log.borrow(), vec!["t1", "t1 job", "t2", "t2 job"]);
    }

    #[test]
    fn repeating_timer_until_cancelled() {
        crate::init_test_logging();
        let ticks = Rc::new(RefCell::new(Vec::new()));
        let token = Rc::new(RefCell::new(None));

        let t2 = ticks.clone();
        let tok2 = token.clone();
        *token.borrow_mut() = Some(Timer::schedule_every(ms(100), move || {
            t2.borrow_mut().push(Timer::now());
            if t2.borrow().len() == 3 {
                if let Some(token) = *tok2.borrow() {
                    Timer::cancel(token);
                }
            }
        }));

        Executor::run();
        assert_eq!(*ticks.borrow(), vec![ms(100), ms(200), ms(300)]);
    }

    #[test]
    fn run_for_stops_at_limit() {
        crate::init_test_logging();
        let count = Rc::new(RefCell::new(0));
        let c2 = count.clone();
        let token = Timer::schedule_every(ms(30), move || *c2.borrow_mut() += 1);

        Executor::run_for(ms(100));
        assert_eq!(*count.borrow(), 3);
        assert_eq!(Timer::now(), ms(100));

        Executor::run_for(ms(20));
        assert_eq!(*count.borrow(), 4);

        assert!(Timer::cancel(token));
        Executor::run();
        assert_eq!(*count.borrow(), 4);
    }

    #[test]
    fn sleep_and_delayed_settlement() {
        crate::init_test_logging();
        let s = Timer::sleep(ms(5));
        let ok = Timer::resolve_after::<_, String>(ms(10), 1);
        let err = Timer::reject_after::<u32, _>(ms(20), "E".to_string());

        Executor::run_for(ms(9));
        assert_eq!(s.outcome(), Some(Outcome::Fulfilled(())));
        assert!(ok.is_pending());

        Executor::run();
        assert_eq!(ok.outcome(), Some(Outcome::Fulfilled(1)));
        assert_eq!(err.outcome(), Some(Outcome::Rejected("E".to_string())));
    }
}
