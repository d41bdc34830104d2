use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

/// Handle to a scheduled timer, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

struct Entry<T> {
    obj: T,
    period: Option<Duration>,
}

/// A timer that came due, removed from the queue.
pub(super) struct Expired<T> {
    pub token: TimerToken,
    pub obj: T,
    pub period: Option<Duration>,
}

/// Virtual clock and timer queue.
///
/// Time only moves when a timer expires or when the clock is advanced
/// explicitly. Timers are ordered by deadline, then by the order in which they
/// were scheduled.
pub(super) struct VirtualClock<T> {
    now: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, u64), Entry<T>>,
    live: HashMap<u64, Duration>,
}

impl<T> VirtualClock<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            queue: BTreeMap::new(),
            live: HashMap::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn schedule(&mut self, delay: Duration, period: Option<Duration>, obj: T) -> TimerToken {
        let id = self.next_id;
        self.next_id += 1;

        let deadline = self.now + delay;
        self.queue.insert((deadline, id), Entry { obj, period });
        self.live.insert(id, deadline);

        TimerToken(id)
    }

    /// Returns `false` if the timer already fired (one-shot) or was cancelled
    /// before.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        match self.live.remove(&token.0) {
            Some(deadline) => {
                // A repeating timer whose callback is running right now is in
                // `live` but not in `queue`.
                self.queue.remove(&(deadline, token.0));
                true
            }
            None => false,
        }
    }

    /// Remove the earliest timer, provided it is due no later than `limit`,
    /// and move the clock forward to its deadline.
    pub fn expire(&mut self, limit: Option<Duration>) -> Option<Expired<T>> {
        let (&(deadline, id), _) = self.queue.first_key_value()?;

        if limit.is_some_and(|limit| deadline > limit) {
            return None;
        }

        let entry = self.queue.remove(&(deadline, id))?;
        self.advance_to(deadline);

        if entry.period.is_none() {
            self.live.remove(&id);
        }

        Some(Expired {
            token: TimerToken(id),
            obj: entry.obj,
            period: entry.period,
        })
    }

    /// Put a repeating timer back in the queue one period from now. Does
    /// nothing if it was cancelled while its callback ran.
    pub fn rearm(&mut self, token: TimerToken, period: Duration, obj: T) -> bool {
        if !self.live.contains_key(&token.0) {
            return false;
        }

        let deadline = self.now + period;
        self.live.insert(token.0, deadline);
        self.queue.insert(
            (deadline, token.0),
            Entry {
                obj,
                period: Some(period),
            },
        );

        true
    }

    pub fn advance_to(&mut self, t: Duration) {
        if t > self.now {
            self.now = t;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::VirtualClock;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn drain(clock: &mut VirtualClock<u32>) -> Vec<(u32, Duration)> {
        let mut fired = Vec::new();
        while let Some(e) = clock.expire(None) {
            fired.push((e.obj, clock.now()));
        }
        fired
    }

    #[test]
    fn expires_in_deadline_order() {
        let mut clock = VirtualClock::new();
        clock.schedule(ms(500), None, 1);
        clock.schedule(ms(100), None, 2);
        clock.schedule(ms(300), None, 3);

        assert_eq!(
            drain(&mut clock),
            vec![(2, ms(100)), (3, ms(300)), (1, ms(500))]
        );
        assert!(clock.is_empty());
    }

    #[test]
    fn ties_fire_in_scheduling_order() {
        let mut clock = VirtualClock::new();
        clock.schedule(ms(10), None, 1);
        clock.schedule(ms(10), None, 2);
        clock.schedule(ms(10), None, 3);

        let order: Vec<u32> = drain(&mut clock).into_iter().map(|(x, _)| x).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn cancel() {
        let mut clock = VirtualClock::new();
        let a = clock.schedule(ms(10), None, 1);
        clock.schedule(ms(20), None, 2);

        assert!(clock.cancel(a));
        assert!(!clock.cancel(a));
        assert_eq!(drain(&mut clock), vec![(2, ms(20))]);
    }

    #[test]
    fn cancel_after_fire_is_noop() {
        let mut clock = VirtualClock::new();
        let a = clock.schedule(ms(10), None, 1);
        assert!(clock.expire(None).is_some());
        assert!(!clock.cancel(a));
    }

    #[test]
    fn limit_holds_back_later_timers() {
        let mut clock = VirtualClock::new();
        clock.schedule(ms(100), None, 1);
        clock.schedule(ms(500), None, 2);

        assert_eq!(clock.expire(Some(ms(200))).map(|e| e.obj), Some(1));
        assert!(clock.expire(Some(ms(200))).is_none());
        assert_eq!(clock.now(), ms(100));
    }

    #[test]
    fn delays_are_relative_to_now() {
        let mut clock = VirtualClock::new();
        clock.advance_to(ms(1000));
        clock.schedule(ms(5), None, 7);

        assert_eq!(drain(&mut clock), vec![(7, ms(1005))]);
    }

    #[test]
    fn rearm_repeating_timer() {
        let mut clock = VirtualClock::new();
        clock.schedule(ms(10), Some(ms(10)), 1);

        let e = clock.expire(None).unwrap();
        assert_eq!(clock.now(), ms(10));
        assert!(clock.rearm(e.token, ms(10), e.obj));

        let e = clock.expire(None).unwrap();
        assert_eq!(clock.now(), ms(20));

        // Cancelled while "running": must not come back.
        assert!(clock.cancel(e.token));
        assert!(!clock.rearm(e.token, ms(10), e.obj));
        assert!(clock.is_empty());
    }
}
