//! Job queue and task execution.
//!
//! Every OS thread has its own [Executor]. It owns the deferred-callback
//! queue on which promise observers run, and any `async` tasks spawned on that
//! thread. This means that:
//!
//! 1. Observers and tasks always run on the thread that queued them.
//! 2. Nothing happens until the thread calls [Executor::run],
//!    [Executor::run_for] or [Executor::block_on].
//!
//! Wakers handed to tasks are only honoured on the thread that spawned the
//! task. A wake from any other thread is logged and dropped; the task stays
//! parked until something on its own thread wakes it.
//!
//! The queue is strictly first-in, first-out. When it is empty the executor
//! fires the next timer from the virtual clock (see
//! [Timer](crate::futures::timer::Timer)), which usually queues more work, and
//! carries on. The queue is always drained completely before the next timer
//! fires.
//!
//! # Example
//!
//! ```
//! use pledge::task::Executor;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! {
//!     let log = log.clone();
//!     Executor::defer(move || log.borrow_mut().push("deferred"));
//! }
//! log.borrow_mut().push("inline");
//! Executor::run();
//! assert_eq!(*log.borrow(), vec!["inline", "deferred"]);
//! ```
//!
//! Futures can be driven to completion from a synchronous context, and
//! promises can be `.await`ed inside them:
//!
//! ```
//! use pledge::futures::promise::Promise;
//! use pledge::task::Executor;
//!
//! let p = Promise::<u32, String>::fulfilled(8);
//! let x = Executor::block_on(async move { p.await.map(|v| v + 2) });
//! assert_eq!(x, Ok(Ok(10)));
//! ```
use std::{
    cell::RefCell,
    collections::VecDeque,
    future::Future,
    pin::Pin,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    task::{Context, Poll, Wake, Waker},
    thread::{self, ThreadId},
    time::Duration,
};

use log::{trace, warn};
use slab::Slab;

use crate::{
    error::Error,
    futures::promise::{Promise, Resolver},
    reactor::Reactor,
};

/// Slot value of a task that is not parked in the waiting set.
const NOT_WAITING: usize = usize::MAX;

struct TaskId {
    slot: AtomicUsize,
    woken: AtomicBool,
    owner: ThreadId,
}

impl Wake for TaskId {
    fn wake(self: Arc<TaskId>) {
        // The slot indexes the owning thread's waiting set only.
        if thread::current().id() != self.owner {
            warn!("ignoring wake of a task owned by {:?}", self.owner);
            return;
        }

        let slot = self.slot.swap(NOT_WAITING, Ordering::Relaxed);

        if slot == NOT_WAITING {
            // Queued or being polled right now; make sure it gets another
            // poll once this one returns.
            self.woken.store(true, Ordering::Relaxed);
            return;
        }

        EXEC.with(|exec| {
            let mut exec = exec.borrow_mut();
            if let Some(task) = exec.waiting.try_remove(slot) {
                exec.run_q.push_back(Job::Poll(task));
            }
        });
    }
}

struct Task {
    id: Arc<TaskId>,
    future: Pin<Box<dyn Future<Output = ()>>>,
}

enum Job {
    Callback(Box<dyn FnOnce()>),
    Poll(Task),
}

/// The per-thread executor.
///
/// All functions are associated functions acting on the calling thread's
/// executor; there is no value to construct.
pub struct Executor {
    waiting: Slab<Task>,
    run_q: VecDeque<Job>,
}

thread_local! {
    static EXEC: RefCell<Executor> = const { RefCell::new(
        Executor {
            waiting: Slab::new(),
            run_q: VecDeque::new(),
        }
    )}
}

impl Executor {
    /// Queue `f` to run on a later turn of this thread's job queue, after
    /// everything already queued.
    pub fn defer(f: impl FnOnce() + 'static) {
        Self::push(Job::Callback(Box::new(f)));
    }

    /// Spawn a task running `f` on this thread and expose its result as a
    /// promise.
    ///
    /// The task does not start until the executor runs.
    pub fn spawn<Fut, T, E>(f: Fut) -> Promise<T, E>
    where
        Fut: Future<Output = Result<T, E>> + 'static,
        T: Clone + 'static,
        E: Clone + 'static,
    {
        let (promise, resolver): (Promise<T, E>, Resolver<T, E>) = Promise::deferred();

        Self::spawn_task(async move { resolver.settle(f.await) });

        promise
    }

    /// Drive `f` to completion from a synchronous context.
    ///
    /// Runs this thread's executor (including every other queued job, task and
    /// timer) until there is nothing left to do. Returns [Error::Stalled] if
    /// `f` was still pending at that point: nothing could ever wake it.
    pub fn block_on<Fut, T>(f: Fut) -> Result<T, Error>
    where
        Fut: Future<Output = T> + 'static,
        T: 'static,
    {
        let slot = Rc::new(RefCell::new(None));

        {
            let slot = slot.clone();
            Self::spawn_task(async move {
                let value = f.await;
                *slot.borrow_mut() = Some(value);
            });
        }

        Self::executor_loop(None);

        let value = slot.borrow_mut().take();
        value.ok_or(Error::Stalled)
    }

    /// Run the executor for this thread.
    ///
    /// Drains the job queue, firing timers whenever it runs dry, and returns
    /// once neither jobs nor timers are left. Tasks waiting on something that
    /// never happens are left parked. *Note* a repeating timer that is never
    /// cancelled keeps this from returning; use [Executor::run_for] instead.
    pub fn run() {
        Self::executor_loop(None)
    }

    /// Like [Executor::run], but only fires timers due within `d` of the
    /// current virtual time. The clock ends exactly `d` later, whether or not
    /// a timer was due then.
    pub fn run_for(d: Duration) {
        let limit = Reactor::now() + d;
        Self::executor_loop(Some(limit));
        Reactor::advance_to(limit);
    }

    fn push(job: Job) {
        EXEC.with(|exec| exec.borrow_mut().run_q.push_back(job));
    }

    fn spawn_task(f: impl Future<Output = ()> + 'static) {
        let task = Task {
            id: Arc::new(TaskId {
                slot: AtomicUsize::new(NOT_WAITING),
                woken: AtomicBool::new(false),
                owner: thread::current().id(),
            }),
            future: Box::pin(f),
        };

        Self::push(Job::Poll(task));
    }

    fn executor_loop(limit: Option<Duration>) {
        EXEC.with(|exec| loop {
            let job = exec.borrow_mut().run_q.pop_front();

            let Some(job) = job else {
                if Reactor::react(limit) {
                    continue;
                }

                trace!(
                    "executor idle, {} task(s) parked, timers left: {}",
                    exec.borrow().waiting.len(),
                    Reactor::has_timers()
                );
                return;
            };

            match job {
                Job::Callback(f) => f(),
                Job::Poll(mut task) => {
                    task.id.woken.store(false, Ordering::Relaxed);

                    let waker = Waker::from(task.id.clone());
                    let mut cx = Context::from_waker(&waker);

                    if let Poll::Pending = task.future.as_mut().poll(&mut cx) {
                        if task.id.woken.swap(false, Ordering::Relaxed) {
                            exec.borrow_mut().run_q.push_back(Job::Poll(task));
                            continue;
                        }

                        let waiting = &mut exec.borrow_mut().waiting;
                        let slot = waiting.vacant_entry();
                        task.id.slot.store(slot.key(), Ordering::Relaxed);
                        slot.insert(task);
                    }
                }
            }
        });
    }
}
