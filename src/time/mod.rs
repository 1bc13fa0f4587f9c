//! Virtual time.
//!
//! Delayed tasks ([`Task::succeed_in`](crate::Task::succeed_in),
//! [`Task::wait`](crate::Task::wait), retries) schedule their callbacks on a
//! thread-local timer queue. Nothing fires on its own: the host advances the
//! clock explicitly with [`advance`], [`advance_to_next`] or [`run_all`], or
//! lets [`drive_realtime`] sleep the thread between deadlines.
//!
//! Callbacks run on the calling thread, inside the advancing call. Timers
//! sharing a deadline fire in the order they were set.
//!
//! # Examples
//!
//! ```rust
//! use forked::{time, Task};
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let seen = Rc::new(Cell::new(None));
//! let out = seen.clone();
//!
//! Task::<(), _>::succeed_in(Duration::from_millis(100), 7)
//!     .fork(|_| {}, move |v| out.set(Some(v)));
//!
//! time::advance(Duration::from_millis(99));
//! assert_eq!(seen.get(), None);
//!
//! time::advance(Duration::from_millis(1));
//! assert_eq!(seen.get(), Some(7));
//! ```

mod queue;
mod timer;

use queue::CURRENT_TIMERS;

pub use timer::TimerHandle;

use std::time::Duration;

/// Upper bound on the number of timers [`run_all`] fires before giving up.
///
/// Guards against tasks that keep rescheduling themselves forever.
pub const MAX_RUN_ALL_ITERATIONS: usize = 100_000;

/// Schedules `callback` to run once `delay` of virtual time has elapsed.
pub fn set_timeout(delay: Duration, callback: impl FnOnce() + 'static) -> TimerHandle {
    CURRENT_TIMERS.with(|timers| timers.borrow_mut().schedule(delay, Box::new(callback)))
}

/// Current virtual time of this thread's queue.
pub fn now() -> Duration {
    CURRENT_TIMERS.with(|timers| timers.borrow().now())
}

/// Number of timers that are scheduled and not cancelled.
pub fn pending() -> usize {
    CURRENT_TIMERS.with(|timers| timers.borrow().pending())
}

/// Fires the next timer due at or before `limit`, if any.
///
/// The queue borrow is released before the callback runs so callbacks can
/// schedule further timers.
fn fire_next(limit: Duration) -> bool {
    let Some(timer) = CURRENT_TIMERS.with(|timers| timers.borrow_mut().pop_due(limit)) else {
        return false;
    };

    tracing::trace!(deadline = ?timer.deadline, "timer fired");
    (timer.callback)();

    true
}

/// Advances the clock by `by`, firing every timer that falls due.
///
/// Timers scheduled by callbacks during the advance fire too when their
/// deadline lies inside the window. Returns the number of timers fired.
pub fn advance(by: Duration) -> usize {
    let target = now().saturating_add(by);
    let mut fired = 0;

    while fire_next(target) {
        fired += 1;
    }

    CURRENT_TIMERS.with(|timers| timers.borrow_mut().set_now(target));

    fired
}

/// Jumps to the next deadline and fires the timers due at that instant.
///
/// Returns `false` when no timer is pending.
pub fn advance_to_next() -> bool {
    let Some(deadline) = CURRENT_TIMERS.with(|timers| timers.borrow_mut().next_deadline()) else {
        return false;
    };

    while fire_next(deadline) {}

    true
}

/// Fires timers until the queue is empty.
///
/// Stops after [`MAX_RUN_ALL_ITERATIONS`] timers. Returns the number fired.
pub fn run_all() -> usize {
    let mut fired = 0;

    while fired < MAX_RUN_ALL_ITERATIONS {
        if !fire_next(Duration::MAX) {
            return fired;
        }
        fired += 1;
    }

    tracing::warn!(
        limit = MAX_RUN_ALL_ITERATIONS,
        pending = pending(),
        "run_all stopped at its iteration limit; timers keep rescheduling"
    );

    fired
}

/// Fires timers in deadline order, sleeping the thread for the real delay
/// before each one.
///
/// Returns once the queue is empty.
pub fn drive_realtime() -> usize {
    let mut fired = 0;

    while let Some(deadline) = CURRENT_TIMERS.with(|timers| timers.borrow_mut().next_deadline()) {
        let wait = deadline.saturating_sub(now());

        if !wait.is_zero() {
            std::thread::sleep(wait);
        }

        fired += advance(wait);
    }

    fired
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    fn log() -> Rc<RefCell<Vec<&'static str>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn push(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> impl FnOnce() + 'static {
        let log = log.clone();
        move || log.borrow_mut().push(name)
    }

    #[test]
    fn fires_in_deadline_order() {
        let fired = log();
        set_timeout(Duration::from_millis(200), push(&fired, "late"));
        set_timeout(Duration::from_millis(100), push(&fired, "early"));

        assert_eq!(advance(Duration::from_millis(250)), 2);
        assert_eq!(*fired.borrow(), vec!["early", "late"]);
        assert_eq!(now(), Duration::from_millis(250));
    }

    #[test]
    fn equal_deadlines_fire_in_scheduling_order() {
        let fired = log();
        set_timeout(Duration::from_millis(10), push(&fired, "a"));
        set_timeout(Duration::from_millis(10), push(&fired, "b"));

        assert!(advance_to_next());
        assert_eq!(*fired.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn nested_timers_inside_window_fire() {
        let fired = log();
        let inner = push(&fired, "inner");
        set_timeout(Duration::from_millis(10), move || {
            set_timeout(Duration::from_millis(10), inner);
        });

        advance(Duration::from_millis(20));
        assert_eq!(*fired.borrow(), vec!["inner"]);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let fired = log();
        let handle = set_timeout(Duration::from_millis(5), push(&fired, "cancelled"));
        handle.cancel();

        assert_eq!(pending(), 0);
        assert_eq!(run_all(), 0);
        assert!(fired.borrow().is_empty());
    }

    #[test]
    fn drive_realtime_sleeps_until_each_deadline() {
        let fired = log();
        let start = now();
        set_timeout(Duration::from_millis(2), push(&fired, "second"));
        set_timeout(Duration::from_millis(1), push(&fired, "first"));

        let wall = std::time::Instant::now();

        assert_eq!(drive_realtime(), 2);
        assert!(wall.elapsed() >= Duration::from_millis(2));
        assert_eq!(*fired.borrow(), vec!["first", "second"]);
        assert_eq!(now() - start, Duration::from_millis(2));
    }

    #[test]
    fn advance_stops_at_window_edge() {
        let fired = log();
        set_timeout(Duration::from_millis(100), push(&fired, "edge"));

        advance(Duration::from_millis(99));
        assert!(fired.borrow().is_empty());

        advance(Duration::from_millis(1));
        assert_eq!(*fired.borrow(), vec!["edge"]);
    }
}
