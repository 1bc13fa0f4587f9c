use super::timer::{TimerEntry, TimerHandle};

use std::cell::{Cell, RefCell};
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::Duration;

thread_local! {
    /// Timer queue of the current thread.
    ///
    /// Delayed tasks register here without a handle being threaded through
    /// every combinator. Each thread owns an independent queue and an
    /// independent virtual clock starting at zero.
    pub(crate) static CURRENT_TIMERS: RefCell<TimerQueue> = RefCell::new(TimerQueue::new());
}

/// Deadline-ordered queue of pending callbacks on a virtual clock.
pub(crate) struct TimerQueue {
    /// Virtual time elapsed since the queue was created.
    now: Duration,
    next_sequence: u64,
    timers: BinaryHeap<TimerEntry>,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_sequence: 0,
            timers: BinaryHeap::new(),
        }
    }

    pub(crate) fn now(&self) -> Duration {
        self.now
    }

    pub(crate) fn schedule(&mut self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerHandle {
        let cancelled = Rc::new(Cell::new(false));
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.timers.push(TimerEntry {
            deadline: self.now.saturating_add(delay),
            sequence,
            callback,
            cancelled: cancelled.clone(),
        });

        TimerHandle { cancelled }
    }

    /// Drops cancelled entries sitting at the top of the heap.
    fn prune(&mut self) {
        while self.timers.peek().is_some_and(|t| t.cancelled.get()) {
            self.timers.pop();
        }
    }

    /// Deadline of the next live timer.
    pub(crate) fn next_deadline(&mut self) -> Option<Duration> {
        self.prune();
        self.timers.peek().map(|t| t.deadline)
    }

    /// Pops the next live timer due at or before `limit` and moves the clock
    /// to its deadline.
    pub(crate) fn pop_due(&mut self, limit: Duration) -> Option<TimerEntry> {
        self.prune();

        if self.timers.peek()?.deadline > limit {
            return None;
        }

        let timer = self.timers.pop()?;
        self.now = self.now.max(timer.deadline);

        Some(timer)
    }

    /// Moves the clock forward without firing anything.
    pub(crate) fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    /// Number of live timers.
    pub(crate) fn pending(&self) -> usize {
        self.timers.iter().filter(|t| !t.cancelled.get()).count()
    }
}
