use std::cell::Cell;
use std::cmp::Ordering;
use std::rc::Rc;
use std::time::Duration;

/// An entry in the timer queue.
///
/// `TimerEntry` represents a callback scheduled at a specific virtual
/// deadline. It is stored inside a binary heap ordered by deadline, with the
/// scheduling sequence breaking ties so that timers sharing a deadline fire
/// in the order they were set.
///
/// The entry may be cancelled before it fires.
pub(crate) struct TimerEntry {
    /// Virtual time at which the timer fires.
    pub(crate) deadline: Duration,

    /// Scheduling order, used as a tie-breaker.
    pub(crate) sequence: u64,

    /// Callback to run when the deadline is reached.
    pub(crate) callback: Box<dyn FnOnce()>,

    /// Cancellation flag shared with the [`TimerHandle`].
    pub(crate) cancelled: Rc<Cell<bool>>,
}

impl TimerEntry {
    fn key(&self) -> (Duration, u64) {
        (self.deadline, self.sequence)
    }
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key().eq(&other.key())
    }
}

impl Ord for TimerEntry {
    /// Reversed so that a `BinaryHeap<TimerEntry>` pops the earliest
    /// deadline first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Handle to a timer set with [`set_timeout`](crate::time::set_timeout).
#[derive(Clone, Debug)]
pub struct TimerHandle {
    pub(crate) cancelled: Rc<Cell<bool>>,
}

impl TimerHandle {
    /// Prevents the timer from firing. No-op if it already fired.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}
