#![allow(dead_code)]

use forked::{CancelHandle, Task};

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call<E, S> {
    Rejected(E),
    Resolved(S),
}

/// Records every callback a fork invokes.
pub struct Spy<E, S> {
    calls: Rc<RefCell<Vec<Call<E, S>>>>,
}

impl<E: Clone + Debug + PartialEq + 'static, S: Clone + Debug + PartialEq + 'static> Spy<E, S> {
    pub fn new() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Forks `task` with callbacks recording into this spy.
    pub fn fork(&self, task: &Task<E, S>) -> CancelHandle {
        let (rejected, resolved) = (self.calls.clone(), self.calls.clone());

        task.fork(
            move |e| rejected.borrow_mut().push(Call::Rejected(e)),
            move |v| resolved.borrow_mut().push(Call::Resolved(v)),
        )
    }

    pub fn calls(&self) -> Vec<Call<E, S>> {
        self.calls.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn assert_pending(&self) {
        assert!(self.calls.borrow().is_empty(), "expected no callback, got {:?}", self.calls());
    }

    pub fn assert_resolved(&self, value: S) {
        assert_eq!(self.calls(), vec![Call::Resolved(value)], "expected exactly one resolve");
    }

    pub fn assert_rejected(&self, error: E) {
        assert_eq!(self.calls(), vec![Call::Rejected(error)], "expected exactly one reject");
    }
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Counts how many times a closure ran.
#[derive(Clone, Default)]
pub struct Counter(Rc<RefCell<usize>>);

impl Counter {
    pub fn bump(&self) -> usize {
        let mut count = self.0.borrow_mut();
        *count += 1;
        *count
    }

    pub fn get(&self) -> usize {
        *self.0.borrow()
    }
}
