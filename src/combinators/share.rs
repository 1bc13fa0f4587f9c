use crate::fork::{CancelHandle, Settle};
use crate::task::Task;
use crate::utils::{Slab, SlabKey};

use std::cell::RefCell;
use std::rc::{Rc, Weak};

enum Shared<E, S> {
    /// Nobody has forked yet.
    Initialized,
    /// The underlying computation is running.
    Pending,
    Succeeded(S),
    Failed(E),
}

struct ShareState<E, S> {
    status: Shared<E, S>,

    /// Forks waiting for the underlying computation.
    subscribers: Slab<Settle<E, S>>,
}

enum Subscription<E, S> {
    Resolve(S),
    Reject(E),
    Wait(SlabKey),
    Start(SlabKey),
}

impl<E: Clone + 'static, S: Clone + 'static> Task<E, S> {
    /// Runs the underlying computation at most once, however many times the
    /// result is forked.
    ///
    /// The first fork starts it. Forks made while it runs wait for its
    /// outcome; forks made afterwards receive the memoized outcome
    /// synchronously. Cancelling a fork only unsubscribes it: the shared
    /// computation keeps running for the others.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use forked::Task;
    /// use std::cell::Cell;
    /// use std::rc::Rc;
    ///
    /// let runs = Rc::new(Cell::new(0));
    /// let counted = runs.clone();
    /// let config = Task::<(), _>::succeed_by(move || {
    ///     counted.set(counted.get() + 1);
    ///     Ok("loaded")
    /// })
    /// .only_once();
    ///
    /// config.fork(|_| {}, |_| {});
    /// config.fork(|_| {}, |_| {});
    ///
    /// assert_eq!(runs.get(), 1);
    /// ```
    pub fn only_once(&self) -> Task<E, S> {
        let task = self.clone();
        let state = Rc::new(RefCell::new(ShareState {
            status: Shared::<E, S>::Initialized,
            subscribers: Slab::default(),
        }));

        Task::new(move |settle: Settle<E, S>| {
            let subscription = {
                let mut guard = state.borrow_mut();
                let shared = &mut *guard;

                match shared.status {
                    Shared::Succeeded(ref value) => Subscription::Resolve(value.clone()),
                    Shared::Failed(ref error) => Subscription::Reject(error.clone()),
                    Shared::Pending => Subscription::Wait(shared.subscribers.insert(settle.clone())),
                    Shared::Initialized => {
                        shared.status = Shared::Pending;
                        Subscription::Start(shared.subscribers.insert(settle.clone()))
                    }
                }
            };

            match subscription {
                Subscription::Resolve(value) => {
                    settle.resolve(value);
                    CancelHandle::noop()
                }
                Subscription::Reject(error) => {
                    settle.reject(error);
                    CancelHandle::noop()
                }
                Subscription::Wait(key) => unsubscribe(Rc::downgrade(&state), key),
                Subscription::Start(key) => {
                    tracing::debug!("starting shared computation");
                    task.fork(settled(&state, Shared::Failed), settled(&state, Shared::Succeeded));
                    unsubscribe(Rc::downgrade(&state), key)
                }
            }
        })
    }

    /// Alias of [`only_once`](Self::only_once).
    pub fn share(&self) -> Task<E, S> {
        self.only_once()
    }
}

/// Records the outcome and delivers it to every waiting fork.
fn settled<E, S, T>(state: &Rc<RefCell<ShareState<E, S>>>, wrap: fn(T) -> Shared<E, S>) -> impl FnOnce(T) + 'static
where
    E: Clone + 'static,
    S: Clone + 'static,
    T: 'static,
{
    let state = state.clone();

    move |outcome| {
        let (status, subscribers) = {
            let mut state = state.borrow_mut();
            state.status = wrap(outcome);

            let status = match &state.status {
                Shared::Succeeded(value) => Ok(value.clone()),
                Shared::Failed(error) => Err(error.clone()),
                Shared::Initialized | Shared::Pending => return,
            };

            (status, state.subscribers.drain())
        };

        tracing::debug!(
            subscribers = subscribers.len(),
            succeeded = status.is_ok(),
            "shared computation settled"
        );

        for subscriber in subscribers {
            subscriber.complete(status.clone());
        }
    }
}

fn unsubscribe<E: 'static, S: 'static>(state: Weak<RefCell<ShareState<E, S>>>, key: SlabKey) -> CancelHandle {
    CancelHandle::from_fn(move || {
        if let Some(state) = state.upgrade() {
            state.borrow_mut().subscribers.remove(key);
        }
    })
}
