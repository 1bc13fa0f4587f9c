use crate::utils::{Slab, SlabKey};

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

struct Continuation<E, S> {
    reject: Box<dyn FnOnce(E)>,
    resolve: Box<dyn FnOnce(S)>,
}

struct PromiseState<E, S> {
    /// `None` while pending.
    outcome: Option<Result<S, E>>,

    continuations: Slab<Continuation<E, S>>,

    /// Tasks polling the promise as a [`Future`].
    wakers: Vec<Waker>,
}

/// An eager, already-started computation with a single memoized outcome.
///
/// Unlike a [`Task`](crate::Task), a promise runs whether or not anyone
/// listens, settles once, and hands the same outcome to every continuation.
/// It is the interop type at the crate boundary: tasks convert to promises
/// with [`Task::to_promise`](crate::Task::to_promise) and promises are
/// accepted anywhere [`IntoTask`](crate::IntoTask) is.
///
/// A promise also implements [`Future`], so it can be awaited by any
/// executor.
pub struct Promise<E, S> {
    state: Rc<RefCell<PromiseState<E, S>>>,
}

/// The settling side of a [`Promise`]. The first call wins.
pub struct Resolver<E, S> {
    state: Rc<RefCell<PromiseState<E, S>>>,
}

impl<E: Clone + 'static, S: Clone + 'static> Promise<E, S> {
    /// Creates a pending promise and the resolver which settles it.
    pub fn new() -> (Self, Resolver<E, S>) {
        let state = Rc::new(RefCell::new(PromiseState {
            outcome: None,
            continuations: Slab::default(),
            wakers: Vec::new(),
        }));

        (
            Self {
                state: state.clone(),
            },
            Resolver { state },
        )
    }

    /// Runs `executor` right away with the resolver of a new promise.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use forked::Promise;
    ///
    /// let promise = Promise::<(), _>::with_executor(|resolver| resolver.resolve("ready"));
    ///
    /// assert_eq!(promise.outcome(), Some(Ok("ready")));
    /// ```
    pub fn with_executor(executor: impl FnOnce(Resolver<E, S>)) -> Self {
        let (promise, resolver) = Self::new();
        executor(resolver);
        promise
    }

    pub fn resolved(value: S) -> Self {
        Self::with_executor(|resolver| resolver.resolve(value))
    }

    pub fn rejected(error: E) -> Self {
        Self::with_executor(|resolver| resolver.reject(error))
    }

    /// Attaches a continuation.
    ///
    /// Runs synchronously when the promise has already settled, otherwise
    /// when it does.
    pub fn then(&self, on_reject: impl FnOnce(E) + 'static, on_resolve: impl FnOnce(S) + 'static) {
        self.subscribe(on_reject, on_resolve);
    }

    /// Attaches a continuation and returns its key while it is pending.
    ///
    /// Returns `None` when the continuation already ran.
    pub(crate) fn subscribe(
        &self,
        on_reject: impl FnOnce(E) + 'static,
        on_resolve: impl FnOnce(S) + 'static,
    ) -> Option<SlabKey> {
        let settled = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;

            match &state.outcome {
                Some(outcome) => outcome.clone(),
                None => {
                    return Some(state.continuations.insert(Continuation {
                        reject: Box::new(on_reject),
                        resolve: Box::new(on_resolve),
                    }));
                }
            }
        };

        match settled {
            Ok(value) => on_resolve(value),
            Err(error) => on_reject(error),
        }

        None
    }

    /// Detaches a pending continuation. Unknown keys are ignored.
    pub(crate) fn unsubscribe(&self, key: SlabKey) {
        self.state.borrow_mut().continuations.remove(key);
    }

    /// The outcome, once settled.
    pub fn outcome(&self) -> Option<Result<S, E>> {
        self.state.borrow().outcome.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.state.borrow().outcome.is_none()
    }
}

impl<E: Clone + 'static, S: Clone + 'static> Resolver<E, S> {
    pub fn resolve(&self, value: S) {
        self.settle(Ok(value));
    }

    pub fn reject(&self, error: E) {
        self.settle(Err(error));
    }

    /// Settles the promise with `outcome`. Ignored once settled.
    pub fn settle(&self, outcome: Result<S, E>) {
        let (continuations, wakers) = {
            let mut state = self.state.borrow_mut();

            if state.outcome.is_some() {
                tracing::trace!("promise already settled");
                return;
            }

            state.outcome = Some(outcome.clone());
            (state.continuations.drain(), std::mem::take(&mut state.wakers))
        };

        tracing::trace!(continuations = continuations.len(), "promise settled");

        for continuation in continuations {
            match outcome.clone() {
                Ok(value) => (continuation.resolve)(value),
                Err(error) => (continuation.reject)(error),
            }
        }

        for waker in wakers {
            waker.wake();
        }
    }
}

impl<E: Clone, S: Clone> Future for Promise<E, S> {
    type Output = Result<S, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.state.borrow_mut();

        if let Some(outcome) = &state.outcome {
            return Poll::Ready(outcome.clone());
        }

        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }

        Poll::Pending
    }
}

impl<E, S> Clone for Promise<E, S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<E, S> Clone for Resolver<E, S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<E, S> fmt::Debug for Promise<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Promise")
            .field("pending", &state.outcome.is_none())
            .field("continuations", &state.continuations.len())
            .finish()
    }
}

impl<E, S> fmt::Debug for Resolver<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}
