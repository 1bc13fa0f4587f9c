use super::cancel::CancelHandle;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

struct Channels<E, S> {
    reject: Box<dyn FnOnce(E)>,
    resolve: Box<dyn FnOnce(S)>,
}

struct SettleState<E, S> {
    /// Taken by the first delivery. `None` once the fork has settled.
    channels: RefCell<Option<Channels<E, S>>>,

    /// Cancellation token of the fork.
    token: CancelHandle,
}

/// The two completion channels of a single fork.
///
/// A computation receives one `Settle` per fork. It fails the fork with
/// [`reject`](Self::reject) or completes it with [`resolve`](Self::resolve).
/// Only the first call delivers; every later call, on either channel, is
/// ignored. Nothing is delivered once the fork's [`CancelHandle`] has been
/// cancelled.
///
/// `Settle` is cheap to clone so that the channels can be moved into timer
/// callbacks and child forks. Every clone shares the same state.
pub struct Settle<E, S> {
    inner: Rc<SettleState<E, S>>,
}

impl<E: 'static, S: 'static> Settle<E, S> {
    pub(crate) fn new(
        reject: impl FnOnce(E) + 'static,
        resolve: impl FnOnce(S) + 'static,
        token: CancelHandle,
    ) -> Self {
        Self {
            inner: Rc::new(SettleState {
                channels: RefCell::new(Some(Channels {
                    reject: Box::new(reject),
                    resolve: Box::new(resolve),
                })),
                token,
            }),
        }
    }

    /// Fails the fork with `error`.
    pub fn reject(&self, error: E) {
        if let Some(channels) = self.take("reject") {
            (channels.reject)(error);
        }
    }

    /// Completes the fork with `value`.
    pub fn resolve(&self, value: S) {
        if let Some(channels) = self.take("resolve") {
            (channels.resolve)(value);
        }
    }

    /// Delivers a `Result` on the matching channel.
    pub fn complete(&self, result: Result<S, E>) {
        match result {
            Ok(value) => self.resolve(value),
            Err(error) => self.reject(error),
        }
    }

    fn take(&self, channel: &'static str) -> Option<Channels<E, S>> {
        if self.inner.token.is_cancelled() {
            tracing::trace!(channel, "delivery suppressed, fork was cancelled");
            return None;
        }

        let channels = self.inner.channels.borrow_mut().take();

        if channels.is_none() {
            tracing::trace!(channel, "delivery ignored, fork already settled");
        }

        channels
    }

    /// Returns a callback which rejects this fork.
    pub fn rejecter(&self) -> impl FnOnce(E) + 'static {
        let settle = self.clone();
        move |error| settle.reject(error)
    }

    /// Returns a callback which resolves this fork.
    pub fn resolver(&self) -> impl FnOnce(S) + 'static {
        let settle = self.clone();
        move |value| settle.resolve(value)
    }
}

impl<E, S> Settle<E, S> {
    /// Returns `true` once either channel has delivered.
    pub fn is_settled(&self) -> bool {
        self.inner.channels.borrow().is_none()
    }

    /// Returns `true` once the fork has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Returns `true` while a delivery would still reach the caller.
    pub fn is_live(&self) -> bool {
        !self.is_settled() && !self.is_cancelled()
    }

    /// The cancellation token of this fork.
    pub fn token(&self) -> &CancelHandle {
        &self.inner.token
    }

    /// Forwards cancellation of this fork to `child`.
    ///
    /// Used for children forked after the computation has returned, such as
    /// the second half of a chain.
    pub fn link(&self, child: CancelHandle) {
        self.inner.token.link(child);
    }

    /// Registers `hook` to run if this fork is cancelled.
    pub fn on_cancel(&self, hook: impl FnOnce() + 'static) {
        self.inner.token.on_cancel(hook);
    }
}

impl<E, S> Clone for Settle<E, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E, S> fmt::Debug for Settle<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settle")
            .field("settled", &self.is_settled())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
