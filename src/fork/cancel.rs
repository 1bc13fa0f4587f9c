use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

type Hook = Box<dyn FnOnce()>;

/// Handle returned by every fork.
///
/// Calling [`cancel`](Self::cancel) before the fork has settled suppresses
/// delivery of whichever channel the computation later tries to invoke, and
/// runs the cancellation hooks registered by the computation exactly once
/// (stopping timers, cancelling child forks, leaving subscriber registries).
///
/// Cancellation is cooperative: side effects the computation has already
/// triggered are not undone. Calling `cancel` after the fork has settled, or
/// calling it twice, has no observable effect on delivery.
///
/// Handles are cheap to clone. All clones observe the same state.
#[derive(Clone)]
pub struct CancelHandle {
    /// `None` for inert handles.
    inner: Option<Rc<CancelState>>,
}

struct CancelState {
    cancelled: Cell<bool>,
    hooks: RefCell<Vec<Hook>>,
}

impl CancelHandle {
    /// Creates a live handle that has not been cancelled.
    pub fn new() -> Self {
        Self {
            inner: Some(Rc::new(CancelState {
                cancelled: Cell::new(false),
                hooks: RefCell::new(Vec::new()),
            })),
        }
    }

    /// Returns an inert handle. Cancelling it does nothing.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    /// Creates a live handle which runs `hook` when cancelled.
    pub fn from_fn(hook: impl FnOnce() + 'static) -> Self {
        let handle = Self::new();
        handle.on_cancel(hook);
        handle
    }

    /// Cancels the fork this handle belongs to.
    pub fn cancel(&self) {
        let Some(state) = &self.inner else {
            return;
        };

        if state.cancelled.replace(true) {
            return;
        }

        // Hooks may register further hooks on this handle; those run
        // immediately because the flag is already set.
        let hooks = std::mem::take(&mut *state.hooks.borrow_mut());

        tracing::trace!(hooks = hooks.len(), "cancelling fork");

        for hook in hooks {
            hook();
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|state| state.cancelled.get())
    }

    /// Returns `true` for handles created with [`noop`](Self::noop).
    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }

    /// Registers `hook` to run on cancellation.
    ///
    /// Runs `hook` right away if the handle is already cancelled. Hooks
    /// registered on an inert handle are dropped.
    pub fn on_cancel(&self, hook: impl FnOnce() + 'static) {
        let Some(state) = &self.inner else {
            return;
        };

        if state.cancelled.get() {
            hook();
            return;
        }

        state.hooks.borrow_mut().push(Box::new(hook));
    }

    /// Forwards cancellation of this handle to `child`.
    pub fn link(&self, child: CancelHandle) {
        if child.is_noop() {
            return;
        }

        self.on_cancel(move || child.cancel());
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("noop", &self.is_noop())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
