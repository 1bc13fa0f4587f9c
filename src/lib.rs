//! Lazy, cancellable two-channel tasks.
//!
//! A [`Task<E, S>`](Task) describes a computation that fails with `E` or
//! succeeds with `S`. It runs only when forked, delivers at most one
//! outcome per fork, and returns a [`CancelHandle`] that suppresses that
//! outcome. Combinators build new tasks out of existing ones without
//! running them.
//!
//! ```rust
//! use forked::{all, time, Task};
//! use std::time::Duration;
//!
//! let both = all([
//!     Task::<&str, _>::succeed_in(Duration::from_millis(200), "a"),
//!     Task::succeed_in(Duration::from_millis(100), "b"),
//! ]);
//!
//! both.fork(|e| panic!("{e}"), |values| assert_eq!(values, ["a", "b"]));
//! time::run_all();
//! ```

mod error;
mod external;
mod task;
mod utils;

pub mod combinators;
pub mod fork;
pub mod promise;
pub mod time;

pub use combinators::{
    all, all_successes, ap, first_success, from_promises, iterate, map2, map3, map4, race, reduce, sequence, try_sequence,
    zip, zip_with, Backoff, Fallback, Step,
};
pub use error::TryError;
pub use external::{emitter, external, ExternalTask};
pub use fork::{CancelHandle, Settle};
pub use promise::{MaybePromise, Promise, Resolver};
pub use task::{IntoTask, Task, TaskOrPromise};
