//! The [`Task`] type and its unary combinators.
//!
//! - `core`: the task itself, forking and pre-use cancellation.
//! - `construct`: constructors (`succeed`, `fail`, delayed variants,
//!   promise adapters).
//! - `transform`: combinators over a single task.
//!
//! Combinators over several tasks live in [`combinators`](crate::combinators).

mod construct;
mod core;
mod transform;

pub use self::core::{IntoTask, Task, TaskOrPromise};
