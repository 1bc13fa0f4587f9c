//! Combinators over several tasks.
//!
//! - `parallel`: concurrent composition (`all`, `race`, `map2`, ...).
//! - `sequential`: one task after another (`iterate`, `reduce`,
//!   `sequence`, `try_sequence`).
//! - `share`: memoizing a task across forks.
//! - `retry`: delays and retry schedules.
//!
//! Every combinator accepts anything implementing
//! [`IntoTask`](crate::IntoTask) where it takes a task.

mod parallel;
mod retry;
mod sequential;
mod share;

pub use parallel::{all, all_successes, ap, first_success, from_promises, map2, map3, map4, race, zip, zip_with};
pub use retry::Backoff;
pub use sequential::{iterate, reduce, sequence, try_sequence, Fallback, Step};
