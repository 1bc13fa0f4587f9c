//! The fork contract.
//!
//! Starting a [`Task`](crate::Task) hands its computation a [`Settle`], the
//! pair of completion channels for that one run, and returns a
//! [`CancelHandle`] to the caller. Every combinator in the crate is written
//! against these two types.

mod cancel;
mod settle;

pub use cancel::CancelHandle;
pub use settle::Settle;
