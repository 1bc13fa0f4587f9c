//! Eager promises and their conversions to and from tasks.

mod eager;
mod interop;

pub use eager::{Promise, Resolver};
pub use interop::MaybePromise;
