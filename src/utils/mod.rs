//! Internal data structures.
//!
//! This module exposes the [`Slab`] registry used by the sharing cache,
//! external tasks and promises to keep their waiting subscribers.

mod slab;

pub(crate) use slab::{Slab, SlabKey};
