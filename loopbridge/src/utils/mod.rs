//! Internal data structures.
//!
//! The [`Slab`] provides the index-stable storage behind watch tokens and
//! hook identifiers in the event loop.

mod slab;

pub(crate) use slab::Slab;
