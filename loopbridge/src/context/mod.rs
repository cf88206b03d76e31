//! The inner event loop.
//!
//! An inner loop is a loop that cannot be handed to a poller directly: it
//! has to be asked, every iteration, which descriptors it cares about and
//! how long it may wait. [`InnerLoop`] is that contract, split into the
//! four phases of one iteration (prepare, query, check, dispatch).
//!
//! [`MainContext`] is a self-contained implementation with descriptor,
//! timeout and idle sources.

mod main_context;
mod timer;

pub use main_context::{MainContext, SourceId};

use bitflags::bitflags;
use std::os::fd::RawFd;
use std::time::Duration;

/// Use for urgent sources.
pub const PRIORITY_HIGH: i32 = -100;

/// Default priority for descriptor and timeout sources.
pub const PRIORITY_DEFAULT: i32 = 0;

/// Idle work that should still run ahead of redraw-like work.
pub const PRIORITY_HIGH_IDLE: i32 = 100;

/// Default priority for idle sources.
pub const PRIORITY_DEFAULT_IDLE: i32 = 200;

/// Background work.
pub const PRIORITY_LOW: i32 = 300;

bitflags! {
    /// Descriptor conditions in the inner loop's representation.
    ///
    /// The values match the classic `poll(2)` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct IoCondition: u16 {
        /// Data to read.
        const IN = 1 << 0;
        /// Urgent data to read.
        const PRI = 1 << 1;
        /// Writing will not block.
        const OUT = 1 << 2;
        /// Error condition.
        const ERR = 1 << 3;
        /// Hung up.
        const HUP = 1 << 4;
        /// Invalid descriptor.
        const NVAL = 1 << 5;
    }
}

/// One discovered descriptor: what the inner loop wants to know about it
/// and what the outer loop has seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollFd {
    /// The descriptor.
    pub fd: RawFd,

    /// Conditions the inner loop is interested in.
    pub events: IoCondition,

    /// Conditions observed since the last discovery.
    pub revents: IoCondition,
}

impl PollFd {
    /// An entry for `fd` interested in `events`, with nothing observed yet.
    pub fn new(fd: RawFd, events: IoCondition) -> Self {
        Self {
            fd,
            events,
            revents: IoCondition::empty(),
        }
    }
}

impl Default for PollFd {
    fn default() -> Self {
        Self::new(-1, IoCondition::empty())
    }
}

/// Outcome of [`InnerLoop::prepare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prepared {
    /// Most urgent priority that is ready to dispatch, or `i32::MAX` when
    /// nothing is.
    pub max_priority: i32,

    /// Some source can be dispatched without waiting.
    pub ready: bool,
}

/// Outcome of [`InnerLoop::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
    /// Number of descriptors the inner loop wants to report. May exceed the
    /// length of the slice it was given, in which case only a prefix was
    /// written.
    pub wanted: usize,

    /// How long the outer loop may block. `None` is unbounded,
    /// `Some(Duration::ZERO)` asks for an immediate return.
    pub timeout: Option<Duration>,
}

/// A foreign event loop driven one phase at a time.
///
/// Reference counting of the underlying context is expressed through
/// ownership: whoever holds a value keeps the context alive.
pub trait InnerLoop {
    /// Takes ownership of the context for the calling thread. Returns
    /// `false` if another thread owns it.
    fn acquire(&mut self) -> bool;

    /// Gives back one level of ownership taken by [`acquire`](Self::acquire).
    fn release(&mut self);

    /// Starts an iteration.
    fn prepare(&mut self) -> Prepared;

    /// Writes up to `fds.len()` descriptors of interest into `fds`.
    fn query(&mut self, max_priority: i32, fds: &mut [PollFd]) -> Query;

    /// Inspects the observed readiness in `fds` and decides which sources
    /// are ready. Returns `true` if any are.
    fn check(&mut self, max_priority: i32, fds: &[PollFd]) -> bool;

    /// Runs the callbacks of the sources found ready by
    /// [`check`](Self::check).
    fn dispatch(&mut self);
}
