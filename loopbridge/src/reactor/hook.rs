use super::event::Readiness;
use super::poller::common::Interest;
use super::watch::{Arm, LoopHandle, Watch};
use crate::error::Result;

use std::os::fd::RawFd;
use std::time::Duration;

/// Identifies a hook installed in an [`EventLoop`](super::EventLoop).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(pub(crate) usize);

/// A participant in every iteration of the event loop.
///
/// Each iteration calls, in order:
/// 1. [`before_poll`](Self::before_poll) on every hook,
/// 2. the blocking poll,
/// 3. [`on_ready`](Self::on_ready) once per ready watch, on the hook that
///    armed it,
/// 4. [`after_poll`](Self::after_poll) on every hook.
///
/// Only the poll blocks. Hooks run inline on the loop thread and must not
/// block.
pub trait Hook {
    /// Called before the loop blocks.
    ///
    /// Watches armed through `cx` belong to this hook. The returned timeout
    /// bounds the coming poll; `None` places no bound.
    fn before_poll(&mut self, cx: &mut HookContext<'_>) -> Result<Option<Duration>>;

    /// Called when a watch armed by this hook is ready.
    fn on_ready(&mut self, key: usize, readiness: Readiness);

    /// Called once all readiness for the iteration has been delivered.
    fn after_poll(&mut self) {}
}

/// Access to the loop given to a hook during [`Hook::before_poll`].
pub struct HookContext<'a> {
    pub(crate) handle: &'a LoopHandle,
    pub(crate) hook: HookId,
}

impl HookContext<'_> {
    /// The identifier of the hook being called.
    pub fn id(&self) -> HookId {
        self.hook
    }

    /// A handle onto the running loop.
    pub fn handle(&self) -> &LoopHandle {
        self.handle
    }
}

impl Arm for HookContext<'_> {
    type Watch = Watch;

    fn arm(&mut self, fd: RawFd, interest: Interest, key: usize) -> Result<Watch> {
        self.handle.arm(fd, interest, self.hook, key)
    }
}
