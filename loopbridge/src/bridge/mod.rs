//! The bridge between an outer readiness loop and an inner [`InnerLoop`].
//!
//! Every outer iteration the bridge:
//! - discovers the inner loop's descriptors and timeout,
//! - reconciles its registrations, arming and disarming outer watches,
//! - translates outer readiness into the discovered entries,
//! - hands the entries back to the inner loop to check and dispatch.
//!
//! With the bundled [`EventLoop`] the bridge is a [`Hook`]; see [`attach`].
//! Any other outer loop can drive the same steps through [`Bridge::sync`],
//! [`Bridge::ready`] and [`Bridge::dispatch`], given an [`Arm`]
//! implementation.

mod builder;
mod discovery;
mod readiness;
mod reconcile;
mod registration;

pub use builder::BridgeBuilder;
pub use discovery::Discovery;
pub use readiness::translate;
pub use registration::Registration;

use crate::context::{InnerLoop, PollFd};
use crate::error::Result;
use crate::reactor::{Arm, EventLoop, Hook, HookContext, HookId, Readiness, Watch};
use discovery::FdBuffer;

use std::collections::HashMap;
use std::mem::ManuallyDrop;
use std::os::fd::RawFd;
use std::ptr;
use std::time::Duration;

/// Keeps an outer loop's watches in sync with an inner loop.
///
/// `W` is the outer loop's watch handle. The bridge owns the inner context
/// for its whole life: it is acquired when the bridge is built and released
/// when the bridge is dropped, after every watch has been disarmed.
pub struct Bridge<C: InnerLoop, W = Watch> {
    context: C,
    buffer: FdBuffer,
    max_priority: i32,
    registrations: HashMap<RawFd, Registration<W>>,
}

impl<C: InnerLoop, W> Bridge<C, W> {
    /// Acquires `context` and builds a bridge with default settings.
    pub fn init(context: C) -> Result<Self> {
        BridgeBuilder::new().build(context)
    }

    /// Returns a builder for custom settings.
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Disarms every watch, releases the context and hands it back.
    ///
    /// Must be called between iterations, from the loop's thread.
    pub fn uninit(self) -> C {
        let mut bridge = ManuallyDrop::new(self);
        bridge.teardown();

        // SAFETY: `bridge` is never dropped or used again, so every field is
        // moved out exactly once.
        unsafe {
            drop(ptr::read(&bridge.registrations));
            drop(ptr::read(&bridge.buffer));
            ptr::read(&bridge.context)
        }
    }

    fn teardown(&mut self) {
        let watches = self.registrations.len();
        self.registrations.clear();
        self.context.release();

        tracing::debug!(watches, "bridge torn down");
    }

    /// Refreshes the discovered descriptors from the inner loop.
    pub fn discover(&mut self) -> Result<Discovery> {
        let discovery = discovery::discover(&mut self.context, &mut self.buffer)?;
        self.max_priority = discovery.max_priority;

        tracing::trace!(
            len = discovery.len,
            capacity = self.buffer.capacity(),
            timeout = ?discovery.timeout,
            "descriptors discovered"
        );

        Ok(discovery)
    }

    /// Reconciles the live registrations against the last discovery.
    ///
    /// Descriptors `arm` refuses are left unwatched until a later pass.
    pub fn reconcile<A>(&mut self, arm: &mut A)
    where
        A: Arm<Watch = W>,
    {
        reconcile::reconcile(self.buffer.entries(), &mut self.registrations, arm);
    }

    /// Discovery followed, when needed, by reconciliation. Returns the
    /// timeout the outer loop should wait for at most.
    pub fn sync<A>(&mut self, arm: &mut A) -> Result<Option<Duration>>
    where
        A: Arm<Watch = W>,
    {
        let discovery = self.discover()?;
        if discovery.needs_sync() {
            self.reconcile(arm);
        }
        Ok(discovery.timeout)
    }

    /// Records outer readiness for `fd`.
    ///
    /// Only the directions the inner loop asked for are kept, and readiness
    /// accumulates until the next discovery. Unknown descriptors are
    /// ignored.
    pub fn ready(&mut self, fd: RawFd, readiness: Readiness) {
        let Some(registration) = self.registrations.get(&fd) else {
            return;
        };

        let slot = registration.slot();
        match self.buffer.entries_mut().get_mut(slot) {
            Some(entry) if entry.fd == fd => {
                readiness::stamp(entry, readiness);
                tracing::trace!(fd, revents = ?entry.revents, "readiness recorded");
            }
            // Not reconciled this iteration.
            _ => {}
        }
    }

    /// Hands the discovered entries back to the inner loop and lets it
    /// dispatch. Returns whether the inner loop found sources ready.
    pub fn dispatch(&mut self) -> bool {
        let ready = self.context.check(self.max_priority, self.buffer.entries());
        self.context.dispatch();
        ready
    }

    /// Entries discovered in the current iteration, with the readiness
    /// recorded so far.
    pub fn fds(&self) -> &[PollFd] {
        self.buffer.entries()
    }

    /// Number of descriptor slots allocated.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Most urgent priority considered by the last discovery.
    pub fn max_priority(&self) -> i32 {
        self.max_priority
    }

    /// The registration for `fd`, if it is watched.
    pub fn registration(&self, fd: RawFd) -> Option<&Registration<W>> {
        self.registrations.get(&fd)
    }

    /// All live registrations, in no particular order.
    pub fn registrations(&self) -> impl Iterator<Item = &Registration<W>> {
        self.registrations.values()
    }

    /// The inner context.
    pub fn context(&self) -> &C {
        &self.context
    }
}

impl<C: InnerLoop, W> Drop for Bridge<C, W> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<C: InnerLoop> Hook for Bridge<C, Watch> {
    fn before_poll(&mut self, cx: &mut HookContext<'_>) -> Result<Option<Duration>> {
        self.sync(cx)
    }

    fn on_ready(&mut self, key: usize, readiness: Readiness) {
        self.ready(key as RawFd, readiness);
    }

    fn after_poll(&mut self) {
        self.dispatch();
    }
}

/// Bridges `context` into `event_loop`. The returned id detaches it again.
pub fn attach<C: InnerLoop + 'static>(event_loop: &mut EventLoop, context: C) -> Result<HookId> {
    let bridge: Bridge<C> = Bridge::init(context)?;
    Ok(event_loop.insert_hook(bridge))
}

/// Removes a bridge installed by [`attach`], disarming all of its watches
/// and releasing its context. Returns `false` if `id` was not installed.
pub fn detach(event_loop: &mut EventLoop, id: HookId) -> bool {
    event_loop.remove_hook(id).is_some()
}
