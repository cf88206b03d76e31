use super::event::Event;
use super::hook::{Hook, HookContext, HookId};
use super::poller::Poller;
use super::watch::LoopHandle;
use crate::error::Result;
use crate::utils::Slab;

use std::time::Duration;

/// A single-threaded readiness loop with before/after-poll hooks.
///
/// Every [`turn`](Self::turn) runs the hooks' `before_poll`, blocks in the
/// platform poller, delivers readiness to the hooks that armed the ready
/// watches, then runs the hooks' `after_poll`.
pub struct EventLoop {
    handle: LoopHandle,
    hooks: Slab<Box<dyn Hook>>,
    events: Vec<Event>,
}

impl EventLoop {
    /// Creates an event loop with default settings.
    pub fn new() -> Result<Self> {
        super::EventLoopBuilder::new().build()
    }

    pub(crate) fn with_capacity(event_capacity: usize) -> Result<Self> {
        let poller = Poller::new(event_capacity)?;

        Ok(Self {
            handle: LoopHandle::new(poller),
            hooks: Slab::new(4),
            events: Vec::with_capacity(event_capacity),
        })
    }

    /// Returns a handle onto this loop.
    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Installs a hook. It takes part in every following iteration.
    pub fn insert_hook<H: Hook + 'static>(&mut self, hook: H) -> HookId {
        let id = HookId(self.hooks.insert(Box::new(hook)));
        tracing::debug!(hook = id.0, "hook installed");
        id
    }

    /// Removes a hook and returns it.
    ///
    /// Readiness for watches the hook still owns is discarded from now on.
    pub fn remove_hook(&mut self, id: HookId) -> Option<Box<dyn Hook>> {
        let hook = self.hooks.remove(id.0);
        if hook.is_some() {
            tracing::debug!(hook = id.0, "hook removed");
        }
        hook
    }

    /// Runs one iteration.
    ///
    /// The poll waits for at most the earliest of `timeout` and every
    /// timeout returned by the hooks; `None` everywhere blocks until a watch
    /// is ready.
    pub fn turn(&mut self, timeout: Option<Duration>) -> Result<()> {
        let mut timeout = timeout;

        for index in self.hooks.indices() {
            let Some(hook) = self.hooks.get_mut(index) else {
                continue;
            };

            let mut cx = HookContext {
                handle: &self.handle,
                hook: HookId(index),
            };
            let wanted = hook.before_poll(&mut cx)?;
            timeout = earliest(timeout, wanted);
        }

        self.handle
            .inner
            .borrow_mut()
            .poller
            .poll(&mut self.events, timeout)?;

        for event in self.events.drain(..) {
            // Looked up at delivery time: a watch disarmed since the poll
            // returned gets nothing.
            let target = {
                let registry = self.handle.inner.borrow();
                registry.watches.get(event.token).map(|w| (w.hook, w.key))
            };

            let Some((hook, key)) = target else {
                continue;
            };

            if let Some(hook) = self.hooks.get_mut(hook.0) {
                hook.on_ready(key, event.readiness);
            }
        }

        for index in self.hooks.indices() {
            if let Some(hook) = self.hooks.get_mut(index) {
                hook.after_poll();
            }
        }

        Ok(())
    }

    /// Turns the loop until [`LoopHandle::stop`] is called or nothing is
    /// left to wait for (no hooks and no armed watches).
    pub fn run(&mut self) -> Result<()> {
        let result = loop {
            if self.handle.is_stopping() || !self.is_alive() {
                break Ok(());
            }

            if let Err(error) = self.turn(None) {
                break Err(error);
            }
        };

        self.handle.clear_stop();
        result
    }

    fn is_alive(&self) -> bool {
        !self.hooks.is_empty() || self.handle.armed() > 0
    }
}

/// The earlier of two optional deadlines, where `None` means unbounded.
fn earliest(a: Option<Duration>, b: Option<Duration>) -> Option<Duration> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}
