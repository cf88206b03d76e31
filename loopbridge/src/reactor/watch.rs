use super::hook::HookId;
use super::poller::Poller;
use super::poller::common::Interest;
use crate::error::Result;
use crate::utils::Slab;

use std::cell::RefCell;
use std::fmt;
use std::os::fd::RawFd;
use std::rc::Rc;

/// Arms descriptor watches in an outer loop.
///
/// This is the only capability the bridge needs from the loop that drives
/// it. The returned watch is an owning handle: dropping it disarms the
/// watch, and readiness for it is delivered to the arming party, tagged
/// with `key`, only while it is armed.
pub trait Arm {
    /// Handle that keeps the watch armed for as long as it lives.
    type Watch;

    /// Starts watching `fd` for `interest`.
    fn arm(&mut self, fd: RawFd, interest: Interest, key: usize) -> Result<Self::Watch>;
}

/// Bookkeeping for one armed watch.
pub(crate) struct WatchEntry {
    pub(crate) fd: RawFd,

    /// Hook that receives readiness for this watch.
    pub(crate) hook: HookId,

    /// Opaque value handed back to the hook with each readiness report.
    pub(crate) key: usize,
}

/// State shared between the event loop and every [`LoopHandle`].
pub(crate) struct Registry {
    pub(crate) poller: Poller,

    /// Armed watches, indexed by poller token.
    pub(crate) watches: Slab<WatchEntry>,

    stop_requested: bool,
}

/// A cheap, clonable handle onto an [`EventLoop`](super::EventLoop).
///
/// Handles are single-threaded: they can be captured by callbacks running on
/// the loop's thread (for example, to stop the loop), but not sent to other
/// threads.
#[derive(Clone)]
pub struct LoopHandle {
    pub(crate) inner: Rc<RefCell<Registry>>,
}

impl LoopHandle {
    pub(crate) fn new(poller: Poller) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry {
                poller,
                watches: Slab::new(16),
                stop_requested: false,
            })),
        }
    }

    /// Arms a watch on behalf of `hook`.
    pub(crate) fn arm(&self, fd: RawFd, interest: Interest, hook: HookId, key: usize) -> Result<Watch> {
        let mut registry = self.inner.borrow_mut();

        let token = registry.watches.insert(WatchEntry { fd, hook, key });
        if let Err(error) = registry.poller.register(fd, token, interest) {
            registry.watches.remove(token);
            return Err(error.into());
        }

        tracing::trace!(fd, token, hook = hook.0, "watch armed");

        Ok(Watch {
            handle: self.clone(),
            token,
            fd,
        })
    }

    fn disarm(&self, token: usize, fd: RawFd) {
        let mut registry = self.inner.borrow_mut();

        if registry.watches.remove(token).is_none() {
            return;
        }

        match registry.poller.deregister(fd) {
            Ok(()) => tracing::trace!(fd, token, "watch disarmed"),
            // The descriptor was closed while armed; the kernel already
            // dropped it.
            Err(error) if matches!(error.raw_os_error(), Some(libc::EBADF) | Some(libc::ENOENT)) => {
                tracing::trace!(fd, token, "watch disarmed after descriptor closed");
            }
            Err(error) => tracing::warn!(fd, token, %error, "failed to disarm watch"),
        }
    }

    /// Asks the loop to return from [`run`](super::EventLoop::run) once the
    /// current iteration is complete.
    pub fn stop(&self) {
        self.inner.borrow_mut().stop_requested = true;
    }

    /// Returns whether [`stop`](Self::stop) was requested and not yet
    /// honoured.
    pub fn is_stopping(&self) -> bool {
        self.inner.borrow().stop_requested
    }

    pub(crate) fn clear_stop(&self) {
        self.inner.borrow_mut().stop_requested = false;
    }

    /// Number of watches currently armed in the loop.
    pub fn armed(&self) -> usize {
        self.inner.borrow().watches.len()
    }

    /// Returns whether `fd` is currently armed in the loop.
    pub fn is_armed(&self, fd: RawFd) -> bool {
        let registry = self.inner.borrow();
        registry
            .watches
            .indices()
            .into_iter()
            .any(|token| registry.watches.get(token).is_some_and(|w| w.fd == fd))
    }
}

/// An armed descriptor watch.
///
/// The watch stays armed exactly as long as this value lives.
pub struct Watch {
    handle: LoopHandle,
    token: usize,
    fd: RawFd,
}

impl Watch {
    /// The watched descriptor.
    pub fn fd(&self) -> RawFd {
        self.fd
    }
}

impl fmt::Debug for Watch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch")
            .field("fd", &self.fd)
            .field("token", &self.token)
            .finish()
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        self.handle.disarm(self.token, self.fd);
    }
}
