//! Linux `epoll`-based poller implementation.
//!
//! Responsibilities:
//! - Register file descriptors with read/write interests
//! - Block waiting for I/O readiness, bounded by an optional timeout
//!
//! Registrations are level-triggered: a descriptor that stays ready is
//! reported again on every poll until its watch is removed.

use super::common::{Interest, timeout_ms};
use crate::reactor::event::{Event, Readiness};

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLOUT,
    epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// Linux `epoll` poller.
///
/// Owns the `epoll` instance and a reusable buffer for raw kernel events.
pub(crate) struct EpollPoller {
    /// Epoll file descriptor.
    epoll: RawFd,

    /// Reusable buffer for epoll events.
    events: Vec<epoll_event>,
}

impl EpollPoller {
    /// Creates a new `EpollPoller` able to collect up to `capacity`
    /// events per poll.
    pub(crate) fn new(capacity: usize) -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            epoll,
            events: Vec::with_capacity(capacity.max(1)),
        })
    }

    /// Registers a file descriptor with the poller.
    pub(crate) fn register(&mut self, fd: RawFd, token: usize, interest: Interest) -> io::Result<()> {
        let mut flags = 0;

        if interest.read {
            flags |= EPOLLIN;
        }
        if interest.write {
            flags |= EPOLLOUT;
        }

        let mut event = epoll_event {
            events: flags as u32,
            u64: token as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Removes a file descriptor from the poller.
    ///
    /// The kernel drops closed descriptors from the interest list on its
    /// own, so `EBADF` and `ENOENT` are expected here and reported to the
    /// caller, which decides whether they matter.
    pub(crate) fn deregister(&mut self, fd: RawFd) -> io::Result<()> {
        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Polls for I/O readiness events.
    ///
    /// Blocks until at least one registered descriptor is ready or the
    /// timeout expires. An interrupted wait returns with no events.
    pub(crate) fn poll(&mut self, events: &mut Vec<Event>, timeout: Option<Duration>) -> io::Result<()> {
        events.clear();

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                timeout_ms(timeout),
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        // SAFETY: the kernel initialized the first `n` entries.
        unsafe {
            self.events.set_len(n as usize);
        }

        for ev in &self.events {
            let token = ev.u64 as usize;

            let readiness = Readiness {
                readable: ev.events & ((EPOLLIN | EPOLLERR | EPOLLHUP) as u32) != 0,
                writable: ev.events & (EPOLLOUT as u32) != 0,
            };

            events.push(Event { token, readiness });
        }

        Ok(())
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        unsafe { libc::close(self.epoll) };
    }
}
