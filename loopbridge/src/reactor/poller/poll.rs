//! Portable `poll(2)` poller for unix targets without epoll.
//!
//! Keeps the registration table in user space and rebuilds the `pollfd`
//! array on every wait. Exposes the same interface as the epoll backend.

use super::common::{Interest, timeout_ms};
use crate::reactor::event::{Event, Readiness};

use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, nfds_t, pollfd};
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

struct Registered {
    fd: RawFd,
    token: usize,
    interest: Interest,
}

/// `poll(2)` poller.
pub(crate) struct PollPoller {
    registered: Vec<Registered>,

    /// Reusable `pollfd` array, parallel to `registered` during a wait.
    fds: Vec<pollfd>,
}

impl PollPoller {
    pub(crate) fn new(capacity: usize) -> io::Result<Self> {
        Ok(Self {
            registered: Vec::with_capacity(capacity),
            fds: Vec::with_capacity(capacity),
        })
    }

    pub(crate) fn register(&mut self, fd: RawFd, token: usize, interest: Interest) -> io::Result<()> {
        if self.registered.iter().any(|r| r.fd == fd) {
            return Err(io::Error::from_raw_os_error(libc::EEXIST));
        }

        self.registered.push(Registered {
            fd,
            token,
            interest,
        });

        Ok(())
    }

    pub(crate) fn deregister(&mut self, fd: RawFd) -> io::Result<()> {
        match self.registered.iter().position(|r| r.fd == fd) {
            Some(i) => {
                self.registered.swap_remove(i);
                Ok(())
            }
            None => Err(io::Error::from_raw_os_error(libc::ENOENT)),
        }
    }

    pub(crate) fn poll(&mut self, events: &mut Vec<Event>, timeout: Option<Duration>) -> io::Result<()> {
        events.clear();

        self.fds.clear();
        self.fds.extend(self.registered.iter().map(|r| {
            let mut flags = 0;
            if r.interest.read {
                flags |= POLLIN;
            }
            if r.interest.write {
                flags |= POLLOUT;
            }

            pollfd {
                fd: r.fd,
                events: flags,
                revents: 0,
            }
        }));

        let n = unsafe {
            libc::poll(
                self.fds.as_mut_ptr(),
                self.fds.len() as nfds_t,
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

        for (pfd, r) in self.fds.iter().zip(&self.registered) {
            if pfd.revents == 0 {
                continue;
            }

            let readiness = Readiness {
                readable: pfd.revents & (POLLIN | POLLERR | POLLHUP | POLLNVAL) != 0,
                writable: pfd.revents & POLLOUT != 0,
            };

            events.push(Event {
                token: r.token,
                readiness,
            });
        }

        Ok(())
    }
}
