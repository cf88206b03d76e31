#![allow(dead_code)]

use loopbridge::context::{InnerLoop, IoCondition, PollFd, Prepared, Query};
use loopbridge::{Arm, Interest};

use std::cell::RefCell;
use std::io;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::time::Duration;

/// An inner loop that reports whatever the test scripts and records what
/// the bridge hands back.
#[derive(Default)]
pub struct Script {
    pub fds: Vec<PollFd>,
    pub timeout: Option<Duration>,
    pub ready: bool,
    pub max_priority: i32,

    /// Overrides the reported descriptor count.
    pub wanted: Option<usize>,

    pub acquired: usize,
    pub queries: usize,
    pub checked: Vec<Vec<PollFd>>,
    pub dispatched: usize,
}

#[derive(Clone, Default)]
pub struct Scripted(pub Rc<RefCell<Script>>);

impl Scripted {
    pub fn new(fds: &[(RawFd, IoCondition)]) -> Self {
        let scripted = Self::default();
        scripted.set(fds);
        scripted.0.borrow_mut().max_priority = i32::MAX;
        scripted
    }

    pub fn set(&self, fds: &[(RawFd, IoCondition)]) {
        self.0.borrow_mut().fds = fds.iter().map(|&(fd, c)| PollFd::new(fd, c)).collect();
    }

    pub fn set_timeout(&self, timeout: Option<Duration>) {
        self.0.borrow_mut().timeout = timeout;
    }

    pub fn last_checked(&self) -> Vec<PollFd> {
        self.0.borrow().checked.last().cloned().unwrap_or_default()
    }
}

impl InnerLoop for Scripted {
    fn acquire(&mut self) -> bool {
        self.0.borrow_mut().acquired += 1;
        true
    }

    fn release(&mut self) {
        self.0.borrow_mut().acquired -= 1;
    }

    fn prepare(&mut self) -> Prepared {
        let script = self.0.borrow();
        Prepared {
            max_priority: script.max_priority,
            ready: script.ready,
        }
    }

    fn query(&mut self, _max_priority: i32, fds: &mut [PollFd]) -> Query {
        let mut script = self.0.borrow_mut();
        script.queries += 1;

        for (slot, entry) in fds.iter_mut().zip(&script.fds) {
            *slot = *entry;
        }

        Query {
            wanted: script.wanted.unwrap_or(script.fds.len()),
            timeout: script.timeout,
        }
    }

    fn check(&mut self, _max_priority: i32, fds: &[PollFd]) -> bool {
        let mut script = self.0.borrow_mut();
        script.checked.push(fds.to_vec());
        fds.iter().any(|p| !p.revents.is_empty())
    }

    fn dispatch(&mut self) {
        self.0.borrow_mut().dispatched += 1;
    }
}

/// Records every watch armed and disarmed through it.
#[derive(Debug, Default)]
pub struct Log {
    pub next_id: usize,
    pub armed: Vec<(RawFd, Interest, usize)>,
    pub disarmed: Vec<RawFd>,
    pub fail_on: Option<RawFd>,
}

#[derive(Clone, Default)]
pub struct FakeLoop(pub Rc<RefCell<Log>>);

impl FakeLoop {
    pub fn armed_fds(&self) -> Vec<RawFd> {
        self.0.borrow().armed.iter().map(|&(fd, _, _)| fd).collect()
    }

    pub fn disarmed_fds(&self) -> Vec<RawFd> {
        self.0.borrow().disarmed.clone()
    }
}

#[derive(Debug)]
pub struct FakeWatch {
    pub id: usize,
    pub fd: RawFd,
    log: Rc<RefCell<Log>>,
}

impl Drop for FakeWatch {
    fn drop(&mut self) {
        self.log.borrow_mut().disarmed.push(self.fd);
    }
}

impl Arm for FakeLoop {
    type Watch = FakeWatch;

    fn arm(&mut self, fd: RawFd, interest: Interest, key: usize) -> loopbridge::Result<FakeWatch> {
        let mut log = self.0.borrow_mut();

        if log.fail_on == Some(fd) {
            return Err(io::Error::from_raw_os_error(libc::EBADF).into());
        }

        let id = log.next_id;
        log.next_id += 1;
        log.armed.push((fd, interest, key));

        Ok(FakeWatch {
            id,
            fd,
            log: self.0.clone(),
        })
    }
}

/// A non-blocking pipe, closed on drop.
pub struct Pipe {
    pub reader: RawFd,
    pub writer: RawFd,
}

impl Pipe {
    pub fn new() -> Self {
        let mut fds = [0; 2];
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(rc, 0, "pipe failed");

        for fd in fds {
            unsafe {
                let flags = libc::fcntl(fd, libc::F_GETFL);
                libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
            }
        }

        Self {
            reader: fds[0],
            writer: fds[1],
        }
    }

    pub fn write(&self, data: &[u8]) {
        let n = unsafe { libc::write(self.writer, data.as_ptr() as *const _, data.len()) };
        assert_eq!(n, data.len() as isize, "short pipe write");
    }

    pub fn drain(&self) -> usize {
        let mut buf = [0u8; 64];
        let mut total = 0;
        loop {
            let n = unsafe { libc::read(self.reader, buf.as_mut_ptr() as *mut _, buf.len()) };
            if n <= 0 {
                return total;
            }
            total += n as usize;
        }
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.reader);
            libc::close(self.writer);
        }
    }
}
