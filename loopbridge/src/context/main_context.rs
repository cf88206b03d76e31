use super::timer::TimerEntry;
use super::{InnerLoop, IoCondition, PollFd, Prepared, Query};
use crate::error::Result;
use crate::reactor::poller::common::timeout_ms;

use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, POLLPRI, c_short, nfds_t, pollfd};
use std::cell::RefCell;
use std::collections::{BTreeMap, BinaryHeap};
use std::io;
use std::ops::ControlFlow;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Identifies a source attached to a [`MainContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(u64);

type Callback = Box<dyn FnMut(IoCondition) -> ControlFlow<()>>;

enum SourceKind {
    Fd {
        fd: RawFd,
        condition: IoCondition,
        revents: IoCondition,
    },
    Timeout {
        interval: Duration,

        /// `None` when the interval overflows the clock: never fires.
        deadline: Option<Instant>,
    },
    Idle,
}

struct Source {
    priority: i32,
    kind: SourceKind,

    /// Taken out while the callback runs so the context stays usable from
    /// inside it.
    callback: Option<Callback>,
}

impl Source {
    /// Ready without looking at any descriptor.
    fn is_ready_at(&self, now: Instant) -> bool {
        match self.kind {
            SourceKind::Fd { .. } => false,
            SourceKind::Timeout { deadline, .. } => deadline.is_some_and(|d| d <= now),
            SourceKind::Idle => true,
        }
    }
}

#[derive(Default)]
struct Inner {
    sources: BTreeMap<SourceId, Source>,
    timers: BinaryHeap<TimerEntry>,

    /// Sources selected by the last `check`, all of the same priority.
    pending: Vec<SourceId>,

    next_id: u64,
    acquired: usize,
}

impl Inner {
    /// Whether `entry` still matches the deadline of its source.
    fn is_live(sources: &BTreeMap<SourceId, Source>, entry: &TimerEntry) -> bool {
        matches!(
            sources.get(&entry.source),
            Some(Source { kind: SourceKind::Timeout { deadline: Some(current), .. }, .. })
                if *current == entry.deadline
        )
    }

    /// Drops stale entries from the timeout queue.
    ///
    /// Stale tops are popped. Stale entries buried under a live top are
    /// swept once they outnumber the sources.
    fn prune_timers(&mut self) {
        while let Some(top) = self.timers.peek() {
            if Self::is_live(&self.sources, top) {
                break;
            }
            self.timers.pop();
        }

        if self.timers.len() > 2 * self.sources.len() {
            let sources = &self.sources;
            self.timers.retain(|entry| Self::is_live(sources, entry));
        }
    }

    /// Earliest deadline among live timeout sources.
    fn next_deadline(&mut self) -> Option<Instant> {
        self.prune_timers();
        self.timers.peek().map(|top| top.deadline)
    }
}

/// A priority-ordered collection of event sources.
///
/// Sources come in three kinds: descriptor sources ready when their
/// descriptor shows one of the requested conditions, timeout sources ready
/// once their interval elapses, and idle sources that are always ready. Lower
/// priority values are more urgent; a dispatch pass only runs the sources of
/// the most urgent ready priority.
///
/// `MainContext` is a reference-counted handle: clones share the same
/// sources, so a host can keep adding sources to a context that a
/// [`Bridge`](crate::Bridge) owns.
#[derive(Clone, Default)]
pub struct MainContext {
    inner: Rc<RefCell<Inner>>,
}

impl MainContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Watches `fd` for `condition`. The callback receives the conditions
    /// that were observed.
    pub fn add_fd<F>(&self, fd: RawFd, condition: IoCondition, priority: i32, callback: F) -> SourceId
    where
        F: FnMut(IoCondition) -> ControlFlow<()> + 'static,
    {
        let kind = SourceKind::Fd {
            fd,
            condition,
            revents: IoCondition::empty(),
        };

        self.insert(priority, kind, Box::new(callback))
    }

    /// Calls `callback` every `interval`.
    pub fn add_timeout<F>(&self, interval: Duration, priority: i32, mut callback: F) -> SourceId
    where
        F: FnMut() -> ControlFlow<()> + 'static,
    {
        let deadline = Instant::now().checked_add(interval);
        let id = self.insert(
            priority,
            SourceKind::Timeout { interval, deadline },
            Box::new(move |_| callback()),
        );

        if let Some(deadline) = deadline {
            self.inner.borrow_mut().timers.push(TimerEntry {
                deadline,
                source: id,
            });
        }

        id
    }

    /// Calls `callback` whenever nothing more urgent is ready.
    pub fn add_idle<F>(&self, priority: i32, mut callback: F) -> SourceId
    where
        F: FnMut() -> ControlFlow<()> + 'static,
    {
        self.insert(priority, SourceKind::Idle, Box::new(move |_| callback()))
    }

    fn insert(&self, priority: i32, kind: SourceKind, callback: Callback) -> SourceId {
        let mut inner = self.inner.borrow_mut();

        let id = SourceId(inner.next_id);
        inner.next_id += 1;

        inner.sources.insert(
            id,
            Source {
                priority,
                kind,
                callback: Some(callback),
            },
        );

        tracing::trace!(source = id.0, priority, "source added");
        id
    }

    /// Detaches a source. Returns `false` if it was already gone.
    pub fn remove(&self, id: SourceId) -> bool {
        self.inner.borrow_mut().sources.remove(&id).is_some()
    }

    /// Returns whether the source is still attached.
    pub fn contains(&self, id: SourceId) -> bool {
        self.inner.borrow().sources.contains_key(&id)
    }

    /// Number of attached sources.
    pub fn len(&self) -> usize {
        self.inner.borrow().sources.len()
    }

    /// Returns `true` if no source is attached.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().sources.is_empty()
    }

    /// Number of entries in the timeout queue, stale ones included.
    pub fn queued_timeouts(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// Returns whether some owner currently holds the context.
    pub fn is_acquired(&self) -> bool {
        self.inner.borrow().acquired > 0
    }

    /// Runs one iteration on its own, waiting in `poll(2)`.
    ///
    /// With `may_block` unset the wait returns immediately. Returns whether
    /// any source was found ready.
    pub fn iteration(&mut self, may_block: bool) -> Result<bool> {
        let prepared = self.prepare();

        let mut fds = Vec::new();
        let query = loop {
            let query = self.query(prepared.max_priority, &mut fds);
            if query.wanted <= fds.len() {
                fds.truncate(query.wanted);
                break query;
            }
            fds.resize(query.wanted, PollFd::default());
        };

        let timeout = if may_block {
            query.timeout
        } else {
            Some(Duration::ZERO)
        };

        let mut raw: Vec<pollfd> = fds
            .iter()
            .map(|p| pollfd {
                fd: p.fd,
                events: to_poll(p.events),
                revents: 0,
            })
            .collect();

        let n = unsafe { libc::poll(raw.as_mut_ptr(), raw.len() as nfds_t, timeout_ms(timeout)) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err.into());
            }
        }

        for (fd, raw) in fds.iter_mut().zip(&raw) {
            fd.revents = from_poll(raw.revents);
        }

        let ready = self.check(prepared.max_priority, &fds);
        self.dispatch();

        Ok(ready)
    }
}

impl InnerLoop for MainContext {
    /// Always succeeds: the handle cannot leave its thread, so ownership is
    /// a nesting count.
    fn acquire(&mut self) -> bool {
        self.inner.borrow_mut().acquired += 1;
        true
    }

    fn release(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.acquired = inner.acquired.saturating_sub(1);
    }

    fn prepare(&mut self) -> Prepared {
        let inner = self.inner.borrow();
        let now = Instant::now();

        let mut prepared = Prepared {
            max_priority: i32::MAX,
            ready: false,
        };

        for source in inner.sources.values() {
            if source.is_ready_at(now) {
                prepared.ready = true;
                prepared.max_priority = prepared.max_priority.min(source.priority);
            }
        }

        prepared
    }

    fn query(&mut self, max_priority: i32, fds: &mut [PollFd]) -> Query {
        let mut inner = self.inner.borrow_mut();

        let mut merged: Vec<PollFd> = Vec::new();
        for source in inner.sources.values() {
            if source.priority > max_priority {
                continue;
            }

            if let SourceKind::Fd { fd, condition, .. } = source.kind {
                match merged.iter_mut().find(|p| p.fd == fd) {
                    Some(existing) => existing.events |= condition,
                    None => merged.push(PollFd::new(fd, condition)),
                }
            }
        }

        for (slot, entry) in fds.iter_mut().zip(&merged) {
            *slot = *entry;
        }

        let now = Instant::now();
        let ready = inner
            .sources
            .values()
            .any(|s| s.priority <= max_priority && s.is_ready_at(now));

        let timeout = if ready {
            Some(Duration::ZERO)
        } else {
            inner
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(now))
        };

        Query {
            wanted: merged.len(),
            timeout,
        }
    }

    fn check(&mut self, max_priority: i32, fds: &[PollFd]) -> bool {
        let mut inner = self.inner.borrow_mut();
        let now = Instant::now();

        let Inner {
            sources, pending, ..
        } = &mut *inner;

        pending.clear();
        let mut best = i32::MAX;

        for (id, source) in sources.iter_mut() {
            if source.priority > max_priority {
                continue;
            }

            let ready = match &mut source.kind {
                SourceKind::Fd {
                    fd,
                    condition,
                    revents,
                } => {
                    let observed = fds
                        .iter()
                        .filter(|p| p.fd == *fd)
                        .fold(IoCondition::empty(), |acc, p| acc | p.revents);

                    *revents = observed & *condition;
                    !revents.is_empty()
                }
                SourceKind::Timeout { deadline, .. } => deadline.is_some_and(|d| d <= now),
                SourceKind::Idle => true,
            };

            if !ready {
                continue;
            }

            if source.priority < best {
                best = source.priority;
                pending.clear();
            }
            if source.priority == best {
                pending.push(*id);
            }
        }

        !pending.is_empty()
    }

    fn dispatch(&mut self) {
        let pending = std::mem::take(&mut self.inner.borrow_mut().pending);

        for id in pending {
            let taken = {
                let mut inner = self.inner.borrow_mut();
                inner.sources.get_mut(&id).and_then(|source| {
                    let revents = match source.kind {
                        SourceKind::Fd { revents, .. } => revents,
                        _ => IoCondition::empty(),
                    };
                    source.callback.take().map(|callback| (callback, revents))
                })
            };

            // Removed by an earlier callback in this pass.
            let Some((mut callback, revents)) = taken else {
                continue;
            };

            tracing::trace!(source = id.0, ?revents, "dispatching source");
            let flow = callback(revents);

            let mut inner = self.inner.borrow_mut();
            let Inner {
                sources, timers, ..
            } = &mut *inner;

            if flow.is_break() {
                sources.remove(&id);
                continue;
            }

            let Some(source) = sources.get_mut(&id) else {
                continue;
            };
            source.callback = Some(callback);

            match &mut source.kind {
                SourceKind::Timeout { interval, deadline } => {
                    *deadline = Instant::now().checked_add(*interval);
                    if let Some(deadline) = *deadline {
                        timers.push(TimerEntry {
                            deadline,
                            source: id,
                        });
                    }
                }
                SourceKind::Fd { revents, .. } => *revents = IoCondition::empty(),
                SourceKind::Idle => {}
            }
        }

        self.inner.borrow_mut().prune_timers();
    }
}

const POLL_BITS: [(IoCondition, c_short); 6] = [
    (IoCondition::IN, POLLIN),
    (IoCondition::PRI, POLLPRI),
    (IoCondition::OUT, POLLOUT),
    (IoCondition::ERR, POLLERR),
    (IoCondition::HUP, POLLHUP),
    (IoCondition::NVAL, POLLNVAL),
];

fn to_poll(condition: IoCondition) -> c_short {
    POLL_BITS
        .iter()
        .filter(|(c, _)| condition.contains(*c))
        .fold(0, |acc, (_, bit)| acc | bit)
}

fn from_poll(bits: c_short) -> IoCondition {
    POLL_BITS
        .iter()
        .filter(|(_, bit)| bits & bit != 0)
        .fold(IoCondition::empty(), |acc, (c, _)| acc | *c)
}
