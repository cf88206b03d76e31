use std::os::fd::RawFd;

/// The bridge's record of one armed outer-loop watch.
///
/// A registration owns its watch: dropping the registration drops the watch,
/// which disarms it in the outer loop. The slot is the index of the
/// discovered entry describing this descriptor in the current iteration and
/// is re-pointed by every reconciliation pass.
#[derive(Debug)]
pub struct Registration<W> {
    fd: RawFd,
    watch: W,
    slot: usize,
    liveness: u32,
}

impl<W> Registration<W> {
    pub(crate) fn new(fd: RawFd, watch: W, slot: usize) -> Self {
        Self {
            fd,
            watch,
            slot,
            liveness: 1,
        }
    }

    /// The watched descriptor.
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// The armed watch.
    pub fn watch(&self) -> &W {
        &self.watch
    }

    /// Index of this descriptor's entry in the discovered buffer.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Reconciliation counter; zero after a pass means "no longer wanted".
    pub fn liveness(&self) -> u32 {
        self.liveness
    }

    /// Pre-pass of a reconciliation.
    pub(crate) fn expire(&mut self) {
        self.liveness = self.liveness.saturating_sub(1);
    }

    /// Matched by a discovered entry at `slot`.
    pub(crate) fn revive(&mut self, slot: usize) {
        // Listed twice in one pass still counts once.
        if self.liveness == 0 {
            self.liveness += 1;
        }
        self.slot = slot;
    }

    pub(crate) fn is_dead(&self) -> bool {
        self.liveness == 0
    }
}
