use crate::context::{InnerLoop, IoCondition, PollFd};
use crate::error::{Error, Result};

use std::time::Duration;

/// The discovered descriptor buffer.
///
/// `slots` is fully initialized up to its length, which is the capacity the
/// inner loop is offered. Only the first `len` slots are meaningful in the
/// current iteration. Capacity never shrinks: later iterations reuse the
/// storage and only move `len`.
pub(crate) struct FdBuffer {
    slots: Vec<PollFd>,
    len: usize,
}

impl FdBuffer {
    pub(crate) fn with_capacity(capacity: usize) -> Result<Self> {
        let mut buffer = Self {
            slots: Vec::new(),
            len: 0,
        };
        buffer.grow(capacity)?;
        Ok(buffer)
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The entries discovered in the current iteration.
    pub(crate) fn entries(&self) -> &[PollFd] {
        &self.slots[..self.len]
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [PollFd] {
        &mut self.slots[..self.len]
    }

    /// Grows to at least `capacity` slots.
    fn grow(&mut self, capacity: usize) -> Result<()> {
        let additional = capacity.saturating_sub(self.slots.len());
        if additional == 0 {
            return Ok(());
        }

        self.slots
            .try_reserve_exact(additional)
            .map_err(|_| Error::ResourceExhausted {
                requested: capacity,
            })?;
        self.slots.resize(capacity, PollFd::default());

        Ok(())
    }
}

/// Result of one discovery pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discovery {
    /// How long the outer loop may block before the inner loop needs
    /// attention again. `None` is unbounded.
    pub timeout: Option<Duration>,

    /// Most urgent priority the inner loop considered.
    pub max_priority: i32,

    /// Number of descriptors discovered.
    pub len: usize,
}

impl Discovery {
    /// Whether the live registrations should be reconciled against this
    /// discovery.
    ///
    /// With nothing to watch and an immediate timeout the inner loop is busy
    /// with descriptor-less work; watches are kept for another pass instead
    /// of being torn down and re-armed.
    pub fn needs_sync(&self) -> bool {
        self.len > 0 || self.timeout != Some(Duration::ZERO)
    }
}

/// Asks the inner loop for its descriptors and timeout, growing `buffer`
/// until the whole interest set fits.
pub(crate) fn discover<C: InnerLoop>(context: &mut C, buffer: &mut FdBuffer) -> Result<Discovery> {
    let prepared = context.prepare();

    let query = loop {
        let query = context.query(prepared.max_priority, &mut buffer.slots);
        if query.wanted <= buffer.capacity() {
            break query;
        }

        tracing::trace!(
            wanted = query.wanted,
            capacity = buffer.capacity(),
            "growing descriptor buffer"
        );
        buffer.grow(query.wanted)?;
    };

    buffer.len = query.wanted;
    for entry in buffer.entries_mut() {
        entry.revents = IoCondition::empty();
    }

    let timeout = if prepared.ready {
        Some(Duration::ZERO)
    } else {
        query.timeout
    };

    Ok(Discovery {
        timeout,
        max_priority: prepared.max_priority,
        len: query.wanted,
    })
}
