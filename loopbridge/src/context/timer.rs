use super::main_context::SourceId;

use std::cmp::{Ordering, Reverse};
use std::time::Instant;

/// A scheduled deadline of a timeout source.
///
/// Kept in a `BinaryHeap`. Rescheduling or removing a source leaves its old
/// entry behind; an entry whose source is gone or now has another deadline
/// is stale and gets dropped once it reaches the top.
pub(crate) struct TimerEntry {
    pub(crate) deadline: Instant,
    pub(crate) source: SourceId,
}

impl TimerEntry {
    /// Earliest deadline first, then the oldest source.
    fn key(&self) -> Reverse<(Instant, SourceId)> {
        Reverse((self.deadline, self.source))
    }
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Ord for TimerEntry {
    /// Reversed, so the heap pops the earliest deadline.
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
