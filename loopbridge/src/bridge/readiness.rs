use crate::context::{IoCondition, PollFd};
use crate::reactor::Readiness;

/// Converts outer-loop readiness into inner-loop conditions.
///
/// Readable maps to [`IoCondition::IN`], writable to [`IoCondition::OUT`].
pub fn translate(readiness: Readiness) -> IoCondition {
    let mut condition = IoCondition::empty();

    if readiness.readable {
        condition |= IoCondition::IN;
    }
    if readiness.writable {
        condition |= IoCondition::OUT;
    }

    condition
}

/// Adds `readiness` to a discovered entry, keeping only the directions the
/// entry asked for. Bits already present are never cleared.
pub(crate) fn stamp(entry: &mut PollFd, readiness: Readiness) {
    entry.revents |= entry.events & translate(readiness);
}
