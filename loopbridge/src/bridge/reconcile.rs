use super::registration::Registration;
use crate::context::PollFd;
use crate::reactor::{Arm, Interest};

use std::collections::HashMap;
use std::os::fd::RawFd;

/// Brings the live registrations in line with the discovered entries.
///
/// 1. every registration loses one unit of liveness,
/// 2. each discovered descriptor either revives its registration (and
///    re-points its slot) or gets a new one with a freshly armed watch,
/// 3. registrations left at zero are removed, which disarms their watches.
///
/// Watches always ask for both directions; the interest mask in the
/// discovered entry decides later which readiness counts.
pub(crate) fn reconcile<W, A>(
    entries: &[PollFd],
    live: &mut HashMap<RawFd, Registration<W>>,
    arm: &mut A,
)
where
    A: Arm<Watch = W>,
{
    for registration in live.values_mut() {
        registration.expire();
    }

    for (slot, entry) in entries.iter().enumerate() {
        if entry.fd < 0 {
            continue;
        }

        if let Some(registration) = live.get_mut(&entry.fd) {
            registration.revive(slot);
            continue;
        }

        // A descriptor the outer loop refuses stays unwatched; the rest of
        // the pass goes on and the next pass tries again.
        let watch = match arm.arm(entry.fd, Interest::BOTH, entry.fd as usize) {
            Ok(watch) => watch,
            Err(error) => {
                tracing::warn!(fd = entry.fd, %error, "failed to arm watch");
                continue;
            }
        };
        live.insert(entry.fd, Registration::new(entry.fd, watch, slot));

        tracing::debug!(fd = entry.fd, events = ?entry.events, "registration added");
    }

    let dead: Vec<RawFd> = live
        .iter()
        .filter(|(_, registration)| registration.is_dead())
        .map(|(&fd, _)| fd)
        .collect();

    for fd in dead {
        live.remove(&fd);
        tracing::debug!(fd, "registration removed");
    }
}
