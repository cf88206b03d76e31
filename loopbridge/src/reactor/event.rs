/// An I/O event reported by the poller.
///
/// Produced by the platform poller and consumed by the event loop, which
/// maps the token back to the armed watch and delivers a [`Readiness`] to
/// the hook that owns it.
pub(crate) struct Event {
    /// Token of the armed watch (its slab index).
    pub(crate) token: usize,

    /// Readiness reported for the watched descriptor.
    pub(crate) readiness: Readiness,
}

/// Readiness of a watched descriptor as seen by the outer loop.
///
/// Error and hang-up conditions are folded into `readable`, so a reader
/// always gets a chance to observe end-of-file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    /// The descriptor is readable.
    pub readable: bool,

    /// The descriptor is writable.
    pub writable: bool,
}

impl Readiness {
    /// Readable only.
    pub const READABLE: Readiness = Readiness {
        readable: true,
        writable: false,
    };

    /// Writable only.
    pub const WRITABLE: Readiness = Readiness {
        readable: false,
        writable: true,
    };

    /// Returns `true` if neither direction is ready.
    pub fn is_empty(self) -> bool {
        !self.readable && !self.writable
    }
}
