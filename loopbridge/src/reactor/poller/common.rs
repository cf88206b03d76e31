use std::time::Duration;

/// Directions a watch asks the outer loop to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interest {
    /// Report read readiness.
    pub read: bool,

    /// Report write readiness.
    pub write: bool,
}

impl Interest {
    /// Read readiness only.
    pub const READ: Interest = Interest {
        read: true,
        write: false,
    };

    /// Write readiness only.
    pub const WRITE: Interest = Interest {
        read: false,
        write: true,
    };

    /// Both directions.
    pub const BOTH: Interest = Interest {
        read: true,
        write: true,
    };
}

/// Converts an optional timeout to the millisecond form taken by
/// `epoll_wait(2)` and `poll(2)`.
///
/// `None` blocks indefinitely (`-1`). Sub-millisecond timeouts are rounded
/// up so that a short deadline does not degrade into a busy loop.
pub(crate) fn timeout_ms(timeout: Option<Duration>) -> i32 {
    match timeout {
        None => -1,
        Some(t) => {
            let mut ms = t.as_millis();
            if Duration::from_millis(ms as u64) < t {
                ms += 1;
            }
            ms.min(i32::MAX as u128) as i32
        }
    }
}
