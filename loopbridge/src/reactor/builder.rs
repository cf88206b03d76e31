use super::EventLoop;
use crate::error::Result;

/// Builder for configuring and creating an [`EventLoop`].
///
/// # Examples
///
/// ```rust,ignore
/// let event_loop = EventLoopBuilder::new()
///     .event_capacity(256)
///     .build()?;
/// ```
pub struct EventLoopBuilder {
    /// Maximum number of readiness events collected per poll.
    event_capacity: usize,
}

impl EventLoopBuilder {
    /// Creates a new `EventLoopBuilder` with default configuration.
    ///
    /// By default up to 64 readiness events are collected per poll.
    pub fn new() -> Self {
        Self { event_capacity: 64 }
    }

    /// Sets how many readiness events a single poll can report.
    ///
    /// Descriptors beyond this count stay ready and are reported by the
    /// next iteration.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn event_capacity(mut self, n: usize) -> Self {
        assert!(n > 0, "event_capacity must be > 0");

        self.event_capacity = n;
        self
    }

    /// Builds the event loop, creating the platform poller.
    pub fn build(self) -> Result<EventLoop> {
        EventLoop::with_capacity(self.event_capacity)
    }
}

impl Default for EventLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
