//! Platform-specific I/O poller abstraction.
//!
//! This module provides a unified interface over platform-specific
//! readiness primitives. The event loop uses it to:
//! - add and remove descriptor watches,
//! - block until a watched descriptor is ready or a timeout expires.
//!
//! The concrete implementation is selected at compile time
//! depending on the target operating system.

pub(crate) mod common;

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(all(unix, not(target_os = "linux")))]
mod poll;

#[cfg(target_os = "linux")]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(all(unix, not(target_os = "linux")))]
pub(crate) type Poller = poll::PollPoller;
