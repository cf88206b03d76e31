//! The outer event loop.
//!
//! A small single-threaded readiness loop used to host the bridge. It is
//! responsible for:
//! - arming and disarming descriptor watches in the platform poller,
//! - running before-poll and after-poll hooks every iteration,
//! - delivering readiness to the hook that armed each watch.
//!
//! Hosts that already own a loop do not need this module: the bridge only
//! relies on the [`Arm`] capability and can be driven step by step.

mod builder;
mod core;
mod event;
mod hook;
mod watch;

pub(crate) mod poller;

pub use builder::EventLoopBuilder;
pub use self::core::EventLoop;
pub use event::Readiness;
pub use hook::{Hook, HookContext, HookId};
pub use poller::common::Interest;
pub use watch::{Arm, LoopHandle, Watch};
