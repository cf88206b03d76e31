//! # loopbridge
//!
//! **loopbridge** lets a process driven by one event loop also run a second,
//! foreign event loop on the same thread, without a helper thread and
//! without either loop blocking the other.
//!
//! The foreign (*inner*) loop only knows which descriptors it cares about
//! when asked; the host (*outer*) loop only watches descriptors it is told
//! about. Every outer iteration the bridge:
//!
//! - queries the inner loop for its descriptors and timeout,
//! - arms outer watches for new descriptors and disarms the ones no longer
//!   wanted, keeping watches that are still wanted untouched,
//! - translates outer readiness into the inner loop's conditions,
//! - lets the inner loop check its sources and dispatch callbacks.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use loopbridge::context::{IoCondition, MainContext, PRIORITY_DEFAULT};
//! use loopbridge::{EventLoop, attach};
//! use std::ops::ControlFlow;
//!
//! let mut event_loop = EventLoop::new()?;
//! let context = MainContext::new();
//!
//! let stop = event_loop.handle();
//! context.add_fd(reader_fd, IoCondition::IN, PRIORITY_DEFAULT, move |_| {
//!     stop.stop();
//!     ControlFlow::Break(())
//! });
//!
//! attach(&mut event_loop, context.clone())?;
//! event_loop.run()?;
//! ```
//!
//! ## Modules
//!
//! - [`bridge`]: Discovery, reconciliation, readiness translation, dispatch
//! - [`context`]: The inner loop contract and a ready-made [`MainContext`](context::MainContext)
//! - [`reactor`]: A small outer loop with before/after-poll hooks

mod error;
mod utils;

pub mod bridge;
pub mod context;
pub mod reactor;

pub use bridge::{Bridge, BridgeBuilder, Discovery, Registration, attach, detach, translate};
pub use error::{Error, Result};
pub use reactor::{
    Arm, EventLoop, EventLoopBuilder, Hook, HookContext, HookId, Interest, LoopHandle, Readiness,
    Watch,
};
