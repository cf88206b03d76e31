use super::Bridge;
use super::discovery::FdBuffer;
use crate::context::InnerLoop;
use crate::error::{Error, Result};

use std::collections::HashMap;

/// Builder for configuring and creating a [`Bridge`].
///
/// # Examples
///
/// ```rust,ignore
/// let bridge: Bridge<MainContext> = BridgeBuilder::new()
///     .initial_capacity(16)
///     .build(context)?;
/// ```
pub struct BridgeBuilder {
    /// Descriptor slots allocated up front.
    initial_capacity: usize,
}

impl BridgeBuilder {
    /// Creates a new `BridgeBuilder` with default configuration.
    ///
    /// By default no descriptor slots are allocated; the buffer grows the
    /// first time the inner loop reports descriptors.
    pub fn new() -> Self {
        Self {
            initial_capacity: 0,
        }
    }

    /// Allocates room for `n` descriptors up front.
    pub fn initial_capacity(mut self, n: usize) -> Self {
        self.initial_capacity = n;
        self
    }

    /// Takes ownership of `context`, acquires it and builds the bridge.
    ///
    /// # Errors
    ///
    /// [`Error::AcquireFailed`] if the context is owned elsewhere,
    /// [`Error::ResourceExhausted`] if the initial buffer cannot be
    /// allocated.
    pub fn build<C: InnerLoop, W>(self, mut context: C) -> Result<Bridge<C, W>> {
        let buffer = FdBuffer::with_capacity(self.initial_capacity)?;

        if !context.acquire() {
            return Err(Error::AcquireFailed);
        }

        tracing::debug!(capacity = buffer.capacity(), "bridge initialized");

        Ok(Bridge {
            context,
            buffer,
            max_priority: i32::MAX,
            registrations: HashMap::new(),
        })
    }
}

impl Default for BridgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
