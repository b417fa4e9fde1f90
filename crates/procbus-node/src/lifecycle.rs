//! Lifecycle capability set consumed from registered components.
//!
//! A component may implement any subset. Lifecycle capabilities are tracked
//! separately from lookup keys and are never remotely invocable.

use async_trait::async_trait;
use procbus_common::{Result, ShutdownToken};

/// A component with asynchronous startup work.
///
/// All startables of a hub are started concurrently during
/// [`ComponentHub::initialize`](crate::ComponentHub::initialize); a single
/// failing start aborts initialization.
#[async_trait]
pub trait Startable: Send + Sync {
    async fn start(&self, shutdown: ShutdownToken) -> Result<()>;
}

/// Invoked once per external tick trigger, in registration order.
pub trait Tickable: Send + Sync {
    fn tick(&self);
}

/// Invoked once per external fixed-interval trigger, in registration order.
pub trait FixedTickable: Send + Sync {
    fn fixed_tick(&self);
}

/// A component holding resources that need explicit release.
///
/// Released in reverse registration order during hub shutdown; an
/// individual failure is logged and the teardown continues.
pub trait Releasable: Send + Sync {
    fn release(&self) -> Result<()>;
}
