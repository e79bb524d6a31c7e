//! Bridge between native threads and a managed runtime
//!
//! On Android the engine runs inside the application's JVM, and any native
//! thread calling into it must first be attached to that VM. Elsewhere there
//! is no managed runtime and [`NoOpBridge`] stands in, so callers can wrap
//! managed-touching calls in an attach scope without checking the platform.

mod attach_state;
#[cfg(target_os = "android")]
mod jni_runtime;
mod managed;

pub use attach_state::AttachState;
#[cfg(target_os = "android")]
pub use jni_runtime::JniRuntime;
pub use managed::{ManagedBridge, ManagedRuntime, StaticCallError};

use crate::errors::{AttachError, CleanupError, ImbalanceError};

/// Attach/detach and shutdown for the calling thread's managed runtime
///
/// Every successful `attach` must be paired with exactly one `detach`;
/// [`AttachGuard`] does the pairing automatically.
pub trait RuntimeBridge: Send + Sync {
    fn attach(&self) -> Result<(), AttachError>;

    fn detach(&self) -> Result<(), ImbalanceError>;

    /// Invoke the managed-side shutdown routine
    fn cleanup(&self) -> Result<(), CleanupError>;

    /// Whether a managed environment binding is currently live
    fn is_attached(&self) -> bool;
}

/// Bridge for platforms without a managed runtime
///
/// Every operation succeeds and has no effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpBridge;

impl RuntimeBridge for NoOpBridge {
    fn attach(&self) -> Result<(), AttachError> {
        Ok(())
    }

    fn detach(&self) -> Result<(), ImbalanceError> {
        Ok(())
    }

    fn cleanup(&self) -> Result<(), CleanupError> {
        Ok(())
    }

    fn is_attached(&self) -> bool {
        false
    }
}

/// Scoped attach that detaches when dropped
#[must_use = "the thread is detached as soon as the guard is dropped"]
pub struct AttachGuard<'a> {
    bridge: &'a dyn RuntimeBridge,
}

impl<'a> AttachGuard<'a> {
    pub fn acquire(bridge: &'a dyn RuntimeBridge) -> Result<Self, AttachError> {
        bridge.attach()?;
        Ok(Self { bridge })
    }
}

impl Drop for AttachGuard<'_> {
    fn drop(&mut self) {
        let released = self.bridge.detach();
        debug_assert!(released.is_ok(), "attach guard released without a live attach");
    }
}
