use super::{AttachGuard, AttachState, RuntimeBridge};
use crate::errors::{AttachError, CleanupError, ImbalanceError};
use libbridge_config::ManagedEntryPoint;
use libbridge_logger as logger;
use thiserror::Error;

/// Failure to reach a static managed method
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StaticCallError {
    /// The calling thread has no environment in the runtime
    #[error("calling thread is not attached to the managed runtime: {0}")]
    Detached(String),

    /// The class or the method could not be found
    #[error("{0}")]
    NotFound(String),
}

/// Foreign-function capabilities of a managed runtime
///
/// Implementations operate on the calling thread. `attach_current_thread`
/// and `detach_current_thread` are only called by [`ManagedBridge`] on the
/// 0→1 and 1→0 transitions of its attach count.
pub trait ManagedRuntime: Send + Sync {
    /// Register the calling thread with the runtime
    fn attach_current_thread(&self) -> Result<(), String>;

    /// Unregister the calling thread
    fn detach_current_thread(&self);

    /// Read and clear the pending managed exception, returning its description
    fn take_pending_exception(&self) -> Option<String>;

    /// Look up a static `void` method and invoke it
    ///
    /// Failing to find the class or the method is
    /// [`StaticCallError::NotFound`]. An exception thrown by the method
    /// itself is left pending for the caller.
    fn call_static_void(&self, entry: &ManagedEntryPoint) -> Result<(), StaticCallError>;
}

/// Reference-counted bridge over a [`ManagedRuntime`]
pub struct ManagedBridge<R> {
    runtime: R,
    state: AttachState,
    cleanup_entry: ManagedEntryPoint,
}

impl<R: ManagedRuntime> ManagedBridge<R> {
    pub fn new(runtime: R, cleanup_entry: ManagedEntryPoint) -> Self {
        Self {
            runtime,
            state: AttachState::new(),
            cleanup_entry,
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Number of outstanding attach requests
    pub fn attach_count(&self) -> usize {
        self.state.count()
    }

    fn log_pending_exception(&self, context: &str) {
        if let Some(description) = self.runtime.take_pending_exception() {
            logger::managed_error(&format!("{}: {}", context, description));
        }
    }
}

impl<R: ManagedRuntime> RuntimeBridge for ManagedBridge<R> {
    fn attach(&self) -> Result<(), AttachError> {
        self.state.acquire(|| {
            logger::debug("Attaching thread to the managed runtime");
            self.runtime.attach_current_thread().map_err(AttachError)
        })
    }

    fn detach(&self) -> Result<(), ImbalanceError> {
        self.state
            .release(|| {
                // A pending exception would otherwise surface in the next attach cycle
                self.log_pending_exception("Exception pending at detach");
                logger::debug("Detaching thread from the managed runtime");
                self.runtime.detach_current_thread();
            })
            .inspect_err(|e| logger::error(&e.to_string()))
    }

    fn cleanup(&self) -> Result<(), CleanupError> {
        let _scope = AttachGuard::acquire(self)?;
        let entry = &self.cleanup_entry;

        logger::debug(&format!(
            "Invoking managed shutdown {}.{}{}",
            entry.class, entry.method, entry.signature
        ));
        self.runtime
            .call_static_void(entry)
            .map_err(|e| match e {
                StaticCallError::Detached(message) => CleanupError::Attach(AttachError(message)),
                StaticCallError::NotFound(message) => CleanupError::EntryPointNotFound {
                    class: entry.class.clone(),
                    method: entry.method.clone(),
                    message,
                },
            })?;

        self.log_pending_exception(&format!("{}.{} raised", entry.class, entry.method));
        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.state.is_attached()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeRuntime {
        attaches: AtomicUsize,
        detaches: AtomicUsize,
        calls: AtomicUsize,
        refuse_attach: AtomicBool,
        throw_on_call: AtomicBool,
        env_missing: AtomicBool,
        classes: Mutex<Vec<String>>,
        pending: Mutex<Option<String>>,
    }

    impl FakeRuntime {
        fn with_class(class: &str) -> Self {
            let runtime = Self::default();
            runtime.classes.lock().push(class.to_string());
            runtime
        }
    }

    impl ManagedRuntime for FakeRuntime {
        fn attach_current_thread(&self) -> Result<(), String> {
            if self.refuse_attach.load(Ordering::SeqCst) {
                return Err("JNI_ERR".to_string());
            }
            self.attaches.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn detach_current_thread(&self) {
            self.detaches.fetch_add(1, Ordering::SeqCst);
        }

        fn take_pending_exception(&self) -> Option<String> {
            self.pending.lock().take()
        }

        fn call_static_void(&self, entry: &ManagedEntryPoint) -> Result<(), StaticCallError> {
            if self.env_missing.load(Ordering::SeqCst) {
                return Err(StaticCallError::Detached("JNI_EDETACHED".to_string()));
            }
            if !self.classes.lock().contains(&entry.class) {
                return Err(StaticCallError::NotFound(format!(
                    "java.lang.ClassNotFoundException: {}",
                    entry.class
                )));
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.throw_on_call.load(Ordering::SeqCst) {
                *self.pending.lock() = Some("java.lang.IllegalStateException".to_string());
            }
            Ok(())
        }
    }

    fn bridge(runtime: FakeRuntime) -> ManagedBridge<FakeRuntime> {
        ManagedBridge::new(runtime, ManagedEntryPoint::default())
    }

    #[test]
    fn test_nested_attach_hits_runtime_once() {
        let bridge = bridge(FakeRuntime::default());
        for _ in 0..5 {
            bridge.attach().unwrap();
        }
        assert!(bridge.is_attached());
        for _ in 0..5 {
            bridge.detach().unwrap();
        }

        assert!(!bridge.is_attached());
        assert_eq!(bridge.runtime().attaches.load(Ordering::SeqCst), 1);
        assert_eq!(bridge.runtime().detaches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detach_when_detached_is_imbalance() {
        let bridge = bridge(FakeRuntime::default());
        assert_eq!(bridge.detach(), Err(ImbalanceError));
        assert_eq!(bridge.attach_count(), 0);
        assert_eq!(bridge.runtime().detaches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_attach_does_not_count() {
        let runtime = FakeRuntime::default();
        runtime.refuse_attach.store(true, Ordering::SeqCst);
        let bridge = bridge(runtime);

        let err = bridge.attach().unwrap_err();
        assert_eq!(err, AttachError("JNI_ERR".to_string()));
        assert_eq!(bridge.attach_count(), 0);

        bridge.runtime().refuse_attach.store(false, Ordering::SeqCst);
        bridge.attach().unwrap();
        bridge.detach().unwrap();
        assert_eq!(bridge.runtime().attaches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pending_exception_cleared_before_detach() {
        let bridge = bridge(FakeRuntime::default());
        bridge.attach().unwrap();
        *bridge.runtime().pending.lock() = Some("java.lang.RuntimeException".to_string());
        bridge.detach().unwrap();
        assert!(bridge.runtime().pending.lock().is_none());
    }

    #[test]
    fn test_concurrent_attach_detach() {
        let bridge = Arc::new(bridge(FakeRuntime::default()));
        let threads: Vec<_> = (0..10)
            .map(|_| {
                let bridge = Arc::clone(&bridge);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        bridge.attach().unwrap();
                        bridge.detach().unwrap();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(bridge.attach_count(), 0);
        let attaches = bridge.runtime().attaches.load(Ordering::SeqCst);
        let detaches = bridge.runtime().detaches.load(Ordering::SeqCst);
        assert!(attaches >= 1);
        assert_eq!(attaches, detaches);
    }

    #[test]
    fn test_cleanup_without_library_is_lookup_failure() {
        let bridge = bridge(FakeRuntime::default());
        let err = bridge.cleanup().unwrap_err();
        assert!(matches!(err, CleanupError::EntryPointNotFound { ref class, .. } if class == "org.fmod.FMOD"));
        assert_eq!(bridge.attach_count(), 0);
        assert_eq!(bridge.runtime().detaches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cleanup_invokes_entry_point_once() {
        let bridge = bridge(FakeRuntime::with_class("org.fmod.FMOD"));
        bridge.cleanup().unwrap();
        assert_eq!(bridge.runtime().calls.load(Ordering::SeqCst), 1);
        assert!(!bridge.is_attached());
    }

    #[test]
    fn test_cleanup_exception_is_logged_and_cleared() {
        let runtime = FakeRuntime::with_class("org.fmod.FMOD");
        runtime.throw_on_call.store(true, Ordering::SeqCst);
        let bridge = bridge(runtime);

        assert!(bridge.cleanup().is_ok());
        assert!(bridge.runtime().pending.lock().is_none());
    }

    #[test]
    fn test_cleanup_inside_outer_attach_keeps_binding() {
        let bridge = bridge(FakeRuntime::with_class("org.fmod.FMOD"));
        bridge.attach().unwrap();
        bridge.cleanup().unwrap();
        assert!(bridge.is_attached());
        assert_eq!(bridge.runtime().detaches.load(Ordering::SeqCst), 0);
        bridge.detach().unwrap();
        assert_eq!(bridge.runtime().detaches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cleanup_on_unregistered_thread_is_attach_error() {
        let runtime = FakeRuntime::with_class("org.fmod.FMOD");
        runtime.env_missing.store(true, Ordering::SeqCst);
        let bridge = bridge(runtime);

        match bridge.cleanup() {
            Err(CleanupError::Attach(AttachError(message))) => {
                assert!(message.contains("JNI_EDETACHED"));
            }
            other => panic!("expected an attach error, got {other:?}"),
        }
        assert_eq!(bridge.runtime().calls.load(Ordering::SeqCst), 0);
        assert!(!bridge.is_attached());
    }

    #[test]
    fn test_cleanup_reports_attach_failure() {
        let runtime = FakeRuntime::with_class("org.fmod.FMOD");
        runtime.refuse_attach.store(true, Ordering::SeqCst);
        let bridge = bridge(runtime);
        assert!(matches!(bridge.cleanup(), Err(CleanupError::Attach(_))));
    }
}
