//! Runtime loading of native engine libraries
//!
//! This crate provides:
//! 1. Resolution of the library directory next to the running executable
//! 2. Opening and closing of the primary and secondary engine libraries
//! 3. Reference-counted attach/detach of native threads to a managed runtime
//!    (the Android JVM), with a no-op stand-in on other platforms
//!
//! Symbol lookup is left to the caller through [`LibraryHandle::library`].

pub mod engine;
pub mod errors;
pub mod library_loader;
pub mod registry;
pub mod runtime_bridge;
pub mod search_path;

pub use engine::EngineLibraries;
pub use errors::{
    AttachError, BridgeError, CleanupError, ImbalanceError, LoadError, ResolutionError,
};
pub use library_loader::{close, open, LibraryHandle};
pub use registry::{LibraryId, LibraryRegistry};
pub use runtime_bridge::{AttachGuard, ManagedBridge, ManagedRuntime, NoOpBridge, RuntimeBridge};
pub use search_path::{library_file_name, resolve_library_directory, SearchPath};
