use crate::registry::LibraryId;
use std::io;
use thiserror::Error;

/// The running executable's directory could not be determined
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Failed to query the running executable's path: {0}")]
    ExecutablePath(#[from] io::Error),

    #[error("Executable path has no directory component: {0}")]
    NoDirectory(String),
}

/// Errors while opening or closing a shared library
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Library not found: {0}")]
    NotFound(String),

    #[error("Failed to load library {0}")]
    LoadFailed(String),

    #[error("Failed to unload library {0}")]
    CloseFailed(String),

    #[error("{0} library is already open")]
    AlreadyOpen(LibraryId),

    #[error("{0} library is not open")]
    NotOpen(LibraryId),
}

/// The calling thread could not be registered with the managed runtime
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to attach thread to the managed runtime: {0}")]
pub struct AttachError(pub String);

/// `detach` was called with no matching `attach`
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("detach called without a matching attach")]
pub struct ImbalanceError;

/// Errors while running the managed-side shutdown routine
#[derive(Error, Debug)]
pub enum CleanupError {
    #[error("Shutdown entry point {class}.{method} not found: {message}")]
    EntryPointNotFound {
        class: String,
        method: String,
        message: String,
    },

    #[error(transparent)]
    Attach(#[from] AttachError),
}

/// Top-level error for the load/shutdown orchestration
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Attach(#[from] AttachError),

    #[error(transparent)]
    Imbalance(#[from] ImbalanceError),

    #[error(transparent)]
    Cleanup(#[from] CleanupError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<libbridge_config::ConfigError> for BridgeError {
    fn from(err: libbridge_config::ConfigError) -> Self {
        BridgeError::Config(err.to_string())
    }
}
