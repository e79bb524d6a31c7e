//! Library search path resolution
//!
//! Engine libraries ship next to the executable that uses them, so the search
//! directory is derived from the running binary's own location.
//!
//! # Platform differences
//!
//! - **Linux/Android**: the `/proc/self/exe` link
//! - **macOS**: `_NSGetExecutablePath`
//! - **Windows**: `GetModuleFileNameW` on the main module
//!
//! All three are reached through [`std::env::current_exe`]; the directory is
//! split off with [`Path::parent`], which knows each platform's separators.

use crate::errors::ResolutionError;
use libbridge_logger as logger;
use std::fmt;
use std::path::{Path, PathBuf};

/// File name prefix for shared libraries ("lib" on Unix, none on Windows)
#[cfg(windows)]
pub const LIBRARY_PREFIX: &str = "";
#[cfg(not(windows))]
pub const LIBRARY_PREFIX: &str = "lib";

/// File name extension for shared libraries
#[cfg(windows)]
pub const LIBRARY_SUFFIX: &str = ".dll";
#[cfg(target_vendor = "apple")]
pub const LIBRARY_SUFFIX: &str = ".dylib";
#[cfg(not(any(windows, target_vendor = "apple")))]
pub const LIBRARY_SUFFIX: &str = ".so";

/// A directory to search for shared libraries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath(PathBuf);

impl SearchPath {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self(dir.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Full path of `filename` inside this directory
    pub fn join(&self, filename: &str) -> PathBuf {
        self.0.join(filename)
    }
}

impl fmt::Display for SearchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for SearchPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Resolve the directory containing the running executable
///
/// The result is computed on every call; callers that need it repeatedly
/// should keep their own copy.
pub fn resolve_library_directory() -> Result<SearchPath, ResolutionError> {
    let exe = std::env::current_exe()?;
    let dir = library_directory_from(&exe)?;
    logger::debug(&format!("Resolved library directory: {}", dir));
    Ok(dir)
}

/// Strip the file name from an executable path
///
/// A path without any directory component is an error rather than an empty
/// directory.
pub fn library_directory_from(exe_path: &Path) -> Result<SearchPath, ResolutionError> {
    match exe_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => Ok(SearchPath(dir.to_path_buf())),
        _ => Err(ResolutionError::NoDirectory(exe_path.display().to_string())),
    }
}

/// Platform file name for a library base name
///
/// `fmod` becomes `libfmod.so` on Linux, `libfmod.dylib` on macOS and
/// `fmod.dll` on Windows.
pub fn library_file_name(base: &str) -> String {
    format!("{}{}{}", LIBRARY_PREFIX, base, LIBRARY_SUFFIX)
}
