//! Dynamic library loading
//!
//! Opens a shared library with dlopen (Unix) or LoadLibrary (Windows) and
//! hands the caller a [`LibraryHandle`]. Symbol lookup is left to the caller
//! through [`LibraryHandle::library`].
#![expect(
    unsafe_code,
    reason = "loading a shared library runs its initializers across an FFI boundary"
)]

use crate::errors::LoadError;
use crate::search_path::SearchPath;
use libbridge_logger as logger;
use libloading::Library;
use std::path::{Path, PathBuf};

/// A loaded shared library
///
/// `close` consumes the handle, so a handle cannot be used or closed again
/// once it has been released. Dropping a handle without closing it also
/// unloads the library.
pub struct LibraryHandle {
    library: Library,
    path: PathBuf,
}

impl LibraryHandle {
    /// Path the library was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying loader handle, for resolving symbols
    pub fn library(&self) -> &Library {
        &self.library
    }
}

impl std::fmt::Debug for LibraryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryHandle")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Open `filename` from the directory `dir`
pub fn open(dir: &SearchPath, filename: &str) -> Result<LibraryHandle, LoadError> {
    open_path(&dir.join(filename))
}

/// Open a shared library by its full path
///
/// On Unix this uses RTLD_NOW | RTLD_GLOBAL so that a library loaded later
/// (the secondary engine) can bind to symbols exported by this one.
pub fn open_path(lib_path: &Path) -> Result<LibraryHandle, LoadError> {
    if !lib_path.exists() {
        return Err(LoadError::NotFound(lib_path.display().to_string()));
    }

    logger::debug(&format!("Loading shared library: {}", lib_path.display()));

    #[cfg(unix)]
    let library = load_unix(lib_path)?;

    #[cfg(windows)]
    let library = load_windows(lib_path)?;

    logger::debug(&format!("Loaded {}", lib_path.display()));

    Ok(LibraryHandle {
        library,
        path: lib_path.to_path_buf(),
    })
}

/// Unload a library
pub fn close(handle: LibraryHandle) -> Result<(), LoadError> {
    let LibraryHandle { library, path } = handle;
    logger::debug(&format!("Unloading shared library: {}", path.display()));
    library
        .close()
        .map_err(|e| LoadError::CloseFailed(format!("{}: {}", path.display(), e)))
}

#[cfg(unix)]
fn load_unix(lib_path: &Path) -> Result<Library, LoadError> {
    use libloading::os::unix::Library as UnixLibrary;

    // RTLD_NOW: resolve all symbols immediately so a broken library fails here
    // RTLD_GLOBAL: make symbols available to subsequently loaded libraries
    let flags = libc::RTLD_NOW | libc::RTLD_GLOBAL;

    // SAFETY: the library's initializers run on load. The engine libraries
    // have no load-time preconditions beyond being loaded once per handle.
    let library = unsafe { UnixLibrary::open(Some(lib_path), flags) }
        .map_err(|e| LoadError::LoadFailed(format!("{}: {}", lib_path.display(), e)))?;

    Ok(library.into())
}

#[cfg(windows)]
fn load_windows(lib_path: &Path) -> Result<Library, LoadError> {
    // Dependent DLLs (the secondary engine needs the primary) are searched
    // for in the library's own directory.
    if let Some(parent) = lib_path.parent() {
        use std::os::windows::ffi::OsStrExt;
        let wide: Vec<u16> = parent
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        extern "system" {
            fn SetDllDirectoryW(lpPathName: *const u16) -> i32;
        }
        // SAFETY: `wide` is a NUL-terminated UTF-16 string that outlives the call.
        if unsafe { SetDllDirectoryW(wide.as_ptr()) } == 0 {
            logger::warn(&format!(
                "Failed to add {} to the DLL search path",
                parent.display()
            ));
        }
    }

    // SAFETY: see `load_unix`.
    unsafe { Library::new(lib_path) }
        .map_err(|e| LoadError::LoadFailed(format!("{}: {}", lib_path.display(), e)))
}
