//! Startup and shutdown of the engine libraries
//!
//! Startup resolves the library directory, then opens the primary engine
//! followed by the secondary engine that links against it. Shutdown runs the
//! managed-side cleanup first, then closes the libraries in reverse order.

use crate::errors::{AttachError, BridgeError};
use crate::library_loader::LibraryHandle;
use crate::registry::{LibraryId, LibraryRegistry};
use crate::runtime_bridge::{AttachGuard, RuntimeBridge};
use crate::search_path::{library_file_name, resolve_library_directory, SearchPath};
use libbridge_config::Config;
use libbridge_logger as logger;

pub struct EngineLibraries {
    directory: SearchPath,
    registry: LibraryRegistry,
    bridge: Box<dyn RuntimeBridge>,
}

impl EngineLibraries {
    /// Open both engine libraries described by `config`
    ///
    /// The config's `library_dir` wins over the executable's directory. If
    /// the secondary library fails to open, the primary is closed again
    /// before the error is returned.
    pub fn load(config: &Config, bridge: Box<dyn RuntimeBridge>) -> Result<Self, BridgeError> {
        let start_time = std::time::Instant::now();

        let directory = match config.library_dir_override() {
            Some(dir) => {
                logger::debug(&format!("Using configured library directory: {}", dir.display()));
                SearchPath::new(dir)
            }
            None => resolve_library_directory()?,
        };

        let mut registry = LibraryRegistry::new();
        for id in LibraryId::ALL {
            let filename = library_file_name(base_name(config, id));
            if let Err(e) = registry.open(id, &directory, &filename) {
                logger::error(&format!("Failed to open {} library: {}", id, e));
                if let Err(close_err) = registry.close_all() {
                    logger::warn(&format!("Rollback after failed load: {}", close_err));
                }
                return Err(e.into());
            }
        }

        logger::debug(&format!(
            "Engine libraries loaded from {} in {:?}",
            directory,
            start_time.elapsed()
        ));

        Ok(Self {
            directory,
            registry,
            bridge,
        })
    }

    /// Load using the config file and log verbosity it specifies
    ///
    /// Only available where there is no managed runtime to attach to.
    #[cfg(not(target_os = "android"))]
    pub fn load_default() -> Result<Self, BridgeError> {
        let config = Config::load()?;
        logger::set_verbosity(config.verbosity);
        Self::load(&config, Box::new(crate::runtime_bridge::NoOpBridge))
    }

    pub fn directory(&self) -> &SearchPath {
        &self.directory
    }

    pub fn handle(&self, id: LibraryId) -> Option<&LibraryHandle> {
        self.registry.get(id)
    }

    pub fn bridge(&self) -> &dyn RuntimeBridge {
        self.bridge.as_ref()
    }

    /// Attach the calling thread for the lifetime of the returned guard
    pub fn attach_scope(&self) -> Result<AttachGuard<'_>, AttachError> {
        AttachGuard::acquire(self.bridge.as_ref())
    }

    /// Run the managed cleanup routine and close both libraries
    ///
    /// Cleanup failures do not stop the libraries from being closed. A close
    /// error is reported in preference to a cleanup error.
    pub fn shutdown(mut self) -> Result<(), BridgeError> {
        let cleanup = self.bridge.cleanup();
        if let Err(ref e) = cleanup {
            logger::error(&format!("Managed cleanup failed: {}", e));
        }

        self.registry.close_all()?;
        cleanup?;
        logger::debug("Engine libraries shut down");
        Ok(())
    }
}

fn base_name(config: &Config, id: LibraryId) -> &str {
    match id {
        LibraryId::Primary => &config.libraries.primary,
        LibraryId::Secondary => &config.libraries.secondary,
    }
}
