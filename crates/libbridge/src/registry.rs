//! Registry of the engine library handles
//!
//! The process holds exactly two libraries: the primary (low-level) engine
//! and the secondary (studio) engine, which links against the primary. Each
//! slot is empty until opened and empty again after close.

use crate::errors::LoadError;
use crate::library_loader::{self, LibraryHandle};
use crate::search_path::SearchPath;
use libbridge_logger as logger;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryId {
    Primary,
    Secondary,
}

impl LibraryId {
    /// Load order; close order is the reverse
    pub const ALL: [LibraryId; 2] = [LibraryId::Primary, LibraryId::Secondary];

    fn slot(self) -> usize {
        match self {
            LibraryId::Primary => 0,
            LibraryId::Secondary => 1,
        }
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryId::Primary => write!(f, "primary"),
            LibraryId::Secondary => write!(f, "secondary"),
        }
    }
}

#[derive(Debug, Default)]
pub struct LibraryRegistry {
    handles: [Option<LibraryHandle>; 2],
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `filename` from `dir` into the slot for `id`
    pub fn open(
        &mut self,
        id: LibraryId,
        dir: &SearchPath,
        filename: &str,
    ) -> Result<&LibraryHandle, LoadError> {
        let slot = &mut self.handles[id.slot()];
        if slot.is_some() {
            return Err(LoadError::AlreadyOpen(id));
        }
        let handle = library_loader::open(dir, filename)?;
        logger::info(&format!("Opened {} library {}", id, handle.path().display()));
        Ok(slot.insert(handle))
    }

    pub fn get(&self, id: LibraryId) -> Option<&LibraryHandle> {
        self.handles[id.slot()].as_ref()
    }

    pub fn is_open(&self, id: LibraryId) -> bool {
        self.handles[id.slot()].is_some()
    }

    /// Close the library in the slot for `id`
    pub fn close(&mut self, id: LibraryId) -> Result<(), LoadError> {
        let handle = self.handles[id.slot()]
            .take()
            .ok_or(LoadError::NotOpen(id))?;
        library_loader::close(handle)
    }

    /// Close every open library, secondary first
    ///
    /// All slots are attempted even if one fails; the first error is returned.
    pub fn close_all(&mut self) -> Result<(), LoadError> {
        let mut first_error = None;
        for id in LibraryId::ALL.into_iter().rev() {
            if !self.is_open(id) {
                continue;
            }
            if let Err(e) = self.close(id) {
                logger::error(&format!("Failed to close {} library: {}", id, e));
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
