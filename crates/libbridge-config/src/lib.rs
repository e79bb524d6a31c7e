//! Configuration for libbridge
//!
//! The configuration is a small TOML file. Its location is taken from the
//! `LIBBRIDGE_CONFIG` environment variable when set, otherwise from
//! `<config dir>/libbridge/config.toml`. A missing file is not an error: every
//! field has a default matching the stock engine layout.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "LIBBRIDGE_CONFIG";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors while reading or writing the config file
#[derive(Debug)]
pub enum ConfigError {
    /// Neither the env override nor a platform config dir is available
    NoConfigDir,
    Io(PathBuf, io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoConfigDir => write!(f, "Could not determine config directory"),
            ConfigError::Io(path, e) => write!(f, "Config I/O error at {}: {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Failed to parse config {}: {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Failed to serialize config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(_, e) => Some(e),
            ConfigError::Parse(_, e) => Some(e),
            ConfigError::Serialize(e) => Some(e),
            ConfigError::NoConfigDir => None,
        }
    }
}

/// Base names of the two engine libraries
///
/// These are platform-neutral: `fmod` becomes `libfmod.so`, `libfmod.dylib`
/// or `fmod.dll` when the file name is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryNames {
    pub primary: String,
    pub secondary: String,
}

impl Default for LibraryNames {
    fn default() -> Self {
        Self {
            primary: "fmod".to_string(),
            secondary: "fmodstudio".to_string(),
        }
    }
}

/// Static managed-side routine invoked at shutdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagedEntryPoint {
    /// Fully-qualified class name, dot separated
    pub class: String,
    pub method: String,
    /// JNI type signature of the method
    pub signature: String,
}

impl Default for ManagedEntryPoint {
    fn default() -> Self {
        Self {
            class: "org.fmod.FMOD".to_string(),
            method: "close".to_string(),
            signature: "()V".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory to load libraries from instead of the executable's directory
    pub library_dir: Option<String>,
    pub verbosity: u8,
    pub libraries: LibraryNames,
    pub cleanup: ManagedEntryPoint,

    /// Where this config was loaded from, used by `save`
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Config {
    /// Load the config from the default location, or defaults if absent
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;
        Self::load_from(&path)
    }

    /// Load the config from an explicit path, or defaults if absent
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents =
                fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
            toml::from_str::<Config>(&contents)
                .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?
        } else {
            Config::default()
        };
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Write the config back to where it was loaded from
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => config_path()?,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io(parent.to_path_buf(), e))?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(&path, contents).map_err(|e| ConfigError::Io(path.clone(), e))
    }

    /// The configured library directory override, if any
    pub fn library_dir_override(&self) -> Option<PathBuf> {
        self.library_dir
            .as_deref()
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Path this config was loaded from
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Resolve the config file location
pub fn config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("libbridge").join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.libraries.primary, "fmod");
        assert_eq!(config.libraries.secondary, "fmodstudio");
        assert_eq!(config.cleanup.class, "org.fmod.FMOD");
        assert_eq!(config.library_dir_override(), None);
        assert_eq!(config.path(), Some(path.as_path()));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "library_dir = \"/app/bin/mygame\"\n\n[libraries]\nprimary = \"engine\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.libraries.primary, "engine");
        assert_eq!(config.libraries.secondary, "fmodstudio");
        assert_eq!(
            config.library_dir_override(),
            Some(PathBuf::from("/app/bin/mygame"))
        );
    }

    #[test]
    fn test_blank_library_dir_is_ignored() {
        let config = Config {
            library_dir: Some("  ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.library_dir_override(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::load_from(&path).unwrap();
        config.verbosity = 2;
        config.cleanup.method = "shutdown".to_string();
        config.save().unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "verbosity = \"loud\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(..)));
        assert!(err.to_string().contains("broken.toml"));
    }
}
