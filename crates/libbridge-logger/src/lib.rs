//! Process-wide logging for libbridge
//!
//! Messages always go to the log file once one is configured, and to stderr
//! depending on the verbosity level. Errors raised inside the managed runtime
//! are tagged `MANAGED` so they can be told apart from native-side messages.

use colored::Colorize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const LOG_FILE_NAME: &str = "libbridge.log";

static LOG_FILE: Mutex<Option<PathBuf>> = Mutex::new(None);
static VERBOSITY: Mutex<u8> = Mutex::new(0);
static NO_STDERR: Mutex<bool> = Mutex::new(false);

/// Get the current verbosity level
pub fn get_verbosity() -> u8 {
    VERBOSITY.lock().ok().map(|v| *v).unwrap_or(0)
}

/// Set the verbosity level (0 = warnings and errors, 1 or more = debug)
pub fn set_verbosity(verbosity: u8) {
    if let Ok(mut v) = VERBOSITY.lock() {
        *v = verbosity;
    }
}

/// Get whether console output is suppressed
pub fn get_no_stderr() -> bool {
    NO_STDERR.lock().ok().map(|v| *v).unwrap_or(false)
}

/// Suppress console output; the log file is still written
pub fn set_no_stderr(disabled: bool) {
    if let Ok(mut v) = NO_STDERR.lock() {
        *v = disabled;
    }
}

/// Initialize the logger in the user config directory with a verbosity level
pub fn init_with_verbosity(verbosity: u8, no_stderr: bool) -> Result<(), String> {
    set_verbosity(verbosity);
    set_no_stderr(no_stderr);

    let config_dir = get_config_dir()?;
    init_with_log_file(&config_dir.join(LOG_FILE_NAME))
}

/// Initialize the logger with an explicit log file path
///
/// The file is truncated so each process run starts a fresh log.
pub fn init_with_log_file(log_file: &Path) -> Result<(), String> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create log directory: {}", e))?;
    }

    if log_file.exists() {
        let _ = fs::remove_file(log_file);
    }

    let mut log_file_guard = LOG_FILE
        .lock()
        .map_err(|_| "Log file state is poisoned".to_string())?;
    *log_file_guard = Some(log_file.to_path_buf());

    Ok(())
}

fn get_config_dir() -> Result<PathBuf, String> {
    #[cfg(not(target_os = "windows"))]
    let config_dir = dirs::home_dir()
        .ok_or("Could not determine home directory")?
        .join(".config")
        .join("libbridge");

    #[cfg(target_os = "windows")]
    let config_dir = dirs::config_dir()
        .ok_or("Could not determine config directory")?
        .join("libbridge");

    Ok(config_dir)
}

fn write_to_log(message: &str) {
    write_to_log_with_source(message, "NATIVE")
}

fn write_to_log_with_source(message: &str, source: &str) {
    if let Ok(log_file_guard) = LOG_FILE.lock() {
        if let Some(ref log_path) = *log_file_guard {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_path) {
                let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
                let _ = writeln!(file, "[{}] [{}] {}", timestamp, source, message);
            }
        }
    }
}

fn console(line: std::fmt::Arguments<'_>) {
    if !get_no_stderr() {
        eprintln!("{}", line);
    }
}

/// Log an informational message (to console if verbose >= 1, always to file)
pub fn info(message: &str) {
    write_to_log(&format!("INFO {}", message));
    if get_verbosity() >= 1 {
        console(format_args!("{}", message));
    }
}

/// Log a debug message (to console if verbose >= 1, always to file)
pub fn debug(message: &str) {
    write_to_log(&format!("DEBUG {}", message));
    if get_verbosity() >= 1 {
        console(format_args!("{} {}", "DEBUG:".blue().bold(), message));
    }
}

/// Log a warning message (to both file and console)
pub fn warn(message: &str) {
    write_to_log(&format!("WARN {}", message));
    console(format_args!("{} {}", "warning:".yellow().bold(), message));
}

/// Log an error message (to both file and console)
pub fn error(message: &str) {
    write_to_log(&format!("ERROR {}", message));
    console(format_args!("{} {}", "Error:".red().bold(), message));
}

/// Log an error reported by the managed runtime (to both file and console)
pub fn managed_error(message: &str) {
    write_to_log_with_source(&format!("ERROR {}", message), "MANAGED");
    console(format_args!("{} {}", "Managed error:".red().bold(), message));
}

/// Get the log file path for display
pub fn get_log_path() -> Option<PathBuf> {
    LOG_FILE.lock().ok().and_then(|guard| guard.clone())
}
