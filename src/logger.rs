//! Session logger: routes `tracing` output to a single file in the OS data
//! directory.
//!
//! The file is **truncated (overwritten) at each launch**, so it only ever
//! contains output from the most-recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\PixelForge\pixelforge.log`
//!   Linux:    `~/.local/share/PixelForge/pixelforge.log`
//!   macOS:    `~/Library/Application Support/PixelForge/pixelforge.log`
//!
//! Log with the ordinary `tracing` macros anywhere in the crate.  `RUST_LOG`
//! overrides the configured level when set.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_subscriber::EnvFilter;

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialise the session logger at the default location.
pub fn init(level: &str) {
    init_at(&log_file_path(), level);
}

/// Initialise the session logger writing to `path`.
///
/// * Creates (or truncates) the log file.
/// * Installs a panic hook that records the panic in the log before
///   propagating to the default handler.
///
/// Failing to open the file is not fatal; logging is simply disabled.
pub fn init_at(path: &Path, level: &str) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    // Open file, truncating any previous session's content
    let file = match OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            return;
        }
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init();
    if installed.is_err() {
        // Another subscriber is already active (tests, embedding apps)
        return;
    }

    tracing::info!("=== PixelForge session started {} ===", human_timestamp());
    tracing::info!("Log file: {}", path.display());

    install_panic_hook();
}

/// Log to stderr instead of a file (CLI `--verbose`).
pub fn init_stderr(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    install_panic_hook();
}

fn install_panic_hook() {
    // Mirrors panic info to the log, then runs the default handler
    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC: {}", info);
        prev(info);
    }));
}

fn log_file_path() -> PathBuf {
    data_dir().join("PixelForge").join("pixelforge.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    // Linux / fallback
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort: current working directory
    PathBuf::from(".")
}

/// Human-readable date-time for the session header.
fn human_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("(unix {})", d.as_secs()),
        Err(_) => "(unknown time)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_path_layout() {
        let path = log_file_path();
        assert!(path.ends_with(Path::new("PixelForge").join("pixelforge.log")));
    }

    #[test]
    fn test_env_filter_accepts_directives() {
        // Invalid directives are dropped rather than panicking.
        let _ = env_filter("pixelforge=debug,warn");
        let _ = env_filter("not a [valid directive");
    }
}
