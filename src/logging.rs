//! Logging setup
//!
//! Everything goes through the `log` facade. The binary sends it to the
//! terminal and, when possible, to
//! `<data_local_dir>/AudioCD-Splitter/logs/audiocd-splitter.log`,
//! which is the file to attach to bug reports.

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "AudioCD-Splitter";
const LOG_FILE: &str = "audiocd-splitter.log";

/// Logs above this size are moved aside at startup
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

pub fn log_directory() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join(APP_DIR).join("logs"))
}

pub fn log_file_path() -> Option<PathBuf> {
    log_directory().map(|d| d.join(LOG_FILE))
}

/// Move `path` to `<path>.old` if it has grown past `limit` bytes
///
/// Returns whether the file was rotated.
pub fn rotate_if_larger(path: &Path, limit: u64) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() > limit => {
            let mut backup = path.as_os_str().to_os_string();
            backup.push(".old");
            fs::rename(path, PathBuf::from(backup))?;
            Ok(true)
        }
        Ok(_) => Ok(false),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn log_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build()
}

/// Start terminal and file logging
///
/// The terminal shows info and above (debug with `verbose`); the file
/// always gets debug. Falls back to the terminal alone if the log file
/// can't be opened. Returns the log file path when file logging is active.
pub fn init_logging(verbose: bool) -> Option<PathBuf> {
    let term_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_path = match open_log_file() {
        Ok((path, file)) => {
            let loggers: Vec<Box<dyn SharedLogger>> = vec![
                TermLogger::new(
                    term_level,
                    log_config(),
                    TerminalMode::Stderr,
                    ColorChoice::Auto,
                ),
                WriteLogger::new(LevelFilter::Debug, log_config(), file),
            ];
            if CombinedLogger::init(loggers).is_err() {
                eprintln!("Warning: Logger already initialized");
            }
            Some(path)
        }
        Err(e) => {
            eprintln!("Warning: File logging disabled: {}", e);
            init_terminal_only(term_level);
            None
        }
    };

    log::debug!("=== AudioCD Splitter {} started ===", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &log_path {
        log::debug!("Log file: {}", path.display());
    }
    log_path
}

fn open_log_file() -> io::Result<(PathBuf, fs::File)> {
    let dir = log_directory().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "could not determine log directory")
    })?;
    fs::create_dir_all(&dir)?;

    let path = dir.join(LOG_FILE);
    if let Err(e) = rotate_if_larger(&path, MAX_LOG_BYTES) {
        eprintln!("Warning: Could not rotate {}: {}", path.display(), e);
    }

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

fn init_terminal_only(level: LevelFilter) {
    let term_logger = TermLogger::new(level, log_config(), TerminalMode::Stderr, ColorChoice::Auto);
    let _ = CombinedLogger::init(vec![term_logger]);
}
