use std::path::PathBuf;
use std::result;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Disc capacity must be a positive number of minutes, got {0}")]
    InvalidCapacity(f64),

    #[error("Invalid track {path}: {reason}")]
    InvalidTrack { path: PathBuf, reason: String },

    #[error("{tool} isn't installed or could not be found on PATH")]
    ToolMissing { tool: String },

    #[error("Failed to start {tool}: {source}")]
    ToolStart {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} did not finish within {timeout:?}")]
    Timeout { tool: String, timeout: Duration },

    #[error("Could not read metadata from {path}: {reason}")]
    Metadata { path: PathBuf, reason: String },

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = result::Result<T, Error>;
