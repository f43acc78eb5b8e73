//! External process handling
//!
//! ffmpeg and wodim are both driven the same way: launch with a fixed
//! argument list, read combined stdout/stderr line by line, and stop the
//! child on request. This module is independent of the track/disc model.

mod lines;
mod runner;

pub use lines::LineSplitter;
pub use runner::{RunningProcess, Terminator, spawn};

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// An external command-line tool
///
/// `base_args` are placed before every invocation's own arguments, which
/// allows wrappers such as `pkexec wodim`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTool {
    name: String,
    program: PathBuf,
    base_args: Vec<OsString>,
}

impl ExternalTool {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    /// Find a tool by name, preferring an explicitly configured binary
    pub fn locate(name: &str, configured: Option<&Path>) -> Result<Self> {
        if let Some(path) = configured {
            if is_executable(path) {
                log::debug!("Using configured {} at {}", name, path.display());
                return Ok(Self::new(name, path));
            }
            log::warn!(
                "Configured {} at {} is not an executable file",
                name,
                path.display()
            );
            return Err(Error::ToolMissing {
                tool: name.to_string(),
            });
        }

        match find_on_path(name) {
            Some(path) => {
                log::debug!("Found {} at {}", name, path.display());
                Ok(Self::new(name, path))
            }
            None => Err(Error::ToolMissing {
                tool: name.to_string(),
            }),
        }
    }

    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.base_args = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        self
    }

    /// Short name used in logs and messages (e.g. "wodim")
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn base_args(&self) -> &[OsString] {
        &self.base_args
    }
}

/// Search `PATH` for an executable with the given name
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
