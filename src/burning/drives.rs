//! Drive discovery and media status via wodim

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use crate::error::Result;
use crate::process::{self, ExternalTool};

/// `wodim dev=<device> -atip` may spin up the drive
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEVICE_LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Checked in order when wodim lists no drives
pub const COMMON_DEVICE_PATHS: &[&str] = &["/dev/sr0", "/dev/sr1", "/dev/cdrom", "/dev/dvd"];

pub const DEFAULT_DEVICE: &str = "/dev/sr0";

static DEVICE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(/dev/\w+)").expect("device path pattern"));

/// Recordable media type reported by the drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaType {
    #[serde(rename = "CD-R")]
    CdR,
    #[serde(rename = "CD-RW")]
    CdRw,
    Unknown,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaType::CdR => "CD-R",
            MediaType::CdRw => "CD-RW",
            MediaType::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// What `wodim -atip` says about the disc in a drive
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscStatus {
    pub present: bool,
    pub blank: bool,
    pub media_type: MediaType,
    pub raw_output: String,
}

impl DiscStatus {
    /// Interpret combined `-atip` output
    pub fn parse(output: &str) -> Self {
        let present = output.contains("ATIP") || output.contains("Disc");
        let blank = output.contains("Is erasable") || output.to_lowercase().contains("blank");
        // "CD-R" is a prefix of "CD-RW"
        let media_type = if output.contains("CD-RW") {
            MediaType::CdRw
        } else if output.contains("CD-R") {
            MediaType::CdR
        } else {
            MediaType::Unknown
        };

        Self {
            present,
            blank,
            media_type,
            raw_output: output.to_string(),
        }
    }

    /// One-line description for progress messages
    pub fn summary(&self) -> String {
        if !self.present {
            return "No disc detected".to_string();
        }
        let state = if self.blank { "blank" } else { "not blank" };
        format!("Disc detected: {} ({})", self.media_type, state)
    }
}

/// Run the read-only media probe for `device`
///
/// The exit status is ignored: wodim reports a missing disc as output.
/// Failing to start, timing out, or I/O errors are returned as errors.
pub fn check_disc_status(wodim: &ExternalTool, device: &str) -> Result<DiscStatus> {
    let (lines, status) =
        process::spawn(wodim, [format!("dev={}", device), "-atip".to_string()])?
            .collect_output(PROBE_TIMEOUT)?;
    log::debug!("{} -atip on {} exited with {}", wodim.name(), device, status);

    let disc = DiscStatus::parse(&lines.join("\n"));
    log::info!("{}: {}", device, disc.summary());
    Ok(disc)
}

/// List optical drives, falling back to common device paths
///
/// Never empty: with nothing found, the default device is returned.
pub fn available_drives(wodim: &ExternalTool) -> Vec<String> {
    let listed = process::spawn(wodim, ["--devices"])
        .and_then(|child| child.collect_output(DEVICE_LIST_TIMEOUT));

    let mut drives = match listed {
        Ok((lines, _)) => parse_device_list(&lines),
        Err(e) => {
            log::debug!("Device listing failed: {}", e);
            Vec::new()
        }
    };

    if drives.is_empty() {
        drives = existing_paths(COMMON_DEVICE_PATHS);
    }
    if drives.is_empty() {
        drives.push(DEFAULT_DEVICE.to_string());
    }
    drives
}

/// Device paths mentioned in `wodim --devices` output, in order, once each
pub fn parse_device_list<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut drives: Vec<String> = Vec::new();
    for line in lines {
        if let Some(caps) = DEVICE_PATH.captures(line.as_ref()) {
            let device = caps[1].to_string();
            if !drives.contains(&device) {
                drives.push(device);
            }
        }
    }
    drives
}

fn existing_paths(candidates: &[&str]) -> Vec<String> {
    candidates
        .iter()
        .filter(|path| Path::new(path).exists())
        .map(|path| path.to_string())
        .collect()
}
