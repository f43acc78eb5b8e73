//! Audio CD burning with wodim
//!
//! A whole disc is written in one disc-at-once pass. `BurnRun` is a lazy
//! iterator: preparation steps, the media probe and the wodim process all
//! run as the consumer pulls events, one event per step or output line.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::mem;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use super::drives::{self, DEFAULT_DEVICE, DiscStatus};
use super::parser::{ParseContext, parse_line};
use super::status::BurnStatus;
use crate::core::CancelToken;
use crate::error::Result;
use crate::process::{self, ExternalTool, RunningProcess};

/// Device, speed and eject behavior for one burn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnOptions {
    pub device: String,
    pub speed: u32,
    pub eject: bool,
}

impl Default for BurnOptions {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            speed: 4,
            eject: true,
        }
    }
}

/// Build wodim arguments for an audio disc
///
/// -v        : Verbose, needed for per-track progress lines
/// -dao      : Disc-at-once, no gaps beyond the standard pregap
/// -pad      : Pad tracks to whole 2352-byte sectors
/// -audio    : Red Book audio tracks
pub fn burn_args(files: &[PathBuf], options: &BurnOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "-dao", "-pad", "-audio"]
        .map(OsString::from)
        .into();
    args.push(format!("speed={}", options.speed).into());
    args.push(format!("dev={}", options.device).into());
    if options.eject {
        args.push("-eject".into());
    }
    args.extend(files.iter().map(|f| f.as_os_str().to_os_string()));
    args
}

/// Burns converted WAV files to audio CDs
#[derive(Debug, Clone)]
pub struct Burner {
    wodim: ExternalTool,
}

impl Burner {
    pub fn new(wodim: ExternalTool) -> Self {
        Self { wodim }
    }

    /// Find wodim (configured path or PATH), failing if it isn't installed
    pub fn locate(configured: Option<&Path>) -> Result<Self> {
        Ok(Self::new(ExternalTool::locate("wodim", configured)?))
    }

    pub fn wodim(&self) -> &ExternalTool {
        &self.wodim
    }

    pub fn available_drives(&self) -> Vec<String> {
        drives::available_drives(&self.wodim)
    }

    pub fn check_disc_status(&self, device: &str) -> Result<DiscStatus> {
        drives::check_disc_status(&self.wodim, device)
    }

    /// Burn `files`, in order, as the tracks of one audio CD
    pub fn burn_disc<'a>(
        &'a self,
        files: &'a [PathBuf],
        options: &'a BurnOptions,
        cancel: CancelToken,
    ) -> BurnRun<'a> {
        BurnRun {
            burner: self,
            files,
            options,
            cancel,
            stage: Stage::Validate,
            context: ParseContext::new(files.len()),
            progress: 0.0,
            last_error: None,
        }
    }

    /// Run a burn on a worker thread, delivering events over a channel
    pub fn spawn_burn(
        self,
        files: Vec<PathBuf>,
        options: BurnOptions,
        cancel: CancelToken,
    ) -> Result<Receiver<BurnStatus>> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("burning".to_string())
            .spawn(move || {
                for status in self.burn_disc(&files, &options, cancel) {
                    if tx.send(status).is_err() {
                        log::debug!("Burn receiver dropped, stopping burn");
                        break;
                    }
                }
            })?;
        Ok(rx)
    }
}

#[derive(Debug)]
enum Stage {
    Validate,
    CheckDrive,
    Probe,
    Announce,
    Launch,
    Streaming(RunningProcess),
    Done,
}

/// A burn in progress; see [`Burner::burn_disc`]
///
/// Ends after exactly one terminal event: `Complete`, or `Error` for
/// invalid input, a failed probe, a failed wodim, or cancellation.
/// Earlier `Error` events come from wodim output and are informational.
#[derive(Debug)]
pub struct BurnRun<'a> {
    burner: &'a Burner,
    files: &'a [PathBuf],
    options: &'a BurnOptions,
    cancel: CancelToken,
    stage: Stage,
    context: ParseContext,
    progress: f64,
    last_error: Option<String>,
}

impl BurnRun<'_> {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.files.is_empty() {
            return Err("No files to burn".to_string());
        }
        match self.files.iter().find(|file| !file.exists()) {
            Some(missing) => Err(format!("File not found: {}", missing.display())),
            None => Ok(()),
        }
    }

    fn launch(&mut self) -> Option<BurnStatus> {
        let args = burn_args(self.files, self.options);
        match process::spawn(&self.burner.wodim, args) {
            Ok(child) => self.stream(child.watch(self.cancel.clone())),
            Err(e) => {
                log::error!("Could not start burn: {}", e);
                self.finish(BurnStatus::failed(e.to_string()))
            }
        }
    }

    /// Yield the next interesting line, or the outcome once output ends
    fn stream(&mut self, mut child: RunningProcess) -> Option<BurnStatus> {
        loop {
            if self.cancel.is_cancelled() {
                return self.cancelled(child);
            }
            let Some(line) = child.next_line() else {
                break;
            };
            log::debug!("wodim: {}", line);
            if let Some(status) = parse_line(&line, &self.context) {
                self.stage = Stage::Streaming(child);
                return Some(self.record(status));
            }
        }

        if child.was_terminated() || self.cancel.is_cancelled() {
            return self.cancelled(child);
        }

        match child.wait() {
            // a cancel can land after the pipes close but before wodim exits
            Ok(status)
                if !status.success() && (child.was_terminated() || self.cancel.is_cancelled()) =>
            {
                self.cancelled(child)
            }
            Ok(status) => self.outcome(status),
            Err(e) => self.finish(BurnStatus::failed(e.to_string())),
        }
    }

    fn outcome(&mut self, status: ExitStatus) -> Option<BurnStatus> {
        if status.success() {
            log::info!("Burn completed: {} tracks", self.files.len());
            return self.finish(BurnStatus::complete(self.files.len()));
        }

        let mut error = match status.code() {
            Some(code) => format!("wodim exited with code {}", code),
            None => format!("wodim exited with {}", status),
        };
        if let Some(detail) = &self.last_error {
            error = format!("{}: {}", error, detail);
        }
        log::error!("Burn failed: {}", error);
        self.finish(BurnStatus::failed(error))
    }

    fn cancelled(&mut self, mut child: RunningProcess) -> Option<BurnStatus> {
        log::info!("Burn cancelled, stopping wodim");
        child.terminate();
        if let Err(e) = child.wait() {
            log::warn!("Could not reap wodim: {}", e);
        }
        self.finish(BurnStatus::cancelled_by_user())
    }

    /// Apply run-wide bookkeeping: highest track, monotonic progress
    fn record(&mut self, mut status: BurnStatus) -> BurnStatus {
        status.total_tracks = self.files.len();
        if status.track > self.context.current_track {
            self.context.current_track = status.track;
        }
        if status.progress < self.progress {
            status.progress = self.progress;
        } else {
            self.progress = status.progress;
        }
        if status.is_error() {
            self.last_error = status.error.clone();
        }
        status
    }

    fn emit(&mut self, next: Stage, status: BurnStatus) -> Option<BurnStatus> {
        self.stage = next;
        Some(self.record(status))
    }

    fn finish(&mut self, status: BurnStatus) -> Option<BurnStatus> {
        self.stage = Stage::Done;
        Some(self.record(status))
    }
}

impl Iterator for BurnRun<'_> {
    type Item = BurnStatus;

    fn next(&mut self) -> Option<BurnStatus> {
        let stage = mem::replace(&mut self.stage, Stage::Done);

        if self.cancel.is_cancelled() {
            return match stage {
                Stage::Done => None,
                Stage::Streaming(child) => self.cancelled(child),
                _ => self.finish(BurnStatus::cancelled_by_user()),
            };
        }

        match stage {
            Stage::Validate => match self.validate() {
                Ok(()) => {
                    log::info!(
                        "Burning {} tracks to {} at {}x",
                        self.files.len(),
                        self.options.device,
                        self.options.speed
                    );
                    self.emit(
                        Stage::CheckDrive,
                        BurnStatus::preparing(format!(
                            "Preparing to burn {} tracks...",
                            self.files.len()
                        )),
                    )
                }
                Err(error) => {
                    log::error!("Burn refused: {}", error);
                    self.finish(BurnStatus::failed(error))
                }
            },
            Stage::CheckDrive => {
                self.emit(Stage::Probe, BurnStatus::preparing("Checking drive status..."))
            }
            Stage::Probe => match self.burner.check_disc_status(&self.options.device) {
                Ok(disc) => self.emit(Stage::Announce, BurnStatus::preparing(disc.summary())),
                Err(e) => {
                    log::error!("Drive check failed: {}", e);
                    self.finish(BurnStatus::failed(format!("Drive check failed: {}", e)))
                }
            },
            Stage::Announce => self.emit(
                Stage::Launch,
                BurnStatus::preparing(format!(
                    "Starting wodim: speed={}x, device={}",
                    self.options.speed, self.options.device
                )),
            ),
            Stage::Launch => self.launch(),
            Stage::Streaming(child) => self.stream(child),
            Stage::Done => None,
        }
    }
}
