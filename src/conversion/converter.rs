//! Batch conversion of planned discs
//!
//! `ConversionRun` is a lazy iterator of status events. Each track's event is
//! yielded just before that track is converted; the conversion itself runs
//! when the consumer asks for the next event. Only one ffmpeg runs at a time.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use super::ffmpeg::{TrackOutcome, convert_file};
use super::layout::DiscLayout;
use crate::core::{CancelToken, Disc};
use crate::error::Result;
use crate::process::ExternalTool;

/// Progress event for a conversion batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionStatus {
    pub disc_id: usize,
    /// 1-based position of the track within its disc
    pub track_index: usize,
    pub total_tracks: usize,
    /// File name being written
    pub filename: String,
    /// Set on the final "batch complete" event only
    pub completed: bool,
    /// Set on the final event of a cancelled batch
    pub cancelled: bool,
    pub error: Option<String>,
}

impl ConversionStatus {
    fn starting(disc_id: usize, track_index: usize, total_tracks: usize, filename: String) -> Self {
        Self {
            disc_id,
            track_index,
            total_tracks,
            filename,
            completed: false,
            cancelled: false,
            error: None,
        }
    }

    fn batch_complete(error: Option<String>) -> Self {
        Self {
            disc_id: 0,
            track_index: 0,
            total_tracks: 0,
            filename: "Completed.".to_string(),
            completed: true,
            cancelled: false,
            error,
        }
    }

    fn cancelled_by_user() -> Self {
        Self {
            filename: "Cancelled.".to_string(),
            completed: false,
            cancelled: true,
            error: Some("Conversion cancelled by user".to_string()),
            ..Self::batch_complete(None)
        }
    }

    fn aborted(disc_id: usize, error: String) -> Self {
        Self {
            disc_id,
            filename: String::new(),
            completed: false,
            error: Some(error),
            ..Self::batch_complete(None)
        }
    }

    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        self.completed || self.cancelled || (self.error.is_some() && self.track_index == 0)
    }
}

/// A track that failed to convert; the batch carried on without it
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFailure {
    pub disc_id: usize,
    pub input: PathBuf,
    pub output: PathBuf,
    pub error: String,
}

/// Converts planned discs to CD-ready WAV folders with ffmpeg
#[derive(Debug, Clone)]
pub struct Converter {
    ffmpeg: ExternalTool,
}

impl Converter {
    pub fn new(ffmpeg: ExternalTool) -> Self {
        Self { ffmpeg }
    }

    /// Find ffmpeg (configured path or PATH), failing if it isn't installed
    pub fn locate(configured: Option<&Path>) -> Result<Self> {
        Ok(Self::new(ExternalTool::locate("ffmpeg", configured)?))
    }

    pub fn ffmpeg(&self) -> &ExternalTool {
        &self.ffmpeg
    }

    /// Convert every track of every disc into `output_dir/CD_<NN>/`
    pub fn convert_batch<'a>(
        &'a self,
        discs: &'a [Disc],
        output_dir: &Path,
        cancel: CancelToken,
    ) -> ConversionRun<'a> {
        log::info!(
            "Converting {} discs into {}",
            discs.len(),
            output_dir.display()
        );
        ConversionRun {
            converter: self,
            discs,
            layout: DiscLayout::new(output_dir, discs.len()),
            cancel,
            disc_index: 0,
            track_index: 0,
            pending: None,
            failures: Vec::new(),
            finished: false,
        }
    }

    /// Run a batch on a worker thread, delivering events over a channel
    pub fn spawn_batch(
        self,
        discs: Vec<Disc>,
        output_dir: PathBuf,
        cancel: CancelToken,
    ) -> Result<Receiver<ConversionStatus>> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("conversion".to_string())
            .spawn(move || {
                for status in self.convert_batch(&discs, &output_dir, cancel) {
                    if tx.send(status).is_err() {
                        log::debug!("Conversion receiver dropped, stopping batch");
                        break;
                    }
                }
            })?;
        Ok(rx)
    }
}

#[derive(Debug)]
struct PendingTrack {
    disc_id: usize,
    input: PathBuf,
    output: PathBuf,
    filename: String,
}

/// A conversion batch in progress; see [`Converter::convert_batch`]
#[derive(Debug)]
pub struct ConversionRun<'a> {
    converter: &'a Converter,
    discs: &'a [Disc],
    layout: DiscLayout,
    cancel: CancelToken,
    disc_index: usize,
    /// Next track to announce within the current disc
    track_index: usize,
    pending: Option<PendingTrack>,
    failures: Vec<TrackFailure>,
    finished: bool,
}

impl ConversionRun<'_> {
    pub fn layout(&self) -> &DiscLayout {
        &self.layout
    }

    /// Tracks that failed so far
    pub fn failures(&self) -> &[TrackFailure] {
        &self.failures
    }

    fn finish(&mut self, status: ConversionStatus) -> Option<ConversionStatus> {
        self.finished = true;
        Some(status)
    }

    /// Convert the track announced by the previous event
    fn run_pending(&mut self) -> Result<()> {
        let Some(job) = self.pending.take() else {
            return Ok(());
        };
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        match convert_file(self.converter.ffmpeg(), &job.input, &job.output, &self.cancel)? {
            TrackOutcome::Converted => {}
            TrackOutcome::Cancelled => {
                log::info!("Conversion of {} stopped by cancellation", job.filename);
            }
            TrackOutcome::Failed(error) => {
                log::error!("Error when converting {}: {}", job.filename, error);
                self.failures.push(TrackFailure {
                    disc_id: job.disc_id,
                    input: job.input,
                    output: job.output,
                    error,
                });
            }
        }
        Ok(())
    }

    fn completion_summary(&self) -> Option<String> {
        match self.failures.len() {
            0 => None,
            1 => Some("1 track failed to convert".to_string()),
            n => Some(format!("{} tracks failed to convert", n)),
        }
    }
}

impl Iterator for ConversionRun<'_> {
    type Item = ConversionStatus;

    fn next(&mut self) -> Option<ConversionStatus> {
        if self.finished {
            return None;
        }

        let disc_id = self.pending.as_ref().map(|job| job.disc_id).unwrap_or(0);
        if let Err(e) = self.run_pending() {
            log::error!("Conversion aborted: {}", e);
            return self.finish(ConversionStatus::aborted(disc_id, e.to_string()));
        }

        let discs = self.discs;
        while let Some(disc) = discs.get(self.disc_index) {
            if self.cancel.is_cancelled() {
                log::info!("Conversion cancelled");
                return self.finish(ConversionStatus::cancelled_by_user());
            }

            let disc_dir = self.layout.disc_dir(disc.id());
            if self.track_index == 0 {
                if let Err(e) = std::fs::create_dir_all(&disc_dir) {
                    log::error!("Failed to create {}: {}", disc_dir.display(), e);
                    return self.finish(ConversionStatus::aborted(
                        disc.id(),
                        format!("Failed to create {}: {}", disc_dir.display(), e),
                    ));
                }
                log::info!("Disc {} -> {}", disc.id(), disc_dir.display());
            }

            if let Some(track) = disc.tracks().get(self.track_index) {
                self.track_index += 1;
                let filename = DiscLayout::wav_name(track);
                self.pending = Some(PendingTrack {
                    disc_id: disc.id(),
                    input: track.path().to_path_buf(),
                    output: disc_dir.join(&filename),
                    filename: filename.clone(),
                });
                return Some(ConversionStatus::starting(
                    disc.id(),
                    self.track_index,
                    disc.len(),
                    filename,
                ));
            }

            self.disc_index += 1;
            self.track_index = 0;
        }

        if self.cancel.is_cancelled() {
            return self.finish(ConversionStatus::cancelled_by_user());
        }

        log::info!(
            "All conversions complete ({} failed)",
            self.failures.len()
        );
        let summary = self.completion_summary();
        self.finish(ConversionStatus::batch_complete(summary))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::planner::Splitter;
    use crate::test_support::{fake_ffmpeg, fake_tool, source_tracks};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn plan(dir: &Path, titles: &[&str], per_disc: usize) -> Vec<Disc> {
        let tracks = source_tracks(dir, titles, 60.0);
        let splitter = Splitter::new(per_disc as f64).unwrap();
        splitter.split_sequential(&tracks)
    }

    #[test]
    fn test_events_and_layout() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let converter = Converter::new(fake_ffmpeg(src.path()));
        let discs = plan(src.path(), &["a", "b", "c"], 2);

        let events: Vec<_> = converter
            .convert_batch(&discs, out.path(), CancelToken::new())
            .collect();

        let summary: Vec<_> = events
            .iter()
            .map(|e| (e.disc_id, e.track_index, e.total_tracks, e.filename.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, 1, 2, "a.wav"),
                (1, 2, 2, "b.wav"),
                (2, 1, 1, "c.wav"),
                (0, 0, 0, "Completed."),
            ]
        );
        assert!(events.last().unwrap().completed);
        assert!(events.last().unwrap().error.is_none());
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

        assert!(out.path().join("CD_01").join("a.wav").exists());
        assert!(out.path().join("CD_01").join("b.wav").exists());
        assert!(out.path().join("CD_02").join("c.wav").exists());
    }

    #[test]
    fn test_event_precedes_conversion() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let converter = Converter::new(fake_ffmpeg(src.path()));
        let discs = plan(src.path(), &["a", "b"], 10);

        let mut run = converter.convert_batch(&discs, out.path(), CancelToken::new());
        let first = run.next().unwrap();
        assert_eq!(first.filename, "a.wav");
        assert!(out.path().join("CD_01").is_dir());
        assert!(!out.path().join("CD_01").join("a.wav").exists());

        run.next().unwrap();
        assert!(out.path().join("CD_01").join("a.wav").exists());
    }

    #[test]
    fn test_failed_track_does_not_stop_batch() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let converter = Converter::new(fake_ffmpeg(src.path()));
        let discs = plan(src.path(), &["good", "corrupt", "after"], 10);

        let mut run = converter.convert_batch(&discs, out.path(), CancelToken::new());
        let events: Vec<_> = run.by_ref().collect();

        assert_eq!(events.len(), 4);
        let last = events.last().unwrap();
        assert!(last.completed);
        assert_eq!(last.error.as_deref(), Some("1 track failed to convert"));

        assert_eq!(run.failures().len(), 1);
        assert!(run.failures()[0].input.ends_with("corrupt.mp3"));
        assert!(out.path().join("CD_01").join("after.wav").exists());
    }

    #[test]
    fn test_cancel_before_next_track() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let converter = Converter::new(fake_ffmpeg(src.path()));
        let discs = plan(src.path(), &["a", "b", "c", "d"], 2);
        let cancel = CancelToken::new();

        let mut run = converter.convert_batch(&discs, out.path(), cancel.clone());
        assert_eq!(run.next().unwrap().filename, "a.wav");
        cancel.cancel();

        let rest: Vec<_> = run.collect();
        assert_eq!(rest.len(), 1);
        assert!(rest[0].cancelled);
        assert!(!rest[0].completed);
        assert!(!out.path().join("CD_02").exists());
    }

    #[test]
    fn test_cancel_interrupts_running_conversion() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let slow = fake_tool(src.path(), "ffmpeg", "exec sleep 30\n");
        let converter = Converter::new(slow);
        let discs = plan(src.path(), &["a", "b"], 10);
        let cancel = CancelToken::new();

        let mut run = converter.convert_batch(&discs, out.path(), cancel.clone());
        run.next().unwrap();

        let remote = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            remote.cancel();
        });

        let started = Instant::now();
        let rest: Vec<_> = run.collect();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(rest.len(), 1);
        assert!(rest[0].cancelled);
    }

    #[test]
    fn test_missing_ffmpeg_aborts_batch() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let converter = Converter::new(ExternalTool::new("ffmpeg", "/nonexistent/ffmpeg"));
        let discs = plan(src.path(), &["a", "b"], 10);

        let events: Vec<_> = converter
            .convert_batch(&discs, out.path(), CancelToken::new())
            .collect();
        assert_eq!(events.len(), 2);
        assert!(events[1].error.is_some());
        assert!(events[1].is_terminal());
        assert!(!events[1].completed);
    }

    #[test]
    fn test_empty_batch_completes() {
        let out = TempDir::new().unwrap();
        let converter = Converter::new(ExternalTool::new("ffmpeg", "/nonexistent/ffmpeg"));
        let events: Vec<_> = converter
            .convert_batch(&[], out.path(), CancelToken::new())
            .collect();
        assert_eq!(events.len(), 1);
        assert!(events[0].completed);
    }

    #[test]
    fn test_spawn_batch_delivers_events() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let converter = Converter::new(fake_ffmpeg(src.path()));
        let discs = plan(src.path(), &["a", "b", "c"], 1);

        let rx = converter
            .spawn_batch(discs, out.path().to_path_buf(), CancelToken::new())
            .unwrap();
        let events: Vec<_> = rx.iter().collect();
        assert_eq!(events.len(), 4);
        assert!(events[3].completed);
        assert!(out.path().join("CD_03").join("c.wav").exists());
    }
}
