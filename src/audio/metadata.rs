//! Track metadata lookup
//!
//! Loading a track only needs two things: a display title and a duration.
//! The title is the file stem (it also becomes the converted file name), the
//! duration comes from the container via symphonia, with lofty's header
//! properties as a fallback for files symphonia cannot size (e.g. MP3s
//! without a Xing/VBRI header).

use std::fs::File;
use std::path::{Path, PathBuf};

use lofty::{AudioFile, Probe};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Error, Result};

/// Title and duration of one audio file
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub title: String,
    /// Duration in seconds
    pub duration: f64,
}

/// Capability to look up a display title and duration for a file
pub trait MetadataSource {
    fn lookup(&self, path: &Path) -> Result<TrackInfo>;
}

/// Reads metadata from the audio file itself
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMetadata;

impl MetadataSource for FileMetadata {
    fn lookup(&self, path: &Path) -> Result<TrackInfo> {
        let title = title_from_path(path).ok_or_else(|| Error::Metadata {
            path: path.to_path_buf(),
            reason: "file name has no stem".to_string(),
        })?;

        let duration = match probe_duration(path) {
            Ok(Some(duration)) => duration,
            Ok(None) => header_duration(path)?,
            Err(e) => {
                log::debug!("symphonia could not probe {}: {}", path.display(), e);
                header_duration(path)?
            }
        };

        Ok(TrackInfo { title, duration })
    }
}

/// Display title for a file: its name without the extension
pub fn title_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.trim().is_empty())
}

/// Duration from frame count and sample rate, when the container declares both
fn probe_duration(path: &Path) -> std::result::Result<Option<f64>, String> {
    let file = File::open(path).map_err(|e| format!("Failed to open file: {}", e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(&ext.to_string_lossy());
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| format!("Failed to probe audio format: {}", e))?;

    let format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| "No default track found".to_string())?;

    match (track.codec_params.n_frames, track.codec_params.sample_rate) {
        (Some(frames), Some(rate)) if rate > 0 => Ok(Some(frames as f64 / rate as f64)),
        _ => Ok(None),
    }
}

/// Duration from the file's header properties
fn header_duration(path: &Path) -> Result<f64> {
    let metadata_error = |reason: String| Error::Metadata {
        path: PathBuf::from(path),
        reason,
    };

    let tagged_file = Probe::open(path)
        .map_err(|e| metadata_error(format!("Failed to open file: {}", e)))?
        .read()
        .map_err(|e| metadata_error(format!("Failed to read file: {}", e)))?;

    let duration = tagged_file.properties().duration().as_secs_f64();
    if duration <= 0.0 {
        return Err(metadata_error("Could not read duration".to_string()));
    }
    Ok(duration)
}
