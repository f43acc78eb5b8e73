//! Track and disc model
//!
//! A `Track` is one playable source file. A `Disc` is an ordered group of
//! tracks that fits (or, for a single oversized track, is assigned to) one CD.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// An audio file loaded for planning
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    path: PathBuf,
    title: String,
    duration: f64,
}

impl Track {
    /// Create a track, validating the title and duration
    ///
    /// The path is not checked here; use [`Track::load`] for tracks that
    /// must point at an existing file.
    pub fn new(path: impl Into<PathBuf>, title: impl Into<String>, duration: f64) -> Result<Self> {
        let path = path.into();
        let title = title.into();

        if title.trim().is_empty() {
            return Err(Error::InvalidTrack {
                path,
                reason: "title must not be empty".to_string(),
            });
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(Error::InvalidTrack {
                path,
                reason: format!("duration must be non-negative, got {}", duration),
            });
        }

        Ok(Self {
            path,
            title,
            duration,
        })
    }

    /// Create a track for a file that must exist and be a regular file
    pub fn load(path: impl Into<PathBuf>, title: impl Into<String>, duration: f64) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(Error::InvalidTrack {
                reason: if path.exists() {
                    "not a file".to_string()
                } else {
                    "file does not exist".to_string()
                },
                path,
            });
        }
        Self::new(path, title, duration)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }
}

/// A virtual CD holding an ordered list of tracks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Disc {
    id: usize,
    tracks: Vec<Track>,
}

impl Disc {
    /// Create an empty disc. Ids are 1-based.
    pub(crate) fn new(id: usize) -> Self {
        debug_assert!(id >= 1, "disc ids are 1-based");
        Self {
            id,
            tracks: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Tracks in burn order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Sum of the member track durations in seconds
    pub fn total_seconds(&self) -> f64 {
        self.tracks.iter().map(|t| t.duration).sum()
    }
}

/// Format seconds as `m:ss`, or `h:mm:ss` past an hour
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_track_rejects_negative_duration() {
        let result = Track::new("/music/a.mp3", "a", -1.0);
        assert!(matches!(result, Err(Error::InvalidTrack { .. })));
    }

    #[test]
    fn test_track_rejects_nan_duration() {
        assert!(Track::new("/music/a.mp3", "a", f64::NAN).is_err());
    }

    #[test]
    fn test_track_rejects_empty_title() {
        assert!(Track::new("/music/a.mp3", "  ", 10.0).is_err());
    }

    #[test]
    fn test_track_accepts_zero_duration() {
        let track = Track::new("/music/a.mp3", "a", 0.0).unwrap();
        assert_eq!(track.duration(), 0.0);
        assert_eq!(track.title(), "a");
        assert_eq!(track.path(), Path::new("/music/a.mp3"));
    }

    #[test]
    fn test_track_load_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        assert!(Track::load(dir.path().join("missing.mp3"), "missing", 1.0).is_err());
        assert!(Track::load(dir.path(), "dir", 1.0).is_err());

        let file = dir.path().join("song.mp3");
        std::fs::write(&file, b"id3").unwrap();
        assert!(Track::load(&file, "song", 1.0).is_ok());
    }

    #[test]
    fn test_disc_total_seconds() {
        let mut disc = Disc::new(1);
        assert!(disc.is_empty());
        assert_eq!(disc.total_seconds(), 0.0);

        disc.push(Track::new("a.mp3", "a", 90.5).unwrap());
        disc.push(Track::new("b.mp3", "b", 30.0).unwrap());
        assert_eq!(disc.len(), 2);
        assert_eq!(disc.total_seconds(), 120.5);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(65.0), "1:05");
        assert_eq!(format_duration(4770.0), "1:19:30");
    }
}
