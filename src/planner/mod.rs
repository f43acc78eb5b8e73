//! Disc planning
//!
//! Splits an ordered list of tracks into CD-sized discs. Two policies:
//! - Sequential: preserves the original order, only inserting disc boundaries
//! - Fill gaps: fills each disc from the whole remaining queue, so later
//!   tracks may move forward into gaps left on earlier discs
//!
//! Neither policy sorts by duration. Fill gaps is first-fit over the
//! original order, repeated once per disc, so the partition depends on the
//! input order and is not an optimal bin packing.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::core::{Disc, Track};
use crate::error::{Error, Result};

/// Usable audio on a standard 80 minute CD-R, leaving room for lead-out
pub const DEFAULT_CAPACITY_MINUTES: f64 = 79.5;

/// Packing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    #[default]
    Sequential,
    FillGaps,
}

impl SplitMode {
    /// The other policy
    pub fn toggled(self) -> Self {
        match self {
            Self::Sequential => Self::FillGaps,
            Self::FillGaps => Self::Sequential,
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::FillGaps => write!(f, "fill gaps"),
        }
    }
}

/// Splits tracks into discs of a fixed capacity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splitter {
    limit_seconds: f64,
}

impl Default for Splitter {
    fn default() -> Self {
        Self {
            limit_seconds: DEFAULT_CAPACITY_MINUTES * 60.0,
        }
    }
}

impl Splitter {
    /// Create a splitter for discs holding `capacity_minutes` of audio
    pub fn new(capacity_minutes: f64) -> Result<Self> {
        if !capacity_minutes.is_finite() || capacity_minutes <= 0.0 {
            return Err(Error::InvalidCapacity(capacity_minutes));
        }
        Ok(Self {
            limit_seconds: capacity_minutes * 60.0,
        })
    }

    /// Disc capacity in seconds
    pub fn limit_seconds(&self) -> f64 {
        self.limit_seconds
    }

    pub fn split(&self, tracks: &[Track], mode: SplitMode) -> Vec<Disc> {
        match mode {
            SplitMode::Sequential => self.split_sequential(tracks),
            SplitMode::FillGaps => self.split_filling_gaps(tracks),
        }
    }

    /// Greedy single pass that keeps the original track order
    ///
    /// A track that does not fit closes the current disc and starts the next
    /// one. An oversized track therefore ends up alone on its own disc.
    pub fn split_sequential(&self, tracks: &[Track]) -> Vec<Disc> {
        let mut discs = Vec::new();
        let mut current = Disc::new(1);

        for track in tracks {
            self.warn_if_oversized(track);

            if current.total_seconds() + track.duration() > self.limit_seconds && !current.is_empty() {
                let next = Disc::new(discs.len() + 2);
                discs.push(std::mem::replace(&mut current, next));
            }
            current.push(track.clone());
        }

        if !current.is_empty() {
            discs.push(current);
        }

        log::debug!(
            "Sequential split: {} tracks onto {} discs",
            tracks.len(),
            discs.len()
        );
        discs
    }

    /// Fill each disc from the whole remaining queue
    ///
    /// Each round either isolates an oversized head track, or scans the
    /// remaining queue once and takes every track that still fits. Tracks
    /// that don't fit keep their relative order for the next round.
    pub fn split_filling_gaps(&self, tracks: &[Track]) -> Vec<Disc> {
        let mut remaining: VecDeque<&Track> = tracks.iter().collect();
        let mut discs: Vec<Disc> = Vec::new();

        while let Some(head) = remaining.front() {
            if head.duration() > self.limit_seconds {
                self.warn_if_oversized(head);
                let mut giant = Disc::new(discs.len() + 1);
                giant.push((*head).clone());
                discs.push(giant);
                remaining.pop_front();
                continue;
            }

            let mut disc = Disc::new(discs.len() + 1);
            let mut skipped = VecDeque::new();

            for track in remaining.drain(..) {
                if disc.total_seconds() + track.duration() <= self.limit_seconds {
                    disc.push(track.clone());
                } else {
                    skipped.push_back(track);
                }
            }

            discs.push(disc);
            remaining = skipped;
        }

        log::debug!(
            "Fill-gaps split: {} tracks onto {} discs",
            tracks.len(),
            discs.len()
        );
        discs
    }

    fn warn_if_oversized(&self, track: &Track) {
        if track.duration() > self.limit_seconds {
            log::warn!(
                "Track '{}' ({:.1} min) exceeds disc capacity and will be isolated",
                track.title(),
                track.duration() / 60.0
            );
        }
    }
}
