//! Destination layout for converted discs
//!
//! `<root>/CD_<NN>/<track title>.wav`. Conversion writes this layout and
//! burning reads it back, so both sides must compute it the same way.

use std::path::{Path, PathBuf};

use crate::core::{Disc, Track};

/// Folder and file naming for one planned batch of discs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscLayout {
    root: PathBuf,
    digits: usize,
}

impl DiscLayout {
    /// Layout for a batch of `total_discs` discs under `root`
    ///
    /// The zero-padding width is chosen once for the whole batch.
    pub fn new(root: impl Into<PathBuf>, total_discs: usize) -> Self {
        Self {
            root: root.into(),
            digits: Self::digits_for(total_discs),
        }
    }

    /// 2 digits below 100 discs, 3 below 1000, 4 otherwise
    pub fn digits_for(total_discs: usize) -> usize {
        if total_discs < 100 {
            2
        } else if total_discs < 1000 {
            3
        } else {
            4
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn folder_name(&self, disc_id: usize) -> String {
        format!("CD_{:0width$}", disc_id, width = self.digits)
    }

    pub fn disc_dir(&self, disc_id: usize) -> PathBuf {
        self.root.join(self.folder_name(disc_id))
    }

    /// File name for a converted track: its title plus `.wav`
    pub fn wav_name(track: &Track) -> String {
        format!("{}.wav", track.title())
    }

    /// Converted files of a disc, in burn order
    pub fn wav_files(&self, disc: &Disc) -> Vec<PathBuf> {
        let dir = self.disc_dir(disc.id());
        disc.tracks()
            .iter()
            .map(|track| dir.join(Self::wav_name(track)))
            .collect()
    }

    /// Converted files of a disc that are not on disk yet
    pub fn missing_files(&self, disc: &Disc) -> Vec<PathBuf> {
        self.wav_files(disc)
            .into_iter()
            .filter(|path| !path.exists())
            .collect()
    }
}
