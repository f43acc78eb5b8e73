//! Audio file discovery and track loading

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::track::Track;
use crate::audio::{MetadataSource, is_audio_file};
use crate::error::{Error, Result};

/// Get all audio files under a directory, sorted by path
///
/// Sorting by path keeps numbered album files ("01 - ...", "02 - ...") in
/// their natural order, which the sequential planner then preserves.
pub fn get_audio_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Not a directory: {}", path.display()),
        )));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_audio_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    Ok(files)
}

/// Expand a mix of files and directories into an ordered list of audio files
///
/// Files are kept in the given order; each directory is replaced by its
/// sorted audio files.
pub fn collect_sources(sources: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for source in sources {
        if source.is_dir() {
            files.extend(get_audio_files(source)?);
        } else {
            files.push(source.clone());
        }
    }
    Ok(files)
}

/// Read metadata for each path and build tracks
///
/// Paths that do not exist, are not regular files, or whose metadata cannot
/// be read are logged and skipped. One bad file never fails the batch.
pub fn load_tracks(paths: &[PathBuf], source: &dyn MetadataSource) -> Vec<Track> {
    let mut tracks = Vec::with_capacity(paths.len());

    for path in paths {
        if !path.exists() {
            log::warn!("File does not exist: {}", path.display());
            continue;
        }
        if !path.is_file() {
            log::warn!("Not a file: {}", path.display());
            continue;
        }

        let info = match source.lookup(path) {
            Ok(info) => info,
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                continue;
            }
        };

        match Track::load(path, info.title, info.duration) {
            Ok(track) => tracks.push(track),
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    log::info!("Loaded {} of {} tracks", tracks.len(), paths.len());
    tracks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::TrackInfo;
    use std::fs;
    use tempfile::TempDir;

    /// Fixed-duration lookup that fails for files named "bad.*"
    struct FakeMetadata;

    impl MetadataSource for FakeMetadata {
        fn lookup(&self, path: &Path) -> Result<TrackInfo> {
            let stem = path.file_stem().unwrap().to_string_lossy().into_owned();
            if stem == "bad" {
                return Err(Error::Metadata {
                    path: path.to_path_buf(),
                    reason: "corrupt".to_string(),
                });
            }
            Ok(TrackInfo {
                title: stem,
                duration: 120.0,
            })
        }
    }

    #[test]
    fn test_scan_nonexistent_directory() {
        assert!(get_audio_files(Path::new("/nonexistent/path/12345")).is_err());
    }

    #[test]
    fn test_scan_directory_sorted_audio_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("02 - b.mp3"), b"").unwrap();
        fs::write(dir.path().join("01 - a.flac"), b"").unwrap();
        fs::write(dir.path().join("cover.jpg"), b"").unwrap();
        fs::create_dir(dir.path().join("disc2")).unwrap();
        fs::write(dir.path().join("disc2").join("03 - c.ogg"), b"").unwrap();

        let files = get_audio_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["01 - a.flac", "02 - b.mp3", "disc2/03 - c.ogg"]);
    }

    #[test]
    fn test_collect_sources_keeps_file_order() {
        let dir = TempDir::new().unwrap();
        let loose = dir.path().join("zz.mp3");
        fs::write(&loose, b"").unwrap();
        let album = dir.path().join("album");
        fs::create_dir(&album).unwrap();
        fs::write(album.join("01.mp3"), b"").unwrap();

        let files = collect_sources(&[loose.clone(), album.clone()]).unwrap();
        assert_eq!(files, vec![loose, album.join("01.mp3")]);
    }

    #[test]
    fn test_load_tracks_skips_bad_entries() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.mp3");
        let bad = dir.path().join("bad.mp3");
        fs::write(&good, b"").unwrap();
        fs::write(&bad, b"").unwrap();

        let paths = vec![
            good.clone(),
            bad,
            dir.path().join("missing.mp3"),
            dir.path().to_path_buf(),
        ];
        let tracks = load_tracks(&paths, &FakeMetadata);

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].path(), good.as_path());
        assert_eq!(tracks[0].title(), "good");
        assert_eq!(tracks[0].duration(), 120.0);
    }
}
