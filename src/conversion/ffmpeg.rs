//! FFmpeg subprocess handling for audio conversion

use std::ffi::OsString;
use std::path::Path;

use crate::core::CancelToken;
use crate::error::Result;
use crate::process::{self, ExternalTool};

/// Red Book audio: 44.1 kHz
pub const CD_SAMPLE_RATE: u32 = 44_100;

/// Red Book audio: stereo
pub const CD_CHANNELS: u32 = 2;

/// Outcome of converting one track
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    Converted,
    /// ffmpeg ran but failed; carries its diagnostic output
    Failed(String),
    /// Stopped by a cancellation request
    Cancelled,
}

/// Build ffmpeg arguments for CD-ready WAV output
///
/// -y                : Overwrite output file without asking
/// -v error          : Only print errors
/// -ar 44100 -ac 2   : Resample and up/downmix to CD format
/// -f wav -c:a pcm_s16le : Uncompressed 16-bit PCM in a WAV container
pub fn cd_audio_args(input_path: &Path, output_path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-v".into(), "error".into(), "-i".into()];
    args.push(input_path.as_os_str().to_os_string());
    let sample_rate = CD_SAMPLE_RATE.to_string();
    let channels = CD_CHANNELS.to_string();
    args.extend(
        [
            "-ar",
            sample_rate.as_str(),
            "-ac",
            channels.as_str(),
            "-f",
            "wav",
            "-c:a",
            "pcm_s16le",
        ]
        .map(OsString::from),
    );
    args.push(output_path.as_os_str().to_os_string());
    args
}

/// Convert a single audio file to CD-ready WAV
///
/// Returns `Err` only when ffmpeg cannot be run at all; a conversion that
/// fails is `Ok(TrackOutcome::Failed)` so the batch can move on.
pub fn convert_file(
    ffmpeg: &ExternalTool,
    input_path: &Path,
    output_path: &Path,
    cancel: &CancelToken,
) -> Result<TrackOutcome> {
    log::debug!(
        "Converting: {} -> {}",
        input_path.display(),
        output_path.display()
    );

    let mut child = process::spawn(ffmpeg, cd_audio_args(input_path, output_path))?
        .watch(cancel.clone());

    let output: Vec<String> = child.by_ref().collect();
    let status = child.wait()?;

    if child.was_terminated() {
        return Ok(TrackOutcome::Cancelled);
    }

    if status.success() {
        log::debug!("Successfully converted: {}", input_path.display());
        Ok(TrackOutcome::Converted)
    } else {
        let detail = output
            .iter()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(|line| line.trim().to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        Ok(TrackOutcome::Failed(format!(
            "ffmpeg exited with {}: {}",
            status, detail
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_cd_audio_args_shape() {
        let args = cd_audio_args(Path::new("/in/song.mp3"), Path::new("/out/CD_01/song.wav"));
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "-y",
                "-v",
                "error",
                "-i",
                "/in/song.mp3",
                "-ar",
                "44100",
                "-ac",
                "2",
                "-f",
                "wav",
                "-c:a",
                "pcm_s16le",
                "/out/CD_01/song.wav"
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_convert_file_success_and_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let ffmpeg = crate::test_support::fake_ffmpeg(dir.path());
        let cancel = CancelToken::new();

        let out = dir.path().join("good.wav");
        let outcome = convert_file(&ffmpeg, Path::new("good.mp3"), &out, &cancel).unwrap();
        assert_eq!(outcome, TrackOutcome::Converted);
        assert!(out.exists());

        let outcome = convert_file(
            &ffmpeg,
            Path::new("corrupt.mp3"),
            &dir.path().join("bad.wav"),
            &cancel,
        )
        .unwrap();
        match outcome {
            TrackOutcome::Failed(msg) => assert!(msg.contains("Invalid data"), "got {}", msg),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_convert_file_missing_ffmpeg() {
        let ffmpeg = ExternalTool::new("ffmpeg", PathBuf::from("/nonexistent/ffmpeg"));
        let result = convert_file(
            &ffmpeg,
            Path::new("a.mp3"),
            Path::new("a.wav"),
            &CancelToken::new(),
        );
        assert!(result.is_err());
    }
}
