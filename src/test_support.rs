//! Test fixtures
//!
//! Fake external tools are plain shell scripts run through `sh`, so tests
//! never exec a freshly written file (which races with concurrent forks on
//! some systems) and never need a real ffmpeg, wodim or CD drive.

use std::path::{Path, PathBuf};

use crate::core::Track;
use crate::process::ExternalTool;

/// A tool that runs `sh` directly, for `-c` scripts
pub fn shell_tool(name: &str) -> ExternalTool {
    ExternalTool::new(name, "sh")
}

/// Write `body` as a shell script and return a tool that runs it
///
/// The tool's own arguments reach the script as `"$@"`.
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> ExternalTool {
    let script = dir.join(format!("fake-{}.sh", name));
    std::fs::write(&script, body).expect("Failed to write fake tool script");
    ExternalTool::new(name, "sh").with_base_args([script])
}

/// A fake ffmpeg that writes its last argument, failing for inputs whose
/// path contains "corrupt"
pub fn fake_ffmpeg(dir: &Path) -> ExternalTool {
    fake_tool(
        dir,
        "ffmpeg",
        r#"
input=""
prev=""
for arg in "$@"; do
    if [ "$prev" = "-i" ]; then input="$arg"; fi
    prev="$arg"
    out="$arg"
done
case "$input" in
    *corrupt*) echo "$input: Invalid data found when processing input" 1>&2; exit 1 ;;
esac
echo "$@" > "$out"
exit 0
"#,
    )
}

/// A fake wodim
///
/// `-atip` probes report a blank CD-RW. Any other invocation records its
/// arguments in `wodim-args` next to the script and then runs `burn_body`.
pub fn fake_wodim(dir: &Path, burn_body: &str) -> ExternalTool {
    let args_file = dir.join("wodim-args");
    let body = format!(
        r#"
for arg in "$@"; do
    if [ "$arg" = "-atip" ]; then
        echo "Device type    : Removable CD-ROM"
        echo "ATIP info from disk:"
        echo "  Is erasable"
        echo "  Disk sub type: High speed Rewritable (CD-RW) (1)"
        exit 0
    fi
done
echo "$@" > "{}"
{}
"#,
        args_file.display(),
        burn_body
    );
    fake_tool(dir, "wodim", &body)
}

/// Create one placeholder source file and track per title, each `duration` seconds long
pub fn source_tracks(dir: &Path, titles: &[&str], duration: f64) -> Vec<Track> {
    titles
        .iter()
        .map(|title| {
            let path = dir.join(format!("{}.mp3", title));
            std::fs::write(&path, b"ID3").expect("Failed to write source file");
            Track::load(path, *title, duration).expect("Invalid test track")
        })
        .collect()
}

/// Create empty files standing in for converted WAVs
pub fn wav_files(dir: &Path, count: usize) -> Vec<PathBuf> {
    (1..=count)
        .map(|i| {
            let path = dir.join(format!("{:02} - Track {}.wav", i, i));
            std::fs::write(&path, b"RIFF").expect("Failed to write wav file");
            path
        })
        .collect()
}

/// A silent 44.1 kHz, 16-bit stereo WAV file of the given length
pub fn silent_wav(seconds: f64) -> Vec<u8> {
    const SAMPLE_RATE: u32 = 44_100;
    const CHANNELS: u16 = 2;
    const BITS: u16 = 16;

    let block_align = CHANNELS * BITS / 8;
    let frames = (seconds * SAMPLE_RATE as f64) as u32;
    let data_len = frames * block_align as u32;

    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&(SAMPLE_RATE * block_align as u32).to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0);
    wav
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_wav_header() {
        let wav = silent_wav(1.0);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 44_100 * 4);
    }

    #[test]
    fn test_source_tracks_exist() {
        let dir = tempfile::TempDir::new().unwrap();
        let tracks = source_tracks(dir.path(), &["a", "b"], 60.0);
        assert_eq!(tracks.len(), 2);
        assert!(tracks.iter().all(|t| t.path().is_file()));
    }
}
