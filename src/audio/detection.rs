use std::path::Path;

/// Extensions handed to ffmpeg for conversion
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "wav", "ogg", "m4a", "aac", "aiff", "aif", "opus", "alac", "wma",
];

/// Whether `path` names a source track ffmpeg can turn into CD audio
///
/// Decided by extension. Hidden files are rejected, which also drops the
/// `._name.mp3` AppleDouble files macOS leaves on shared drives.
pub fn is_audio_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(true);
    if hidden {
        return false;
    }

    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
