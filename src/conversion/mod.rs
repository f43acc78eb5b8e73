//! Audio conversion module
//!
//! Transcodes planned discs into CD-ready WAV files using ffmpeg, one
//! folder per disc.

mod converter;
mod ffmpeg;
mod layout;

pub use converter::{ConversionRun, ConversionStatus, Converter, TrackFailure};
pub use ffmpeg::{CD_CHANNELS, CD_SAMPLE_RATE, TrackOutcome, cd_audio_args, convert_file};
pub use layout::DiscLayout;
