// Audio module - file detection and the metadata lookup used when loading tracks

pub mod detection;
pub mod metadata;

pub use detection::{AUDIO_EXTENSIONS, is_audio_file};
pub use metadata::{FileMetadata, MetadataSource, TrackInfo};
