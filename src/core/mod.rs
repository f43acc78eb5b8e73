//! Core model and application state
//!
//! This module contains:
//! - Track and Disc, the values the planner produces and the orchestrators consume
//! - The cancellation token shared between a caller and a running operation,
//!   and Ctrl+C handling that cancels it
//! - Audio file discovery and track loading
//! - Persisted application settings

mod cancel;
mod interrupt;
mod scanning;
mod settings;
mod track;

pub use cancel::CancelToken;
pub use interrupt::{cancel_on_interrupt, interrupted};
pub use scanning::{collect_sources, get_audio_files, load_tracks};
pub use settings::AppSettings;
pub use track::{Disc, Track, format_duration};
