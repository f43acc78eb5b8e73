//! Audio CD Splitter
//!
//! Plans how a set of audio tracks is spread across fixed-capacity CDs,
//! converts each track to CD audio with ffmpeg and burns each disc with
//! wodim, reporting progress as a stream of status events.

pub mod audio;
pub mod burning;
pub mod conversion;
pub mod core;
pub mod error;
pub mod logging;
pub mod planner;
pub mod process;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
