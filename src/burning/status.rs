//! Burn progress events

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse state of one burn run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BurnPhase {
    Preparing,
    Burning,
    Fixating,
    Complete,
    Error,
}

impl fmt::Display for BurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BurnPhase::Preparing => "preparing",
            BurnPhase::Burning => "burning",
            BurnPhase::Fixating => "fixating",
            BurnPhase::Complete => "complete",
            BurnPhase::Error => "error",
        };
        f.write_str(name)
    }
}

/// One progress event of a burn run
///
/// `progress` is overall disc progress in percent. It stays below 100
/// until the final `Complete` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurnStatus {
    pub phase: BurnPhase,
    /// 1-based track being written, 0 before writing starts
    pub track: usize,
    pub total_tracks: usize,
    pub progress: f64,
    pub message: String,
    pub error: Option<String>,
    /// Set on the final event of a cancelled run
    pub cancelled: bool,
}

impl BurnStatus {
    pub fn new(phase: BurnPhase, track: usize, total_tracks: usize, progress: f64) -> Self {
        Self {
            phase,
            track,
            total_tracks,
            progress,
            message: String::new(),
            error: None,
            cancelled: false,
        }
    }

    pub fn preparing(message: impl Into<String>) -> Self {
        Self::new(BurnPhase::Preparing, 0, 0, 0.0).with_message(message)
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(BurnPhase::Error, 0, 0, 0.0)
        }
    }

    pub fn cancelled_by_user() -> Self {
        Self {
            cancelled: true,
            ..Self::failed("Burning cancelled by user")
        }
    }

    pub fn complete(total_tracks: usize) -> Self {
        Self::new(BurnPhase::Complete, total_tracks, total_tracks, 100.0)
            .with_message("Burn completed successfully!")
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn is_error(&self) -> bool {
        self.phase == BurnPhase::Error
    }

    /// Message for display: the error detail if there is one
    pub fn text(&self) -> &str {
        self.error.as_deref().unwrap_or(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_serializes_lowercase() {
        let json = serde_json::to_string(&BurnPhase::Fixating).unwrap();
        assert_eq!(json, "\"fixating\"");
        assert_eq!(BurnPhase::Complete.to_string(), "complete");
    }

    #[test]
    fn test_cancelled_is_an_error() {
        let status = BurnStatus::cancelled_by_user();
        assert!(status.is_error());
        assert!(status.cancelled);
        assert_eq!(status.text(), "Burning cancelled by user");
    }

    #[test]
    fn test_complete_reaches_full_progress() {
        let status = BurnStatus::complete(12);
        assert_eq!(status.phase, BurnPhase::Complete);
        assert_eq!(status.track, 12);
        assert_eq!(status.progress, 100.0);
        assert_eq!(status.text(), "Burn completed successfully!");
    }
}
