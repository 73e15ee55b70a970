//! Playback state enumeration

use serde::{Deserialize, Serialize};

/// Playback state machine states.
///
/// - `Idle`: no sequence loaded
/// - `Playing`: sequence loaded, an active tick schedule exists
/// - `Paused`: sequence loaded, cursor valid, no active schedule
/// - `Finished`: cursor reached the last element and playback auto-stopped;
///   a rest state, left only via reset/seek/reload
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Finished,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Finished => write!(f, "finished"),
        }
    }
}
