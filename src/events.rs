//! Event system for wordpace
//!
//! The engine communicates every state-affecting transition to observers
//! through a single broadcast channel:
//! - **EventBus** (tokio::broadcast): one-to-many fan-out of [`ReaderEvent`]s
//! - **Snapshot**: the read-only projection of engine state carried by every
//!   event, so observers never need accessor calls to stay consistent
//!
//! Events are serde-serializable so a presentation layer can forward them
//! verbatim (e.g. over SSE or IPC) without reshaping.

use crate::playback::PlaybackState;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Read-only projection of engine state.
///
/// Built under the engine's state lock, so every field is internally
/// consistent. `cursor`, `current_word` and `progress_percent` are only
/// meaningful while a sequence is loaded; when Idle, `current_word` is
/// `None` and `progress_percent` is `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current playback state
    pub state: PlaybackState,
    /// 0-based index of the currently displayed word
    pub cursor: usize,
    /// Total words in the loaded sequence (0 when Idle)
    pub total_words: usize,
    /// Word at the cursor, `None` when nothing is loaded
    pub current_word: Option<String>,
    /// Derived progress: `(cursor + 1) / total_words * 100`
    pub progress_percent: f64,
    /// Current playback rate in words per minute
    pub rate_wpm: u32,
    /// Whether speech cues are attempted
    pub audio_enabled: bool,
}

/// Events emitted by the playback engine.
///
/// Every variant carries the post-transition [`Snapshot`]; observers that
/// only care about derived state can call [`ReaderEvent::snapshot`] without
/// matching on the variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReaderEvent {
    /// A new word sequence was loaded (replacing any previous one)
    TextLoaded {
        total_words: usize,
        snapshot: Snapshot,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback state changed (play, pause, or end-of-sequence)
    StateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        snapshot: Snapshot,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A tick advanced the cursor and revealed the next word
    WordRevealed {
        cursor: usize,
        word: String,
        snapshot: Snapshot,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Cursor returned to the start of the sequence
    PlaybackReset {
        snapshot: Snapshot,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Cursor was moved by an explicit seek
    CursorMoved {
        cursor: usize,
        snapshot: Snapshot,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback rate changed (effective on the next tick)
    RateChanged {
        rate_wpm: u32,
        snapshot: Snapshot,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Audio preference toggled
    AudioChanged {
        enabled: bool,
        snapshot: Snapshot,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ReaderEvent {
    /// The post-transition snapshot carried by every event.
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            ReaderEvent::TextLoaded { snapshot, .. }
            | ReaderEvent::StateChanged { snapshot, .. }
            | ReaderEvent::WordRevealed { snapshot, .. }
            | ReaderEvent::PlaybackReset { snapshot, .. }
            | ReaderEvent::CursorMoved { snapshot, .. }
            | ReaderEvent::RateChanged { snapshot, .. }
            | ReaderEvent::AudioChanged { snapshot, .. } => snapshot,
        }
    }
}

/// Broadcast fan-out of [`ReaderEvent`]s.
pub struct EventBus {
    tx: broadcast::Sender<ReaderEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus buffering up to `capacity` events per lagging
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events. Events emitted before subscription
    /// are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers. Having no subscribers is not an
    /// error; the event is simply dropped.
    pub fn emit(&self, event: ReaderEvent) {
        let _ = self.tx.send(event);
    }

    /// Configured channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
