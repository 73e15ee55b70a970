//! Session controller - the public-facing façade
//!
//! Translates external calls into playback-engine operations, invokes the
//! tokenizer on load, and exposes the engine's notification channel to the
//! presentation layer. Holds no independent playback state; the only thing
//! recorded here is the most recent load rejection, which is never raised as
//! an error (empty text simply resolves to Idle).

use crate::config::Config;
use crate::cue::CueProvider;
use crate::error::{Error, Result};
use crate::events::{ReaderEvent, Snapshot};
use crate::playback::PlaybackEngine;
use crate::tokenizer::tokenize;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

/// RAII guard for a callback-style observer registered via
/// [`SessionController::on_change`]. Dropping it unsubscribes.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Public entry point for a reading session.
///
/// Owns the playback engine instance and mediates all external calls into
/// it. Must be constructed inside a tokio runtime.
pub struct SessionController {
    engine: PlaybackEngine,
    last_error: Mutex<Option<Error>>,
}

impl SessionController {
    /// Create a session over an optional speech-cue provider.
    ///
    /// Validates `config` once; the engine assumes a well-formed rate range
    /// afterwards.
    pub fn new(config: Config, provider: Option<Arc<dyn CueProvider>>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: PlaybackEngine::new(config, provider),
            last_error: Mutex::new(None),
        })
    }

    /// Tokenize `text` and load it into the engine.
    ///
    /// Empty or whitespace-only text fails silently into Idle; the rejection
    /// is recorded and readable via [`SessionController::last_error`].
    pub fn load_text(&self, text: &str) {
        let words = tokenize(text);
        let mut last_error = self.last_error.lock().unwrap();
        if words.is_empty() {
            warn!("load_text: no words in supplied text");
            *last_error = Some(Error::InvalidInput("no words in supplied text".to_owned()));
        } else {
            *last_error = None;
        }
        drop(last_error);
        self.engine.load(words);
    }

    /// Start or resume playback. See [`PlaybackEngine::play`].
    pub fn play(&self) {
        self.engine.play();
    }

    /// Pause playback. See [`PlaybackEngine::pause`].
    pub fn pause(&self) {
        self.engine.pause();
    }

    /// Return to the start of the sequence. See [`PlaybackEngine::reset`].
    pub fn reset(&self) {
        self.engine.reset();
    }

    /// Move the cursor. See [`PlaybackEngine::seek`].
    pub fn seek(&self, index: usize) {
        self.engine.seek(index);
    }

    /// Change the playback rate (clamped and stepped).
    pub fn set_rate(&self, wpm: u32) {
        self.engine.set_rate(wpm);
    }

    /// Toggle whether speech cues are attempted.
    pub fn set_audio_enabled(&self, enabled: bool) {
        self.engine.set_audio_enabled(enabled);
    }

    /// Synchronous read of current derived state.
    pub fn snapshot(&self) -> Snapshot {
        self.engine.snapshot()
    }

    /// Subscribe to state-change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.engine.subscribe()
    }

    /// Register a callback invoked after every state-affecting transition.
    ///
    /// Convenience adapter over [`SessionController::subscribe`]; the
    /// returned [`Subscription`] guard unsubscribes on drop. The callback
    /// runs on a runtime task, so it must not block.
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(ReaderEvent) + Send + 'static,
    {
        let mut rx = self.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => callback(event),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "observer lagged behind event stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Subscription { handle }
    }

    /// Description of the most recent load rejection, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().as_ref().map(Error::to_string)
    }
}
