//! Core playback engine - the pacing state machine
//!
//! **Responsibilities:**
//! - Own the cursor over the loaded word sequence and the playback rate
//! - Drive ticks from a single recurring timer task (`60_000 / rate` ms)
//! - Trigger speech cues through the [`CueCoordinator`] on each advance
//! - Stop at sequence end and broadcast every state-affecting transition
//!
//! **Timer invariant:** at most one tick task exists at any time. Every
//! transition that touches the schedule tears the old task down (generation
//! bump + abort, under the state lock) before arming a replacement, so rate
//! changes and cancellation are race-free by construction. A tick that was
//! already past its timer await when teardown happened observes a stale
//! generation under the lock and applies nothing.

use crate::config::Config;
use crate::cue::{CueCoordinator, CueProvider};
use crate::events::{EventBus, ReaderEvent, Snapshot};
use crate::playback::PlaybackState;
use crate::tokenizer::WordSequence;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

/// Mutable engine state, guarded by one mutex.
///
/// Control calls never await while holding the lock, so the lock is only
/// ever held for short synchronous sections.
struct EngineInner {
    words: WordSequence,
    cursor: usize,
    state: PlaybackState,
    rate_wpm: u32,
    audio_enabled: bool,
    /// Ties a scheduled tick to the configuration that armed it. Bumped on
    /// every teardown; a tick whose generation no longer matches is stale
    /// and must not apply any effect.
    generation: u64,
    /// Handle of the single active tick task, if any.
    ticker: Option<JoinHandle<()>>,
}

/// State shared between the engine facade and its tick task.
struct EngineShared {
    inner: Mutex<EngineInner>,
    cues: CueCoordinator,
    events: EventBus,
    config: Config,
    runtime: tokio::runtime::Handle,
}

/// Playback engine - converts a word sequence plus a words-per-minute rate
/// into a cancellable, re-schedulable timed sequence of reveal events.
///
/// All transport methods are synchronous and non-blocking; the only waiting
/// in the system is the passive interval between scheduled ticks. Must be
/// constructed inside a tokio runtime (tick tasks are spawned onto it).
pub struct PlaybackEngine {
    shared: Arc<EngineShared>,
}

impl PlaybackEngine {
    /// Create an engine with no sequence loaded (Idle).
    ///
    /// `provider` is the optional speech-cue capability; `None` degrades all
    /// cue activity to no-ops without affecting visual pacing.
    pub fn new(config: Config, provider: Option<Arc<dyn CueProvider>>) -> Self {
        let audio_enabled = config.default_audio_enabled;
        let shared = Arc::new(EngineShared {
            inner: Mutex::new(EngineInner {
                words: WordSequence::empty(),
                cursor: 0,
                state: PlaybackState::Idle,
                rate_wpm: config.clamp_rate(config.default_rate_wpm),
                audio_enabled,
                generation: 0,
                ticker: None,
            }),
            cues: CueCoordinator::new(provider, audio_enabled),
            events: EventBus::new(config.event_capacity),
            config,
            runtime: tokio::runtime::Handle::current(),
        });
        Self { shared }
    }

    /// Subscribe to state-change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.shared.events.subscribe()
    }

    /// Consistent read of current derived state.
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.shared.inner.lock().unwrap();
        snapshot_of(&inner)
    }

    /// Replace the loaded sequence.
    ///
    /// Any state -> Paused (cursor 0) when `words` is non-empty, else Idle.
    /// Cancels any active cue and clears any pending schedule.
    pub fn load(&self, words: WordSequence) {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            teardown_locked(&mut inner);
            let total = words.len();
            inner.words = words;
            inner.cursor = 0;
            inner.state = if total == 0 { PlaybackState::Idle } else { PlaybackState::Paused };
            info!(total_words = total, state = %inner.state, "sequence loaded");
            self.shared.events.emit(ReaderEvent::TextLoaded {
                total_words: total,
                snapshot: snapshot_of(&inner),
                timestamp: chrono::Utc::now(),
            });
        }
        // Provider calls stay outside the state lock: a slow provider must
        // not stall snapshot() or other transport calls.
        self.shared.cues.cancel();
    }

    /// Start (or resume) playback.
    ///
    /// Paused -> Playing: arms a recurring tick at `60_000 / rate` ms, with
    /// the first advance one full period after this call. Idle and Playing
    /// are no-ops. Finished is a no-op as well: the cursor is already at the
    /// last index, there is nothing left to advance to.
    pub fn play(&self) {
        let mut inner = self.shared.inner.lock().unwrap();
        match inner.state {
            PlaybackState::Idle => debug!("play ignored: no sequence loaded"),
            PlaybackState::Playing => debug!("play ignored: already playing"),
            PlaybackState::Finished => debug!("play ignored: cursor at end of sequence"),
            PlaybackState::Paused => {
                inner.state = PlaybackState::Playing;
                self.shared.arm_ticker(&mut inner);
                info!(rate_wpm = inner.rate_wpm, cursor = inner.cursor, "playback started");
                self.shared.events.emit(ReaderEvent::StateChanged {
                    old_state: PlaybackState::Paused,
                    new_state: PlaybackState::Playing,
                    snapshot: snapshot_of(&inner),
                    timestamp: chrono::Utc::now(),
                });
            }
        }
    }

    /// Stop advancing without moving the cursor.
    ///
    /// Playing -> Paused; tears down the tick schedule and cancels any
    /// active cue before returning. No-op in every other state.
    pub fn pause(&self) {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            if inner.state != PlaybackState::Playing {
                debug!(state = %inner.state, "pause ignored");
                return;
            }
            teardown_locked(&mut inner);
            inner.state = PlaybackState::Paused;
            info!(cursor = inner.cursor, "playback paused");
            self.shared.events.emit(ReaderEvent::StateChanged {
                old_state: PlaybackState::Playing,
                new_state: PlaybackState::Paused,
                snapshot: snapshot_of(&inner),
                timestamp: chrono::Utc::now(),
            });
        }
        self.shared.cues.cancel();
    }

    /// Return the cursor to the start of the sequence.
    ///
    /// Any state -> Paused (cursor 0) when a sequence is loaded, else Idle.
    /// Cancels schedule and active cue unconditionally.
    pub fn reset(&self) {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            teardown_locked(&mut inner);
            inner.cursor = 0;
            inner.state = if inner.words.is_empty() { PlaybackState::Idle } else { PlaybackState::Paused };
            info!(state = %inner.state, "playback reset");
            self.shared.events.emit(ReaderEvent::PlaybackReset {
                snapshot: snapshot_of(&inner),
                timestamp: chrono::Utc::now(),
            });
        }
        self.shared.cues.cancel();
    }

    /// Move the cursor to `index`, clamped to the loaded sequence.
    ///
    /// No-op when nothing is loaded. Cancels any active cue (it belongs to
    /// the old position). Leaves Finished for Paused when the new cursor is
    /// no longer at the last index; a Playing schedule keeps running and
    /// advances from the new position on its next tick.
    pub fn seek(&self, index: usize) {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            if inner.words.is_empty() {
                debug!("seek ignored: no sequence loaded");
                return;
            }
            let last = inner.words.len() - 1;
            inner.cursor = index.min(last);
            if inner.state == PlaybackState::Finished && inner.cursor < last {
                inner.state = PlaybackState::Paused;
            }
            debug!(cursor = inner.cursor, state = %inner.state, "cursor moved");
            self.shared.events.emit(ReaderEvent::CursorMoved {
                cursor: inner.cursor,
                snapshot: snapshot_of(&inner),
                timestamp: chrono::Utc::now(),
            });
        }
        // The in-flight cue belongs to the old position.
        self.shared.cues.cancel();
    }

    /// Change the playback rate.
    ///
    /// Clamped to the configured range and rounded to the nearest step. If
    /// Playing, the old schedule is torn down and a new one armed at the new
    /// interval, with no fractional carry-over of elapsed time; the cursor
    /// is untouched. In all other states the new rate simply takes effect on
    /// the next `play`.
    pub fn set_rate(&self, wpm: u32) {
        let clamped = self.shared.config.clamp_rate(wpm);
        let mut inner = self.shared.inner.lock().unwrap();
        if clamped != wpm {
            debug!(requested = wpm, clamped, "rate clamped to configured range");
        }
        inner.rate_wpm = clamped;
        if inner.state == PlaybackState::Playing {
            // Rate change does not cancel the in-flight cue, only the timer.
            if let Some(handle) = inner.ticker.take() {
                handle.abort();
            }
            inner.generation = inner.generation.wrapping_add(1);
            self.shared.arm_ticker(&mut inner);
        }
        info!(rate_wpm = clamped, "rate changed");
        self.shared.events.emit(ReaderEvent::RateChanged {
            rate_wpm: clamped,
            snapshot: snapshot_of(&inner),
            timestamp: chrono::Utc::now(),
        });
    }

    /// Toggle whether speech cues are attempted.
    ///
    /// Disabling cancels any in-flight cue before this call returns. Never
    /// changes the playback state.
    pub fn set_audio_enabled(&self, enabled: bool) {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            inner.audio_enabled = enabled;
            info!(enabled, "audio preference changed");
            self.shared.events.emit(ReaderEvent::AudioChanged {
                enabled,
                snapshot: snapshot_of(&inner),
                timestamp: chrono::Utc::now(),
            });
        }
        if enabled {
            self.shared.cues.enable();
        } else {
            // Cancels the in-flight cue before this call returns.
            self.shared.cues.disable();
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        // The tick task only holds a Weak reference, but abort it eagerly so
        // no timer outlives the engine instance.
        {
            let mut inner = self.shared.inner.lock().unwrap();
            teardown_locked(&mut inner);
        }
        self.shared.cues.cancel();
    }
}

impl EngineShared {
    /// Arm the single tick task for the current rate.
    ///
    /// Caller holds the state lock and must have torn down any prior ticker.
    /// The interval's immediately-ready first tick is consumed up front, so
    /// the first advance lands one full period after arming.
    fn arm_ticker(self: &Arc<Self>, inner: &mut EngineInner) {
        inner.generation = inner.generation.wrapping_add(1);
        let generation = inner.generation;
        let period = Duration::from_millis(60_000 / u64::from(inner.rate_wpm));
        let shared = Arc::downgrade(self);
        debug!(period_ms = period.as_millis() as u64, generation, "tick schedule armed");
        let handle = self.runtime.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // first tick of an interval completes immediately
            loop {
                ticker.tick().await;
                let Some(shared) = shared.upgrade() else { break };
                if !shared.apply_tick(generation) {
                    break;
                }
            }
        });
        inner.ticker = Some(handle);
    }

    /// Apply one scheduled tick. Returns false when the schedule must stop
    /// (stale generation, no longer Playing, or end of sequence reached).
    ///
    /// State mutation and event emission happen under the lock; the
    /// provider call is deferred until after release, carrying a validity
    /// token so a cancellation racing the deferred `speak` wins and the
    /// request is dropped rather than issued late.
    fn apply_tick(&self, generation: u64) -> bool {
        let cue = {
            let mut inner = self.inner.lock().unwrap();
            if inner.generation != generation || inner.state != PlaybackState::Playing {
                // Teardown raced this tick; its configuration is stale.
                return false;
            }

            // Playing implies a non-empty sequence.
            let last = inner.words.len() - 1;
            if inner.cursor == last {
                // End of sequence: stop without advancing and without
                // issuing a cue for an index that was already shown.
                inner.state = PlaybackState::Finished;
                inner.ticker = None;
                info!(total_words = inner.words.len(), "playback finished");
                self.events.emit(ReaderEvent::StateChanged {
                    old_state: PlaybackState::Playing,
                    new_state: PlaybackState::Finished,
                    snapshot: snapshot_of(&inner),
                    timestamp: chrono::Utc::now(),
                });
                drop(inner);
                self.cues.cancel();
                return false;
            }

            inner.cursor += 1;
            let word = inner
                .words
                .get(inner.cursor)
                .map(str::to_owned)
                .unwrap_or_default();
            let cue = inner.audio_enabled.then(|| {
                (
                    self.cues.validity_token(),
                    word.clone(),
                    self.config.cue_rate_multiplier(inner.rate_wpm),
                )
            });
            debug!(cursor = inner.cursor, word = %word, "word revealed");
            self.events.emit(ReaderEvent::WordRevealed {
                cursor: inner.cursor,
                word,
                snapshot: snapshot_of(&inner),
                timestamp: chrono::Utc::now(),
            });
            cue
        };
        if let Some((token, word, rate_multiplier)) = cue {
            self.cues.speak_if_valid(token, &word, rate_multiplier);
        }
        true
    }
}

/// Tear down the active tick schedule, if any.
///
/// Bumps the generation so a tick already past its timer await is rendered
/// stale, then aborts the task. Caller holds the state lock.
fn teardown_locked(inner: &mut EngineInner) {
    inner.generation = inner.generation.wrapping_add(1);
    if let Some(handle) = inner.ticker.take() {
        handle.abort();
    }
}

fn snapshot_of(inner: &EngineInner) -> Snapshot {
    let total = inner.words.len();
    let progress = if total == 0 {
        0.0
    } else {
        ((inner.cursor + 1) as f64 / total as f64) * 100.0
    };
    Snapshot {
        state: inner.state,
        cursor: inner.cursor,
        total_words: total,
        current_word: inner.words.get(inner.cursor).map(str::to_owned),
        progress_percent: progress,
        rate_wpm: inner.rate_wpm,
        audio_enabled: inner.audio_enabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use tokio::time::sleep;

    fn engine() -> PlaybackEngine {
        PlaybackEngine::new(Config::default(), None)
    }

    #[tokio::test]
    async fn load_nonempty_parks_at_paused_cursor_zero() {
        let engine = engine();
        engine.load(tokenize("alpha beta gamma"));
        let snap = engine.snapshot();
        assert_eq!(snap.state, PlaybackState::Paused);
        assert_eq!(snap.cursor, 0);
        assert_eq!(snap.total_words, 3);
        assert_eq!(snap.current_word.as_deref(), Some("alpha"));
        assert!((snap.progress_percent - 100.0 / 3.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn load_empty_resolves_to_idle() {
        let engine = engine();
        engine.load(tokenize("   \n  "));
        let snap = engine.snapshot();
        assert_eq!(snap.state, PlaybackState::Idle);
        assert_eq!(snap.total_words, 0);
        assert_eq!(snap.current_word, None);
        assert_eq!(snap.progress_percent, 0.0);
    }

    #[tokio::test]
    async fn play_without_sequence_is_noop() {
        let engine = engine();
        engine.play();
        assert_eq!(engine.snapshot().state, PlaybackState::Idle);
    }

    #[tokio::test]
    async fn pause_outside_playing_is_noop() {
        let engine = engine();
        engine.load(tokenize("one two"));
        engine.pause();
        assert_eq!(engine.snapshot().state, PlaybackState::Paused);
    }

    #[tokio::test]
    async fn set_rate_clamps_and_rounds() {
        let engine = engine();
        engine.set_rate(9999);
        assert_eq!(engine.snapshot().rate_wpm, 800);
        engine.set_rate(10);
        assert_eq!(engine.snapshot().rate_wpm, 100);
        engine.set_rate(213);
        assert_eq!(engine.snapshot().rate_wpm, 225);
    }

    #[tokio::test]
    async fn seek_clamps_to_sequence_end() {
        let engine = engine();
        engine.load(tokenize("a b c"));
        engine.seek(99);
        assert_eq!(engine.snapshot().cursor, 2);
        engine.seek(1);
        assert_eq!(engine.snapshot().cursor, 1);
    }

    #[tokio::test]
    async fn seek_on_idle_is_noop() {
        let engine = engine();
        engine.seek(3);
        assert_eq!(engine.snapshot().state, PlaybackState::Idle);
        assert_eq!(engine.snapshot().cursor, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn single_word_sequence_finishes_on_first_tick() {
        let engine = engine();
        engine.load(tokenize("solo"));
        engine.set_rate(600); // 100ms period
        engine.play();
        sleep(Duration::from_millis(150)).await;
        let snap = engine.snapshot();
        assert_eq!(snap.state, PlaybackState::Finished);
        assert_eq!(snap.cursor, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn play_from_finished_is_noop() {
        let engine = engine();
        engine.load(tokenize("one two"));
        engine.set_rate(600);
        engine.play();
        sleep(Duration::from_millis(250)).await;
        assert_eq!(engine.snapshot().state, PlaybackState::Finished);

        engine.play();
        assert_eq!(engine.snapshot().state, PlaybackState::Finished);
        sleep(Duration::from_millis(300)).await;
        let snap = engine.snapshot();
        assert_eq!(snap.state, PlaybackState::Finished);
        assert_eq!(snap.cursor, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn seek_back_from_finished_allows_replay() {
        let engine = engine();
        engine.load(tokenize("one two three"));
        engine.set_rate(600);
        engine.play();
        sleep(Duration::from_millis(350)).await;
        assert_eq!(engine.snapshot().state, PlaybackState::Finished);

        engine.seek(0);
        assert_eq!(engine.snapshot().state, PlaybackState::Paused);
        engine.play();
        sleep(Duration::from_millis(150)).await;
        assert_eq!(engine.snapshot().cursor, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_tick_applies_after_pause_returns() {
        let engine = engine();
        engine.load(tokenize("a b c d e"));
        engine.set_rate(600);
        engine.play();
        // Let one tick land, then pause before the next fires.
        sleep(Duration::from_millis(110)).await;
        let cursor = engine.snapshot().cursor;
        assert_eq!(cursor, 1);
        engine.pause();
        sleep(Duration::from_millis(500)).await;
        assert_eq!(engine.snapshot().cursor, cursor);
        assert_eq!(engine.snapshot().state, PlaybackState::Paused);
    }
}
