//! Speech-cue coordination
//!
//! Wraps an abstract, latency-bearing cue provider behind the one invariant
//! that matters: **at most one cue is outstanding at any instant**. Every
//! `speak` cancels the prior cue before requesting a new one; every stop
//! path (`cancel`, `disable`) clears the active handle before returning.
//!
//! A provider may be entirely absent in the running environment. That is
//! silent degradation, never an error: visual pacing proceeds, `speak`
//! becomes a permanent no-op.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Opaque provider-assigned identifier for an outstanding cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CueHandle(u64);

impl CueHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Capability contract for an external speech-cue provider.
///
/// `request_cue` must not block: audio rendering happens asynchronously on
/// the provider's own time. Cancelling a cue that already completed must be
/// a provider-side no-op, not an error — cue completion races cancellation
/// by design and the provider is the only party that can arbitrate it.
pub trait CueProvider: Send + Sync {
    /// Start rendering `word` as audio at `rate_multiplier` x normal speed.
    fn request_cue(&self, word: &str, rate_multiplier: f64) -> CueHandle;

    /// Cancel a previously requested cue (best-effort).
    fn cancel_cue(&self, handle: CueHandle);
}

/// Issues at most one in-flight audio cue at a time.
///
/// The active handle is owned exclusively here; the playback engine never
/// touches provider handles directly.
pub struct CueCoordinator {
    provider: Option<Arc<dyn CueProvider>>,
    active: Mutex<Option<CueHandle>>,
    enabled: AtomicBool,
    /// Bumped on every cancellation; a speak decided before the bump
    /// carries a stale token and is dropped instead of issued.
    epoch: AtomicU64,
}

impl CueCoordinator {
    /// Create a coordinator over `provider`. Passing `None` models an
    /// environment without a speech capability; all operations degrade to
    /// no-ops.
    pub fn new(provider: Option<Arc<dyn CueProvider>>, enabled: bool) -> Self {
        Self {
            provider,
            active: Mutex::new(None),
            enabled: AtomicBool::new(enabled),
            epoch: AtomicU64::new(0),
        }
    }

    /// Token tying a decision to speak to the cancellation state at
    /// decision time.
    ///
    /// Capture the token while holding whatever lock guards the decision,
    /// then issue the request with [`CueCoordinator::speak_if_valid`]
    /// outside that lock; a cancellation landing in between invalidates the
    /// token, so the deferred request can never resurrect a cue the caller
    /// already cancelled.
    pub fn validity_token(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Request a cue for `word`, cancelling any cue still in flight first.
    ///
    /// Fire-and-forget: nothing is awaited and no result is surfaced. A
    /// no-op while disabled or without a provider.
    pub fn speak(&self, word: &str, rate_multiplier: f64) {
        self.speak_if_valid(self.validity_token(), word, rate_multiplier);
    }

    /// Like [`CueCoordinator::speak`], but dropped as a no-op if any
    /// cancellation happened after `token` was captured.
    pub fn speak_if_valid(&self, token: u64, word: &str, rate_multiplier: f64) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }
        let Some(provider) = self.provider.as_ref() else {
            return;
        };
        let mut active = self.active.lock().unwrap();
        if self.epoch.load(Ordering::Acquire) != token {
            trace!(word, "cue request dropped: cancelled since decided");
            return;
        }
        if let Some(handle) = active.take() {
            trace!(handle = handle.id(), "cancelling prior cue before new request");
            provider.cancel_cue(handle);
        }
        let handle = provider.request_cue(word, rate_multiplier);
        debug!(handle = handle.id(), word, rate_multiplier, "cue requested");
        *active = Some(handle);
    }

    /// Cancel the active cue, if any, and invalidate outstanding tokens.
    /// Idempotent.
    pub fn cancel(&self) {
        let mut active = self.active.lock().unwrap();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if let (Some(provider), Some(handle)) = (self.provider.as_ref(), active.take()) {
            debug!(handle = handle.id(), "cue cancelled");
            provider.cancel_cue(handle);
        }
    }

    /// Make `speak` a no-op and cancel any in-flight cue immediately.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
        self.cancel();
    }

    /// Re-allow cue requests.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Whether `speak` currently issues requests.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}
