//! # wordpace
//!
//! Paced word-reveal engine: converts a word sequence plus a target
//! words-per-minute rate into a cancellable, re-schedulable timed sequence
//! of "reveal next word" events, optionally synchronized with an external
//! speech-cue provider that must never desynchronize from or outlive the
//! visual state.
//!
//! **Architecture (leaf-first):**
//! - [`tokenizer`]: raw text -> ordered [`WordSequence`]
//! - [`cue`]: at-most-one-in-flight coordination over an abstract
//!   [`CueProvider`] capability (silently absent is fine)
//! - [`playback`]: the core state machine driving timed cursor advances
//! - [`session`]: the public façade (load, transport, snapshot, events)
//!
//! The engine is an in-process component: no wire protocol, no persistence,
//! no document parsing. The presentation layer observes it purely through
//! the [`events`] broadcast channel.

pub mod config;
pub mod cue;
pub mod error;
pub mod events;
pub mod playback;
pub mod session;
pub mod tokenizer;

pub use config::Config;
pub use cue::{CueCoordinator, CueHandle, CueProvider};
pub use error::{Error, Result};
pub use events::{EventBus, ReaderEvent, Snapshot};
pub use playback::{PlaybackEngine, PlaybackState};
pub use session::{SessionController, Subscription};
pub use tokenizer::{tokenize, WordSequence};
