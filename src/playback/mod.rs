//! Playback module - pacing state machine and supporting types
//!
//! - `engine.rs`: the core engine (cursor, rate, tick schedule, transitions)
//! - `state.rs`: the playback state enumeration

mod engine;
mod state;

pub use engine::PlaybackEngine;
pub use state::PlaybackState;
