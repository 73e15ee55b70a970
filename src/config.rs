//! Engine configuration
//!
//! Rate bounds, step granularity, cue tuning and event channel capacity.
//! Values can be loaded from a TOML file or taken from [`Config::default`];
//! the session controller validates the configuration once at construction
//! so the engine can assume a well-formed rate range everywhere else.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Wordpace configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Minimum playback rate in words per minute
    pub min_rate_wpm: u32,
    /// Maximum playback rate in words per minute
    pub max_rate_wpm: u32,
    /// Rate step granularity, anchored at `min_rate_wpm`
    pub rate_step_wpm: u32,
    /// Rate used by a fresh session before any `set_rate` call
    pub default_rate_wpm: u32,
    /// Whether speech cues are attempted by a fresh session
    pub default_audio_enabled: bool,
    /// Divisor converting words-per-minute into a cue rate multiplier
    pub cue_rate_divisor: f64,
    /// Upper bound accepted by cue providers for the rate multiplier
    pub cue_rate_ceiling: f64,
    /// Event broadcast channel capacity (events buffered before lagging
    /// subscribers start missing them)
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_rate_wpm: 100,
            max_rate_wpm: 800,
            rate_step_wpm: 25,
            default_rate_wpm: 200,
            default_audio_enabled: true,
            cue_rate_divisor: 200.0,
            cue_rate_ceiling: 2.0,
            event_capacity: 100,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency of the rate range and cue tuning.
    pub fn validate(&self) -> Result<()> {
        if self.min_rate_wpm == 0 {
            return Err(Error::Config("min_rate_wpm must be >= 1".into()));
        }
        if self.min_rate_wpm > self.max_rate_wpm {
            return Err(Error::Config(format!(
                "min_rate_wpm ({}) exceeds max_rate_wpm ({})",
                self.min_rate_wpm, self.max_rate_wpm
            )));
        }
        if self.rate_step_wpm == 0 {
            return Err(Error::Config("rate_step_wpm must be >= 1".into()));
        }
        if self.default_rate_wpm < self.min_rate_wpm || self.default_rate_wpm > self.max_rate_wpm {
            return Err(Error::Config(format!(
                "default_rate_wpm ({}) outside [{}, {}]",
                self.default_rate_wpm, self.min_rate_wpm, self.max_rate_wpm
            )));
        }
        if self.cue_rate_divisor <= 0.0 {
            return Err(Error::Config("cue_rate_divisor must be positive".into()));
        }
        if self.cue_rate_ceiling <= 0.0 {
            return Err(Error::Config("cue_rate_ceiling must be positive".into()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be >= 1".into()));
        }
        Ok(())
    }

    /// Clamp `wpm` into the configured range and round to the nearest step.
    ///
    /// Out-of-range requests are clamped, not rejected. Steps are anchored at
    /// `min_rate_wpm`; rounding is half-up, then re-clamped so the result
    /// never exceeds `max_rate_wpm`.
    pub fn clamp_rate(&self, wpm: u32) -> u32 {
        let clamped = wpm.clamp(self.min_rate_wpm, self.max_rate_wpm);
        let offset = clamped - self.min_rate_wpm;
        let step = self.rate_step_wpm;
        let stepped = self.min_rate_wpm + ((offset + step / 2) / step) * step;
        stepped.min(self.max_rate_wpm)
    }

    /// Cue playback-speed multiplier for a given words-per-minute rate.
    ///
    /// `rate / divisor`, capped at `cue_rate_ceiling` (providers reject
    /// faster renderings).
    pub fn cue_rate_multiplier(&self, wpm: u32) -> f64 {
        (f64::from(wpm) / self.cue_rate_divisor).min(self.cue_rate_ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: Config = toml::from_str("max_rate_wpm = 600\ndefault_rate_wpm = 300\n").unwrap();
        assert_eq!(config.max_rate_wpm, 600);
        assert_eq!(config.default_rate_wpm, 300);
        assert_eq!(config.min_rate_wpm, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_rate_range() {
        let config = Config { min_rate_wpm: 500, max_rate_wpm: 200, ..Config::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_step() {
        let config = Config { rate_step_wpm: 0, ..Config::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_default_rate_outside_range() {
        let config = Config { default_rate_wpm: 50, ..Config::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn clamp_rate_bounds_and_steps() {
        let config = Config::default();
        assert_eq!(config.clamp_rate(50), 100);
        assert_eq!(config.clamp_rate(999), 800);
        assert_eq!(config.clamp_rate(100), 100);
        assert_eq!(config.clamp_rate(800), 800);
        // 213 rounds up to 225 (12 away vs 13 from 200)
        assert_eq!(config.clamp_rate(213), 225);
        assert_eq!(config.clamp_rate(212), 200);
        assert_eq!(config.clamp_rate(600), 600);
    }

    #[test]
    fn cue_multiplier_scales_and_caps() {
        let config = Config::default();
        assert!((config.cue_rate_multiplier(200) - 1.0).abs() < f64::EPSILON);
        assert!((config.cue_rate_multiplier(100) - 0.5).abs() < f64::EPSILON);
        // 600/200 = 3.0 caps at 2.0
        assert!((config.cue_rate_multiplier(600) - 2.0).abs() < f64::EPSILON);
    }
}
