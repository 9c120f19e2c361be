//! Tunable rule timings loaded from TOML.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use underpromotion_core::{
    FLAME_ACTIVATION_DELAY, FLAME_BURN_DURATION, FLAME_SELECTION_INTERVAL,
    FLAME_TRIGGER_DELAY_MAX, FLAME_TRIGGER_DELAY_MIN, LOAD_COMMON_EVENT, SPIKE_TIMING,
};

const DEFAULT_FRAMES_PER_STEP: u32 = 4;
const DEFAULT_FRAMES_PER_JUMP: u32 = 8;
const DEFAULT_RNG_SEED: u64 = 0x5eed_c4e5_5b0a_2d17;

/// Rule timings and host hooks used by a [`crate::World`].
///
/// Every field is optional in TOML; missing fields keep their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Milliseconds between two spike flips.
    pub spike_period_ms: u64,
    /// Ticks between two flame selection passes.
    pub flame_selection_interval: u64,
    /// Shortest flame pre-warning, in milliseconds.
    pub flame_trigger_delay_min_ms: u64,
    /// Longest flame pre-warning, in milliseconds.
    pub flame_trigger_delay_max_ms: u64,
    /// Milliseconds between activation and ignition.
    pub flame_activation_delay_ms: u64,
    /// Milliseconds a flame keeps burning.
    pub flame_burn_ms: u64,
    /// Ticks spent on every single-tile step of a route.
    pub frames_per_step: u32,
    /// Ticks spent on every jump of a route.
    pub frames_per_jump: u32,
    /// Common event reserved when the player dies.
    pub load_common_event: u32,
    /// Seed of the world's random number generator.
    pub rng_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spike_period_ms: millis(SPIKE_TIMING),
            flame_selection_interval: FLAME_SELECTION_INTERVAL,
            flame_trigger_delay_min_ms: millis(FLAME_TRIGGER_DELAY_MIN),
            flame_trigger_delay_max_ms: millis(FLAME_TRIGGER_DELAY_MAX),
            flame_activation_delay_ms: millis(FLAME_ACTIVATION_DELAY),
            flame_burn_ms: millis(FLAME_BURN_DURATION),
            frames_per_step: DEFAULT_FRAMES_PER_STEP,
            frames_per_jump: DEFAULT_FRAMES_PER_JUMP,
            load_common_event: LOAD_COMMON_EVENT,
            rng_seed: DEFAULT_RNG_SEED,
        }
    }
}

/// Errors raised while loading a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be deserialized.
    #[error("failed to parse rules config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The shortest trigger delay exceeds the longest one.
    #[error("flame trigger delay range is inverted ({min_ms} > {max_ms})")]
    InvertedTriggerDelay {
        /// Configured minimum.
        min_ms: u64,
        /// Configured maximum.
        max_ms: u64,
    },
    /// Flame selection would never run.
    #[error("flame selection interval must be at least one tick")]
    ZeroSelectionInterval,
}

impl Config {
    /// Parses a config from TOML text and validates it.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flame_trigger_delay_min_ms > self.flame_trigger_delay_max_ms {
            return Err(ConfigError::InvertedTriggerDelay {
                min_ms: self.flame_trigger_delay_min_ms,
                max_ms: self.flame_trigger_delay_max_ms,
            });
        }
        if self.flame_selection_interval == 0 {
            return Err(ConfigError::ZeroSelectionInterval);
        }
        Ok(())
    }

    /// Interval between two spike flips.
    #[must_use]
    pub const fn spike_period(&self) -> Duration {
        Duration::from_millis(self.spike_period_ms)
    }

    /// Shortest flame pre-warning.
    #[must_use]
    pub const fn flame_trigger_delay_min(&self) -> Duration {
        Duration::from_millis(self.flame_trigger_delay_min_ms)
    }

    /// Longest flame pre-warning.
    #[must_use]
    pub const fn flame_trigger_delay_max(&self) -> Duration {
        Duration::from_millis(self.flame_trigger_delay_max_ms)
    }

    /// Delay between activation and ignition.
    #[must_use]
    pub const fn flame_activation_delay(&self) -> Duration {
        Duration::from_millis(self.flame_activation_delay_ms)
    }

    /// Time a flame keeps burning.
    #[must_use]
    pub const fn flame_burn(&self) -> Duration {
        Duration::from_millis(self.flame_burn_ms)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
