use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Shortest alert the controller will run. Anything less, including zero,
/// is treated as a misconfiguration and raised to this.
pub const MIN_TOTAL_DURATION: Duration = Duration::from_secs(1);

/// Shortest blink half-period accepted from configuration.
pub const MIN_BLINK_INTERVAL: Duration = Duration::from_millis(10);

/// Named alert intensity profiles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum AlertMode {
    Stealth,
    Standard,
    Intense,
}

impl AlertMode {
    pub fn config(self) -> AlertModeConfig {
        match self {
            AlertMode::Stealth => AlertModeConfig::STEALTH,
            AlertMode::Standard => AlertModeConfig::STANDARD,
            AlertMode::Intense => AlertModeConfig::INTENSE,
        }
    }
}

/// Timing and sound profile of a single alert run.
///
/// Built once per invocation, either from a named [`AlertMode`] or from
/// per-feature settings, and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertModeConfig {
    /// Half-period of the on/off blink cycle.
    blink_interval: Duration,

    /// How long the Active stage may run.
    total_duration: Duration,

    has_sound: bool,
}

impl AlertModeConfig {
    pub const STEALTH: Self = Self {
        blink_interval: Duration::from_millis(500),
        total_duration: Duration::from_millis(20_000),
        has_sound: false,
    };

    pub const STANDARD: Self = Self {
        blink_interval: Duration::from_millis(200),
        total_duration: Duration::from_millis(30_000),
        has_sound: true,
    };

    pub const INTENSE: Self = Self {
        blink_interval: Duration::from_millis(100),
        total_duration: Duration::from_millis(45_000),
        has_sound: true,
    };

    /// Build a custom profile, raising out-of-range values to the minimums.
    pub fn new(blink_interval: Duration, total_duration: Duration, has_sound: bool) -> Self {
        Self {
            blink_interval: blink_interval.max(MIN_BLINK_INTERVAL),
            total_duration: total_duration.max(MIN_TOTAL_DURATION),
            has_sound,
        }
    }

    /// Same profile with a different total duration (e.g. a per-feature
    /// "alert duration" setting).
    pub fn with_total_duration(self, total_duration: Duration) -> Self {
        Self::new(self.blink_interval, total_duration, self.has_sound)
    }

    pub fn with_blink_interval(self, blink_interval: Duration) -> Self {
        Self::new(blink_interval, self.total_duration, self.has_sound)
    }

    pub fn blink_interval(&self) -> Duration {
        self.blink_interval
    }

    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    pub fn has_sound(&self) -> bool {
        self.has_sound
    }
}

impl From<AlertMode> for AlertModeConfig {
    fn from(mode: AlertMode) -> Self {
        mode.config()
    }
}
