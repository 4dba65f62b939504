//! Per-feature alert settings.
//!
//! Settings are read once when an alert is prepared; a running alert never
//! polls the store. Values are kept raw (plain milliseconds, possibly zero
//! or negative if the backing store holds garbage) and only sanitized when
//! they are turned into an [`AlertModeConfig`].

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::alert::{AlertMode, AlertModeConfig};
use crate::feature::Feature;
use crate::tracing::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    pub mode: AlertMode,

    /// Overrides the mode's total duration.
    pub duration_ms: Option<i64>,

    /// Overrides the mode's blink interval.
    pub blink_interval_ms: Option<i64>,

    pub sound_enabled: bool,

    /// Stretch the alert to the length of its sound.
    pub sync_to_sound: bool,

    /// Flashes per run, for flash-sequence alerts.
    pub flash_count: u32,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            mode: AlertMode::Standard,
            duration_ms: None,
            blink_interval_ms: None,
            sound_enabled: true,
            sync_to_sound: false,
            flash_count: 3,
        }
    }
}

impl FeatureSettings {
    /// Resolve the mode profile with any overrides applied.
    pub fn mode_config(&self) -> AlertModeConfig {
        let mut config = self.mode.config();
        if let Some(raw) = self.duration_ms {
            config = config.with_total_duration(sanitize_ms("duration_ms", raw));
        }
        if let Some(raw) = self.blink_interval_ms {
            config = config.with_blink_interval(sanitize_ms("blink_interval_ms", raw));
        }
        config
    }
}

fn sanitize_ms(field: &'static str, raw: i64) -> Duration {
    if raw <= 0 {
        warn!(field, value = raw, "Non-positive setting, using minimum");
        return Duration::ZERO;
    }
    Duration::from_millis(raw as u64)
}

/// Source of per-feature settings.
pub trait SettingsStore: Send + Sync {
    fn get(&self, feature: Feature) -> FeatureSettings;
    fn set(&self, feature: Feature, settings: FeatureSettings);
}

/// Settings held in memory, falling back to each feature's defaults.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<Feature, FeatureSettings>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, feature: Feature) -> FeatureSettings {
        self.values
            .read()
            .get(&feature)
            .cloned()
            .unwrap_or_else(|| feature.default_settings())
    }

    fn set(&self, feature: Feature, settings: FeatureSettings) {
        debug!(%feature, ?settings, "Feature settings updated");
        self.values.write().insert(feature, settings);
    }
}
