//! The alert features a user can arm.
//!
//! A feature turns its stored settings into an [`AlertRequest`] plus the
//! confirm-action that runs while the alert is active. Settings are read
//! exactly once, here; the machine built from a [`PreparedAlert`] never
//! looks at the store again.

pub mod actions;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::alert::{
    AlertMode, AlertModeConfig, AlertRequest, AlertStageMachine, ConfirmAction, MachineError,
    MachineOptions, Peripherals, StageTiming,
};
use crate::hw_trait::SoundClock;
use crate::settings::{FeatureSettings, SettingsStore};
use crate::tracing::prelude::*;

use actions::{FlashSequence, Sweep};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Light up when the charger is pulled while the guard is armed.
    UsbGuard,

    /// Flash a warning pattern when the battery runs low.
    LowBatteryFlash,

    /// Short animation on unlock.
    UnlockAnimation,

    /// Show the battery level after a shake.
    BatteryPeek,
}

impl Feature {
    pub fn pattern_id(self) -> &'static str {
        match self {
            Feature::UsbGuard => "usb_guard",
            Feature::LowBatteryFlash => "low_battery_flash",
            Feature::UnlockAnimation => "unlock",
            Feature::BatteryPeek => "battery_peek",
        }
    }

    pub fn default_settings(self) -> FeatureSettings {
        match self {
            Feature::UsbGuard => FeatureSettings::default(),
            Feature::LowBatteryFlash => FeatureSettings {
                duration_ms: Some(10_000),
                flash_count: 5,
                ..Default::default()
            },
            Feature::UnlockAnimation => FeatureSettings {
                mode: AlertMode::Stealth,
                duration_ms: Some(3_000),
                sound_enabled: false,
                ..Default::default()
            },
            Feature::BatteryPeek => FeatureSettings {
                mode: AlertMode::Stealth,
                duration_ms: Some(5_000),
                sound_enabled: false,
                ..Default::default()
            },
        }
    }

    fn confirm_action(
        self,
        settings: &FeatureSettings,
        mode: AlertModeConfig,
    ) -> Box<dyn ConfirmAction> {
        match self {
            Feature::LowBatteryFlash => {
                Box::new(FlashSequence::new(settings.flash_count, mode.total_duration()))
            }
            Feature::UsbGuard | Feature::UnlockAnimation | Feature::BatteryPeek => {
                Box::new(Sweep::new(mode.total_duration()))
            }
        }
    }

    /// Read this feature's settings and build what the alert needs.
    ///
    /// When the settings ask for sound sync and a `sound_clock` is given, the
    /// alert runs for as long as the sound. A failing or empty lookup falls
    /// back to the configured duration.
    pub fn prepare(
        self,
        store: &dyn SettingsStore,
        sound_clock: Option<&dyn SoundClock>,
    ) -> PreparedAlert {
        let settings = store.get(self);
        let mut mode = settings.mode_config();

        if settings.sync_to_sound {
            match sound_clock.map(|clock| clock.sound_duration()) {
                Some(Ok(duration)) if !duration.is_zero() => {
                    debug!(
                        feature = %self,
                        sound_ms = duration.as_millis() as u64,
                        "Alert duration synced to sound"
                    );
                    mode = mode.with_total_duration(duration);
                }
                Some(Ok(_)) => warn!(
                    feature = %self,
                    "Sound has no duration, keeping configured duration"
                ),
                Some(Err(e)) => warn!(
                    feature = %self,
                    error = %e,
                    "Could not read sound duration, keeping configured duration"
                ),
                None => debug!(feature = %self, "No sound clock, keeping configured duration"),
            }
        }

        let request = AlertRequest::new(self.to_string(), self.pattern_id(), mode)
            .with_sound(settings.sound_enabled);
        let action = self.confirm_action(&settings, mode);

        PreparedAlert {
            feature: self,
            request,
            action,
        }
    }
}

/// A feature's alert, ready to hand to a stage machine.
pub struct PreparedAlert {
    pub feature: Feature,
    pub request: AlertRequest,
    pub action: Box<dyn ConfirmAction>,
}

impl PreparedAlert {
    pub fn into_machine(
        self,
        peripherals: Peripherals,
        options: MachineOptions,
    ) -> Result<AlertStageMachine, MachineError> {
        self.into_machine_with_timing(peripherals, options, StageTiming::default())
    }

    pub fn into_machine_with_timing(
        self,
        peripherals: Peripherals,
        options: MachineOptions,
        timing: StageTiming,
    ) -> Result<AlertStageMachine, MachineError> {
        AlertStageMachine::with_timing(self.request, self.action, peripherals, options, timing)
    }
}
