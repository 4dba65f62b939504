use super::mode::AlertModeConfig;

/// What to run once the alert is armed.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRequest {
    /// Name used in logs and in the wake-lock tag.
    pub label: String,

    /// Pattern handed to the animation driver.
    pub pattern_id: String,

    pub mode: AlertModeConfig,

    /// Whether the audio cue plays. Never true for a silent mode.
    pub play_sound: bool,

    pub wake_lock_tag: String,
}

impl AlertRequest {
    pub fn new(
        label: impl Into<String>,
        pattern_id: impl Into<String>,
        mode: AlertModeConfig,
    ) -> Self {
        let label = label.into();
        Self {
            wake_lock_tag: format!("glyph-alert:{label}"),
            label,
            pattern_id: pattern_id.into(),
            play_sound: mode.has_sound(),
            mode,
        }
    }

    /// Apply the user's sound preference on top of the mode.
    pub fn with_sound(mut self, enabled: bool) -> Self {
        self.play_sound = enabled && self.mode.has_sound();
        self
    }
}
