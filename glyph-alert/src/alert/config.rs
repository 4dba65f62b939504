use std::time::Duration;

/// Timer constants for the stage machine.
#[derive(Debug, Clone)]
pub struct StageTiming {
    /// Number of countdown steps between confirmation and the alert.
    pub countdown_steps: u8,

    /// Length of one countdown step.
    pub countdown_step: Duration,

    /// How often the Active stage recomputes its guard state. Short enough
    /// for a smooth progress bar.
    pub active_poll: Duration,

    /// How long the finished state stays visible before the machine tears
    /// itself down.
    pub completion_grace: Duration,

    /// Added to the alert duration when sizing the wake-lock's max hold, so
    /// the platform never drops the lock before the grace period ends.
    pub wake_lock_slack: Duration,
}

impl Default for StageTiming {
    fn default() -> Self {
        Self {
            countdown_steps: 5,
            countdown_step: Duration::from_secs(1),
            active_poll: Duration::from_millis(100),
            completion_grace: Duration::from_millis(1500),
            wake_lock_slack: Duration::from_secs(5),
        }
    }
}

/// Per-invocation switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MachineOptions {
    /// Run the confirmation and countdown only. Never arms the alert, never
    /// touches the wake-lock or the animation driver.
    pub test_mode: bool,

    /// Start directly in the Active stage.
    pub skip_confirmation: bool,
}
