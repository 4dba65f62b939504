use std::fmt;
use std::time::Duration;

use super::mode::AlertModeConfig;
use super::timing;

/// Snapshot of an alert's derived timing outputs.
///
/// `progress`, `remaining_seconds` and `should_blink` only ever come from
/// [`update_from_elapsed`](Self::update_from_elapsed); there is no way to set
/// them directly. [`deactivated`](Self::deactivated) freezes them and turns
/// the blink off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardState {
    mode: AlertModeConfig,
    is_active: bool,
    progress: f32,
    remaining_seconds: u64,
    should_blink: bool,
}

impl GuardState {
    /// Idle state for `mode`: nothing elapsed, full duration remaining.
    pub fn idle(mode: AlertModeConfig) -> Self {
        Self::derive(mode, false, Duration::ZERO)
    }

    /// Freshly started alert for `mode`.
    pub fn started(mode: AlertModeConfig) -> Self {
        Self::derive(mode, true, Duration::ZERO)
    }

    /// New snapshot at `elapsed`, keeping mode and active flag.
    pub fn update_from_elapsed(&self, elapsed: Duration) -> Self {
        Self::derive(self.mode, self.is_active, elapsed)
    }

    /// Final state once the alert has stopped running.
    pub fn deactivated(&self) -> Self {
        Self {
            is_active: false,
            should_blink: false,
            ..*self
        }
    }

    fn derive(mode: AlertModeConfig, is_active: bool, elapsed: Duration) -> Self {
        Self {
            mode,
            is_active,
            progress: timing::progress(elapsed, mode.total_duration()),
            remaining_seconds: timing::remaining_seconds(elapsed, mode.total_duration()),
            should_blink: timing::should_blink(elapsed, mode.blink_interval()),
        }
    }

    pub fn mode(&self) -> AlertModeConfig {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn should_blink(&self) -> bool {
        self.should_blink
    }

    pub fn status_label(&self) -> StatusLabel {
        match (self.is_active, self.remaining_seconds) {
            (false, _) => StatusLabel::Ready,
            (true, 0) => StatusLabel::Complete,
            (true, secs) => StatusLabel::Remaining(secs),
        }
    }
}

/// Human-readable status derived from a [`GuardState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    Ready,
    Remaining(u64),
    Complete,
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLabel::Ready => write!(f, "Ready"),
            StatusLabel::Remaining(secs) => write!(f, "Alert Active — {secs}s remaining"),
            StatusLabel::Complete => write!(f, "Alert Complete"),
        }
    }
}
