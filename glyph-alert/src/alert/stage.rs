use std::fmt;

use serde::Serialize;
use strum::Display;

use super::state::GuardState;

/// Stages of an alert run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Confirmation,
    Countdown,
    Active,
    Completed,
    Cancelled,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Completed | Stage::Cancelled)
    }
}

/// Why a run ended in [`Stage::Cancelled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// `cancel()` or `stop()` from the user.
    User,

    /// The feature's confirm-action returned an error.
    ActionFailed,

    /// The host tore the machine down before it finished.
    Disposed,
}

/// Everything a presentation layer needs to render an alert run.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertSnapshot {
    pub stage: Stage,
    pub countdown_remaining: u8,
    pub guard: GuardState,

    /// Last progress value reported by the confirm-action.
    pub action_progress: f32,

    pub cancel_reason: Option<CancelReason>,
}

impl AlertSnapshot {
    pub fn status_text(&self) -> StatusText<'_> {
        StatusText(self)
    }
}

/// Display adapter for [`AlertSnapshot::status_text`].
pub struct StatusText<'a>(&'a AlertSnapshot);

impl fmt::Display for StatusText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.0;
        match snapshot.stage {
            Stage::Confirmation => write!(f, "Confirm to arm"),
            Stage::Countdown => write!(f, "Starting in {}", snapshot.countdown_remaining),
            Stage::Active => write!(f, "{}", snapshot.guard.status_label()),
            Stage::Completed => write!(f, "Complete!"),
            Stage::Cancelled => match snapshot.cancel_reason {
                Some(CancelReason::ActionFailed) => write!(f, "Alert failed"),
                _ => write!(f, "Cancelled"),
            },
        }
    }
}

/// Flat, serializable view of a snapshot for hosts that forward state over
/// a wire (the binary prints these as JSON lines).
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotView {
    pub stage: Stage,
    pub countdown_remaining: u8,
    pub progress: f32,
    pub remaining_seconds: u64,
    pub should_blink: bool,
    pub action_progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<CancelReason>,
    pub status: String,
}

impl From<&AlertSnapshot> for SnapshotView {
    fn from(snapshot: &AlertSnapshot) -> Self {
        Self {
            stage: snapshot.stage,
            countdown_remaining: snapshot.countdown_remaining,
            progress: snapshot.guard.progress(),
            remaining_seconds: snapshot.guard.remaining_seconds(),
            should_blink: snapshot.guard.should_blink(),
            action_progress: snapshot.action_progress,
            cancel_reason: snapshot.cancel_reason,
            status: snapshot.status_text().to_string(),
        }
    }
}
