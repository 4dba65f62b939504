//! Feature-supplied work run during the Active stage.

use async_trait::async_trait;
use tokio::sync::watch;

/// The feature-specific part of an alert ("run guard test", "flash the
/// low-battery pattern", ...).
///
/// The machine does not pace the action. It only watches the values pushed
/// into the [`ProgressSink`] and treats 1.0 as completion. Returning `Ok(())`
/// counts as completion too; returning an error cancels the alert.
#[async_trait]
pub trait ConfirmAction: Send + Sync {
    async fn run(&self, progress: ProgressSink) -> anyhow::Result<()>;
}

/// Write side of an action's progress channel.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: watch::Sender<f32>,
}

impl ProgressSink {
    /// Create a sink and the receiver the machine observes.
    pub fn channel() -> (Self, watch::Receiver<f32>) {
        let (tx, rx) = watch::channel(0.0);
        (Self { tx }, rx)
    }

    /// Report progress as a fraction in `[0, 1]`. Out-of-range values are
    /// clamped; NaN is dropped.
    pub fn report(&self, fraction: f32) {
        if fraction.is_nan() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        self.tx.send_if_modified(|current| {
            if *current == fraction {
                false
            } else {
                *current = fraction;
                true
            }
        });
    }

    /// Shorthand for `report(1.0)`.
    pub fn complete(&self) {
        self.report(1.0);
    }

    /// Most recent value reported through this sink.
    pub fn last(&self) -> f32 {
        *self.tx.borrow()
    }
}
