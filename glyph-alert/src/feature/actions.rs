//! Confirm-actions used by the built-in features.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time;

use crate::alert::{ConfirmAction, ProgressSink};

/// Steady progress across a fixed duration, one report per `step`.
#[derive(Debug, Clone)]
pub struct Sweep {
    duration: Duration,
    step: Duration,
}

impl Sweep {
    pub const DEFAULT_STEP: Duration = Duration::from_millis(250);

    pub fn new(duration: Duration) -> Self {
        Self::with_step(duration, Self::DEFAULT_STEP)
    }

    pub fn with_step(duration: Duration, step: Duration) -> Self {
        Self {
            duration,
            step: step.max(Duration::from_millis(1)),
        }
    }

    fn steps(&self) -> u32 {
        let steps = self.duration.as_nanos().div_ceil(self.step.as_nanos());
        steps.clamp(1, u32::MAX as u128) as u32
    }
}

#[async_trait]
impl ConfirmAction for Sweep {
    async fn run(&self, progress: ProgressSink) -> anyhow::Result<()> {
        let steps = self.steps();
        let step = self.duration / steps;
        for i in 1..steps {
            time::sleep(step).await;
            progress.report(i as f32 / steps as f32);
        }
        time::sleep(step).await;
        progress.complete();
        Ok(())
    }
}

/// "Flash N times over T": one report after each flash.
#[derive(Debug, Clone)]
pub struct FlashSequence {
    flashes: u32,
    over: Duration,
}

impl FlashSequence {
    pub fn new(flashes: u32, over: Duration) -> Self {
        Self {
            flashes: flashes.max(1),
            over,
        }
    }

    pub fn flashes(&self) -> u32 {
        self.flashes
    }
}

#[async_trait]
impl ConfirmAction for FlashSequence {
    async fn run(&self, progress: ProgressSink) -> anyhow::Result<()> {
        let period = self.over / self.flashes;
        for flash in 1..self.flashes {
            time::sleep(period).await;
            progress.report(flash as f32 / self.flashes as f32);
        }
        time::sleep(period).await;
        progress.complete();
        Ok(())
    }
}
