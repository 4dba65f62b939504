//! Recording peripherals and scripted actions for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::action::{ConfirmAction, ProgressSink};
use super::machine::Peripherals;
use crate::hw_trait::{
    AnimationDriver, ExclusiveWakeLock, HwError, Result, SoundPlayer, WakeLock, WakeLockHandle,
};

#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Start(String, Duration),
    Stop,
}

/// Animation driver that records calls and can be told to fail.
#[derive(Default)]
pub struct RecordingDriver {
    calls: Mutex<Vec<DriverCall>>,
    fail_start: bool,
    fail_stop: bool,
}

impl RecordingDriver {
    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn failing_stop() -> Self {
        Self {
            fail_stop: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| **c == DriverCall::Stop)
            .count()
    }
}

impl AnimationDriver for RecordingDriver {
    fn start(&self, pattern_id: &str, duration: Duration) -> Result<()> {
        self.calls
            .lock()
            .push(DriverCall::Start(pattern_id.to_string(), duration));
        if self.fail_start {
            return Err(HwError::Device("glyph bus timeout".into()));
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.calls.lock().push(DriverCall::Stop);
        if self.fail_stop {
            return Err(HwError::Device("glyph bus timeout".into()));
        }
        Ok(())
    }
}

/// Real exclusive wake-lock with acquire/release counters.
#[derive(Default)]
pub struct CountingWakeLock {
    lock: ExclusiveWakeLock,
    acquires: AtomicUsize,
    releases: AtomicUsize,
}

impl CountingWakeLock {
    /// Counter sharing the exclusivity of `lock`.
    pub fn sharing(lock: &ExclusiveWakeLock) -> Self {
        Self {
            lock: lock.clone(),
            ..Self::default()
        }
    }

    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn is_free(&self) -> bool {
        self.lock.holder_tag().is_none()
    }
}

impl WakeLock for CountingWakeLock {
    fn acquire(&self, tag: &str, max_hold: Duration) -> Result<WakeLockHandle> {
        let handle = self.lock.acquire(tag, max_hold)?;
        self.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    fn release(&self, handle: &WakeLockHandle) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.lock.release(handle)
    }

    fn is_held(&self, handle: &WakeLockHandle) -> bool {
        self.lock.is_held(handle)
    }
}

#[derive(Default)]
pub struct RecordingSound {
    plays: AtomicUsize,
    stops: AtomicUsize,
}

impl RecordingSound {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl SoundPlayer for RecordingSound {
    fn play(&self, _pattern_id: &str) -> Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Handles to everything a test wants to inspect after the machine runs.
pub struct Rig {
    pub driver: Arc<RecordingDriver>,
    pub wake_lock: Arc<CountingWakeLock>,
    pub sound: Arc<RecordingSound>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_driver(RecordingDriver::default())
    }

    pub fn with_driver(driver: RecordingDriver) -> Self {
        Self {
            driver: Arc::new(driver),
            wake_lock: Arc::new(CountingWakeLock::default()),
            sound: Arc::new(RecordingSound::default()),
        }
    }

    pub fn peripherals(&self) -> Peripherals {
        Peripherals {
            animation: self.driver.clone(),
            wake_lock: self.wake_lock.clone(),
            sound: Some(self.sound.clone() as Arc<dyn SoundPlayer>),
        }
    }

    pub fn assert_wake_lock_paired(&self) {
        assert_eq!(
            self.wake_lock.acquires(),
            self.wake_lock.releases(),
            "unpaired wake-lock acquire/release"
        );
        assert!(self.wake_lock.is_free(), "wake-lock still held");
    }
}

/// Progress script step for [`ScriptedAction`].
pub enum Step {
    Report(f32),
    Fail(&'static str),
}

/// Action driven step by step from the test. Runs until the script channel
/// closes, then waits forever without completing on its own.
pub struct ScriptedAction {
    script: Mutex<Option<mpsc::UnboundedReceiver<Step>>>,
}

impl ScriptedAction {
    pub fn new() -> (Box<Self>, mpsc::UnboundedSender<Step>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let action = Self {
            script: Mutex::new(Some(rx)),
        };
        (Box::new(action), tx)
    }
}

#[async_trait]
impl ConfirmAction for ScriptedAction {
    async fn run(&self, progress: ProgressSink) -> anyhow::Result<()> {
        let script = self.script.lock().take();
        let Some(mut script) = script else {
            anyhow::bail!("scripted action ran twice");
        };
        while let Some(step) = script.recv().await {
            match step {
                Step::Report(value) => progress.report(value),
                Step::Fail(message) => anyhow::bail!(message),
            }
        }
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Action that finishes immediately without reporting anything.
pub struct InstantAction;

#[async_trait]
impl ConfirmAction for InstantAction {
    async fn run(&self, _progress: ProgressSink) -> anyhow::Result<()> {
        Ok(())
    }
}
