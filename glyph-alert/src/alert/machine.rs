//! The alert stage machine.
//!
//! ```text
//!               confirm              countdown hits 0
//!  Confirmation ───────► Countdown ──────────────────► Active ──► Completed
//!       │                   │    └── (test mode) ──────────────► Completed
//!       │ cancel            │ cancel                    │ stop / action error
//!       ▼                   ▼                           ▼
//!   Cancelled           Cancelled                   Cancelled
//! ```
//!
//! Each stage owns a child [`CancellationToken`] of the machine's root
//! token. Timer tasks (countdown steps, the Active poll, the completion grace
//! period) and the running confirm-action are scoped to that token, and every
//! tick re-checks token and stage under the machine lock before touching
//! anything. A command that wins the lock first therefore always beats a tick
//! that was already scheduled; the tick finds the stage moved on and does
//! nothing.
//!
//! The confirm-action decides when an alert is done, but the Active stage
//! never outlives the alert duration plus the grace period: past that the
//! poll drops the action and completes on its own.
//!
//! Peripheral failures never escape. A missing wake-lock or a driver that
//! will not start degrades the alert to its visual timing only, and teardown
//! keeps going past a driver that refuses to stop.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

use super::action::{ConfirmAction, ProgressSink};
use super::config::{MachineOptions, StageTiming};
use super::request::AlertRequest;
use super::stage::{AlertSnapshot, CancelReason, Stage};
use super::state::GuardState;
use crate::hw_trait::{AnimationDriver, SoundPlayer, WakeLock, WakeLockHandle};
use crate::tracing::prelude::*;

/// Shortest period accepted for a timer; `tokio::time::interval` rejects
/// zero.
const MIN_TIMER_PERIOD: Duration = Duration::from_millis(1);

/// Errors creating an [`AlertStageMachine`].
#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    #[error("skip_confirmation starts the alert right away and needs a Tokio runtime")]
    NoRuntime,
}

/// Hardware the machine drives during the Active stage.
#[derive(Clone)]
pub struct Peripherals {
    pub animation: Arc<dyn AnimationDriver>,
    pub wake_lock: Arc<dyn WakeLock>,
    pub sound: Option<Arc<dyn SoundPlayer>>,
}

/// Controller for one alert invocation.
///
/// Created when the user asks for an alert, driven by
/// [`confirm_and_proceed`](Self::confirm_and_proceed),
/// [`cancel`](Self::cancel) and [`stop`](Self::stop), and observed through
/// [`subscribe`](Self::subscribe). Dropping the machine disposes it, which
/// cancels an unfinished run and releases the wake-lock.
pub struct AlertStageMachine {
    inner: Arc<Inner>,
}

struct Inner {
    request: AlertRequest,
    options: MachineOptions,
    timing: StageTiming,
    peripherals: Peripherals,
    core: Mutex<Core>,
    snapshot_tx: watch::Sender<AlertSnapshot>,
    root: CancellationToken,
}

/// Mutable machine state, only touched under `Inner::core`.
struct Core {
    stage: Stage,
    countdown_remaining: u8,
    active_since: Option<Instant>,
    guard: GuardState,
    action_progress: f32,

    /// Completion reported, waiting out the grace period.
    completing: bool,

    cancel_reason: Option<CancelReason>,
    wake_lock: Option<WakeLockHandle>,
    animation_running: bool,
    sound_playing: bool,

    /// Taken when the Active stage starts; runs at most once.
    action: Option<Box<dyn ConfirmAction>>,

    stage_token: CancellationToken,
}

impl Core {
    fn snapshot(&self) -> AlertSnapshot {
        AlertSnapshot {
            stage: self.stage,
            countdown_remaining: self.countdown_remaining,
            guard: self.guard,
            action_progress: self.action_progress,
            cancel_reason: self.cancel_reason,
        }
    }
}

impl AlertStageMachine {
    /// Create a machine with the default [`StageTiming`].
    ///
    /// With `skip_confirmation` set the Active stage starts right away, which
    /// spawns tasks; outside a Tokio runtime this fails with
    /// [`MachineError::NoRuntime`].
    pub fn new(
        request: AlertRequest,
        action: Box<dyn ConfirmAction>,
        peripherals: Peripherals,
        options: MachineOptions,
    ) -> Result<Self, MachineError> {
        Self::with_timing(request, action, peripherals, options, StageTiming::default())
    }

    pub fn with_timing(
        request: AlertRequest,
        action: Box<dyn ConfirmAction>,
        peripherals: Peripherals,
        options: MachineOptions,
        timing: StageTiming,
    ) -> Result<Self, MachineError> {
        let starts_active = options.skip_confirmation && !options.test_mode;
        if starts_active && Handle::try_current().is_err() {
            return Err(MachineError::NoRuntime);
        }

        let root = CancellationToken::new();
        let core = Core {
            stage: Stage::Confirmation,
            countdown_remaining: timing.countdown_steps,
            active_since: None,
            guard: GuardState::idle(request.mode),
            action_progress: 0.0,
            completing: false,
            cancel_reason: None,
            wake_lock: None,
            animation_running: false,
            sound_playing: false,
            action: Some(action),
            stage_token: root.child_token(),
        };
        let (snapshot_tx, _) = watch::channel(core.snapshot());

        info!(
            feature = %request.label,
            test_mode = options.test_mode,
            skip_confirmation = options.skip_confirmation,
            duration_ms = request.mode.total_duration().as_millis() as u64,
            "Alert created"
        );

        let inner = Arc::new(Inner {
            request,
            options,
            timing,
            peripherals,
            core: Mutex::new(core),
            snapshot_tx,
            root,
        });

        if options.skip_confirmation {
            if options.test_mode {
                debug!(
                    feature = %inner.request.label,
                    "Test mode never arms the alert, ignoring skip_confirmation"
                );
            } else {
                let mut core = inner.core.lock();
                inner.enter_active(&mut core);
            }
        }

        Ok(Self { inner })
    }

    /// Confirm the alert and start the countdown.
    ///
    /// Returns `false` (and does nothing) outside the Confirmation stage.
    pub fn confirm_and_proceed(&self) -> bool {
        self.inner.confirm_and_proceed()
    }

    /// Back out of the alert from any non-terminal stage.
    ///
    /// Stops the lights if they were started, releases the wake-lock and
    /// cancels pending timers before returning. Returns `false` if the run
    /// had already finished.
    pub fn cancel(&self) -> bool {
        self.inner.abort(CancelReason::User, "cancel")
    }

    /// Stop a running alert. Same teardown as [`cancel`](Self::cancel).
    pub fn stop(&self) -> bool {
        self.inner.abort(CancelReason::User, "stop")
    }

    /// Forced teardown for when the host goes away. Also runs on drop.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn request(&self) -> &AlertRequest {
        &self.inner.request
    }

    pub fn current_stage(&self) -> Stage {
        self.inner.core.lock().stage
    }

    pub fn countdown_remaining(&self) -> u8 {
        self.inner.core.lock().countdown_remaining
    }

    pub fn guard_state(&self) -> GuardState {
        self.inner.core.lock().guard
    }

    pub fn snapshot(&self) -> AlertSnapshot {
        self.inner.core.lock().snapshot()
    }

    pub fn status_text(&self) -> String {
        self.snapshot().status_text().to_string()
    }

    /// Whether this machine currently owns the wake-lock.
    pub fn wake_lock_held(&self) -> bool {
        let core = self.inner.core.lock();
        core.wake_lock
            .as_ref()
            .is_some_and(|h| self.inner.peripherals.wake_lock.is_held(h))
    }

    pub fn subscribe(&self) -> watch::Receiver<AlertSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Snapshot stream, starting with the current state.
    pub fn updates(&self) -> WatchStream<AlertSnapshot> {
        WatchStream::new(self.subscribe())
    }

    /// Resolve once the run reaches Completed or Cancelled.
    pub async fn wait_for_terminal(&self) -> Stage {
        let mut rx = self.subscribe();
        let stage = rx
            .wait_for(|snapshot| snapshot.stage.is_terminal())
            .await
            .map(|snapshot| snapshot.stage);
        match stage {
            Ok(stage) => stage,
            Err(_) => self.current_stage(),
        }
    }
}

impl Drop for AlertStageMachine {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl Inner {
    fn publish(&self, core: &Core) {
        self.snapshot_tx.send_replace(core.snapshot());
    }

    fn set_stage(&self, core: &mut Core, to: Stage) {
        let from = core.stage;
        core.stage = to;
        info!(feature = %self.request.label, %from, %to, "Alert stage changed");
    }

    /// Retire the current stage's timers and hand out a token for the next.
    fn next_stage_token(&self, core: &mut Core) -> CancellationToken {
        core.stage_token.cancel();
        core.stage_token = self.root.child_token();
        core.stage_token.clone()
    }

    fn confirm_and_proceed(self: &Arc<Self>) -> bool {
        let mut core = self.core.lock();
        if core.stage != Stage::Confirmation {
            debug!(
                feature = %self.request.label,
                stage = %core.stage,
                "Confirm ignored outside confirmation"
            );
            return false;
        }

        core.countdown_remaining = self.timing.countdown_steps;
        let token = self.next_stage_token(&mut core);
        self.set_stage(&mut core, Stage::Countdown);

        if core.countdown_remaining == 0 {
            self.finish_countdown(&mut core);
        } else {
            self.publish(&core);
            self.spawn_countdown(token);
        }
        true
    }

    fn spawn_countdown(self: &Arc<Self>, token: CancellationToken) {
        let inner = Arc::clone(self);
        let step = self.timing.countdown_step.max(MIN_TIMER_PERIOD);
        let first = Instant::now() + step;

        tokio::spawn(async move {
            let mut ticks = time::interval_at(first, step);
            // One decrement per tick, even if the runtime falls behind.
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticks.tick() => {
                        if !inner.countdown_tick(&token) {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Returns whether the countdown should keep ticking.
    fn countdown_tick(self: &Arc<Self>, token: &CancellationToken) -> bool {
        let mut core = self.core.lock();
        if token.is_cancelled() || core.stage != Stage::Countdown {
            trace!(feature = %self.request.label, stage = %core.stage, "Stale countdown tick");
            return false;
        }

        core.countdown_remaining = core.countdown_remaining.saturating_sub(1);
        if core.countdown_remaining > 0 {
            debug!(
                feature = %self.request.label,
                remaining = core.countdown_remaining,
                "Countdown"
            );
            self.publish(&core);
            return true;
        }

        self.finish_countdown(&mut core);
        false
    }

    fn finish_countdown(self: &Arc<Self>, core: &mut Core) {
        if self.options.test_mode {
            info!(
                feature = %self.request.label,
                "Test mode countdown finished, alert not armed"
            );
            self.enter_terminal(core, Stage::Completed, None);
        } else {
            self.enter_active(core);
        }
    }

    fn enter_active(self: &Arc<Self>, core: &mut Core) {
        let token = self.next_stage_token(core);
        core.active_since = Some(Instant::now());
        core.guard = GuardState::started(self.request.mode);
        core.action_progress = 0.0;
        self.set_stage(core, Stage::Active);

        self.acquire_wake_lock(core);
        self.start_animation(core);
        self.start_sound(core);
        self.publish(core);

        self.spawn_active_poll(token.clone());
        match core.action.take() {
            Some(action) => self.spawn_action(action, token),
            None => warn!(
                feature = %self.request.label,
                "Confirm action already consumed"
            ),
        }
    }

    fn spawn_active_poll(self: &Arc<Self>, token: CancellationToken) {
        let inner = Arc::clone(self);
        let poll = self.timing.active_poll.max(MIN_TIMER_PERIOD);
        let first = Instant::now() + poll;

        tokio::spawn(async move {
            let mut ticks = time::interval_at(first, poll);
            // Guard state is recomputed from elapsed time, so late ticks
            // can simply be dropped.
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticks.tick() => {
                        if !inner.active_tick(&token) {
                            break;
                        }
                    }
                }
            }
        });
    }

    fn active_tick(&self, token: &CancellationToken) -> bool {
        let mut core = self.core.lock();
        if token.is_cancelled() || core.stage != Stage::Active || core.completing {
            return false;
        }

        let elapsed = core
            .active_since
            .map(|since| since.elapsed())
            .unwrap_or_default();
        core.guard = core.guard.update_from_elapsed(elapsed);

        if elapsed >= self.active_deadline() {
            warn!(
                feature = %self.request.label,
                elapsed_ms = elapsed.as_millis() as u64,
                "Confirm action overran the alert, completing on local clock"
            );
            self.release_wake_lock(&mut core);
            self.enter_terminal(&mut core, Stage::Completed, None);
            return false;
        }

        self.publish(&core);
        true
    }

    /// Longest the Active stage may run without the action reporting
    /// completion.
    fn active_deadline(&self) -> Duration {
        self.request.mode.total_duration() + self.timing.completion_grace
    }

    fn spawn_action(self: &Arc<Self>, action: Box<dyn ConfirmAction>, token: CancellationToken) {
        let inner = Arc::clone(self);

        tokio::spawn(async move {
            let (sink, mut progress) = ProgressSink::channel();
            let mut run = action.run(sink);
            let mut reporting = true;

            loop {
                tokio::select! {
                    biased;
                    // Dropping `run` cancels the action.
                    _ = token.cancelled() => break,
                    changed = progress.changed(), if reporting => match changed {
                        Ok(()) => {
                            let value = *progress.borrow_and_update();
                            inner.on_progress(value, &token);
                        }
                        Err(_) => reporting = false,
                    },
                    result = &mut run => {
                        match result {
                            Ok(()) => inner.on_progress(1.0, &token),
                            Err(e) => inner.on_action_failed(e, &token),
                        }
                        break;
                    }
                }
            }
        });
    }

    fn on_progress(self: &Arc<Self>, value: f32, token: &CancellationToken) {
        let mut core = self.core.lock();
        if token.is_cancelled() || core.stage != Stage::Active {
            return;
        }

        core.action_progress = value;
        if value >= 1.0 && !core.completing {
            core.completing = true;
            info!(
                feature = %self.request.label,
                grace_ms = self.timing.completion_grace.as_millis() as u64,
                "Alert finished, dismissing after grace period"
            );
            self.spawn_completion(token.clone());
        }
        self.publish(&core);
    }

    fn spawn_completion(self: &Arc<Self>, token: CancellationToken) {
        let inner = Arc::clone(self);
        let deadline = Instant::now() + self.timing.completion_grace;

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = time::sleep_until(deadline) => inner.finish_completed(&token),
            }
        });
    }

    fn finish_completed(&self, token: &CancellationToken) {
        let mut core = self.core.lock();
        if token.is_cancelled() || core.stage != Stage::Active || !core.completing {
            return;
        }

        self.release_wake_lock(&mut core);
        self.enter_terminal(&mut core, Stage::Completed, None);
    }

    fn on_action_failed(&self, error: anyhow::Error, token: &CancellationToken) {
        let mut core = self.core.lock();
        if token.is_cancelled() || core.stage != Stage::Active {
            return;
        }
        if core.completing {
            debug!(
                feature = %self.request.label,
                error = %format!("{error:#}"),
                "Confirm action failed after reporting completion"
            );
            return;
        }

        warn!(
            feature = %self.request.label,
            error = %format!("{error:#}"),
            "Confirm action failed, cancelling alert"
        );
        self.teardown(&mut core, CancelReason::ActionFailed);
    }

    fn abort(&self, reason: CancelReason, command: &'static str) -> bool {
        let mut core = self.core.lock();
        if core.stage.is_terminal() {
            debug!(
                feature = %self.request.label,
                command,
                stage = %core.stage,
                "Command ignored on finished alert"
            );
            return false;
        }

        self.teardown(&mut core, reason);
        true
    }

    fn dispose(&self) {
        let mut core = self.core.lock();
        if !core.stage.is_terminal() {
            self.teardown(&mut core, CancelReason::Disposed);
        } else {
            self.release_wake_lock(&mut core);
        }
        self.root.cancel();
    }

    /// Cancellation path: lights off, wake-lock released, timers cancelled,
    /// then the stage change, in that order.
    fn teardown(&self, core: &mut Core, reason: CancelReason) {
        self.stop_animation(core);
        self.stop_sound(core);
        self.release_wake_lock(core);
        self.enter_terminal(core, Stage::Cancelled, Some(reason));
    }

    fn enter_terminal(&self, core: &mut Core, stage: Stage, reason: Option<CancelReason>) {
        core.stage_token.cancel();
        self.root.cancel();
        core.completing = false;
        core.guard = core.guard.deactivated();
        core.cancel_reason = reason;
        core.action = None;
        self.set_stage(core, stage);
        self.publish(core);
    }

    fn acquire_wake_lock(&self, core: &mut Core) {
        let wake_lock = &self.peripherals.wake_lock;
        if core.wake_lock.as_ref().is_some_and(|h| wake_lock.is_held(h)) {
            debug!(feature = %self.request.label, "Wake-lock already held");
            return;
        }

        let max_hold = self.request.mode.total_duration()
            + self.timing.completion_grace
            + self.timing.wake_lock_slack;
        match wake_lock.acquire(&self.request.wake_lock_tag, max_hold) {
            Ok(handle) => {
                debug!(
                    feature = %self.request.label,
                    tag = %handle.tag(),
                    max_hold_ms = max_hold.as_millis() as u64,
                    "Wake-lock acquired"
                );
                core.wake_lock = Some(handle);
            }
            Err(e) => warn!(
                feature = %self.request.label,
                error = %e,
                "Wake-lock unavailable, alert runs without it"
            ),
        }
    }

    fn release_wake_lock(&self, core: &mut Core) {
        let Some(handle) = core.wake_lock.take() else {
            return;
        };
        let wake_lock = &self.peripherals.wake_lock;
        // Every acquire gets its release, even after the platform lapsed the
        // lock. Releasing a stale handle is a no-op.
        if !wake_lock.is_held(&handle) {
            debug!(feature = %self.request.label, "Wake-lock lapsed before release");
        }
        match wake_lock.release(&handle) {
            Ok(()) => debug!(feature = %self.request.label, "Wake-lock released"),
            Err(e) => warn!(
                feature = %self.request.label,
                error = %e,
                "Wake-lock release failed"
            ),
        }
    }

    fn start_animation(&self, core: &mut Core) {
        let pattern = &self.request.pattern_id;
        match self
            .peripherals
            .animation
            .start(pattern, self.request.mode.total_duration())
        {
            Ok(()) => core.animation_running = true,
            Err(e) => warn!(
                feature = %self.request.label,
                %pattern,
                error = %e,
                "Animation failed to start, continuing on local clock"
            ),
        }
    }

    fn stop_animation(&self, core: &mut Core) {
        if !std::mem::take(&mut core.animation_running) {
            return;
        }
        if let Err(e) = self.peripherals.animation.stop() {
            warn!(
                feature = %self.request.label,
                error = %e,
                "Animation failed to stop"
            );
        }
    }

    fn start_sound(&self, core: &mut Core) {
        if !self.request.play_sound {
            return;
        }
        let Some(sound) = &self.peripherals.sound else {
            debug!(feature = %self.request.label, "No sound player, alert is silent");
            return;
        };
        match sound.play(&self.request.pattern_id) {
            Ok(()) => core.sound_playing = true,
            Err(e) => warn!(
                feature = %self.request.label,
                error = %e,
                "Alert sound failed to play"
            ),
        }
    }

    fn stop_sound(&self, core: &mut Core) {
        if !std::mem::take(&mut core.sound_playing) {
            return;
        }
        if let Some(sound) = &self.peripherals.sound {
            if let Err(e) = sound.stop() {
                warn!(feature = %self.request.label, error = %e, "Alert sound failed to stop");
            }
        }
    }
}
