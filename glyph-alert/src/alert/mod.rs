//! Timed multi-stage alert controller.
//!
//! An alert goes Confirmation, Countdown, Active, then Completed or
//! Cancelled. [`AlertStageMachine`] sequences the stages and owns the side
//! effects; [`timing`] and [`GuardState`] hold the pure progress math it
//! recomputes on every Active tick.

mod action;
mod config;
mod machine;
mod mode;
mod request;
mod stage;
mod state;
pub mod timing;

#[cfg(test)]
pub(crate) mod testing;

pub use action::{ConfirmAction, ProgressSink};
pub use config::{MachineOptions, StageTiming};
pub use machine::{AlertStageMachine, MachineError, Peripherals};
pub use mode::{AlertMode, AlertModeConfig, MIN_BLINK_INTERVAL, MIN_TOTAL_DURATION};
pub use request::AlertRequest;
pub use stage::{AlertSnapshot, CancelReason, SnapshotView, Stage, StatusText};
pub use state::{GuardState, StatusLabel};
