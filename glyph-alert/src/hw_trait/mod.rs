//! Peripheral traits consumed by the alert controller.
//!
//! The controller never talks to hardware directly. Everything with a
//! real-world side effect (lights, sound, keeping the device awake) sits
//! behind one of these traits so the stage machine can be driven by fakes in
//! tests and by platform bindings on a device.
//!
//! All methods are synchronous: cancellation has to stop the lights and drop
//! the wake-lock before `cancel()` returns, so nothing here may await.

pub mod animation;
pub mod sound;
pub mod wake_lock;

pub use animation::AnimationDriver;
pub use sound::{SoundClock, SoundPlayer};
pub use wake_lock::{ExclusiveWakeLock, WakeLock, WakeLockHandle};

/// Errors reported by peripheral implementations.
#[derive(Debug, thiserror::Error)]
pub enum HwError {
    #[error("Resource busy: {0}")]
    Busy(String),

    #[error("Peripheral unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Device error: {0}")]
    Device(String),
}

pub type Result<T> = std::result::Result<T, HwError>;
