//! Audio cue collaborators.

use std::time::Duration;

use super::Result;

/// Plays the audio cue that accompanies an alert.
pub trait SoundPlayer: Send + Sync {
    fn play(&self, pattern_id: &str) -> Result<()>;
    fn stop(&self) -> Result<()>;
}

/// Reports how long the configured alert sound runs, so an animation can be
/// stretched to match it.
pub trait SoundClock: Send + Sync {
    fn sound_duration(&self) -> Result<Duration>;
}
