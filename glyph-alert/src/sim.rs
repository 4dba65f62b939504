//! Peripherals that log instead of touching hardware.
//!
//! Used by the `glyph-alert` binary when running off-device, where there are
//! no lights to drive and nothing to play sound through.

use std::time::Duration;

use parking_lot::Mutex;

use crate::hw_trait::{AnimationDriver, HwError, Result, SoundClock, SoundPlayer};
use crate::tracing::prelude::*;

/// Animation driver that logs each start and stop.
#[derive(Debug, Default)]
pub struct LoggingAnimationDriver {
    running: Mutex<Option<String>>,
}

impl LoggingAnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pattern currently "on the lights".
    pub fn running(&self) -> Option<String> {
        self.running.lock().clone()
    }
}

impl AnimationDriver for LoggingAnimationDriver {
    fn start(&self, pattern_id: &str, duration: Duration) -> Result<()> {
        if pattern_id.is_empty() {
            return Err(HwError::InvalidParameter("empty pattern id".into()));
        }
        info!(
            pattern = pattern_id,
            duration_ms = duration.as_millis() as u64,
            "Glyph animation started"
        );
        *self.running.lock() = Some(pattern_id.to_string());
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        match self.running.lock().take() {
            Some(pattern) => info!(%pattern, "Glyph animation stopped"),
            None => debug!("Glyph animation stop with nothing running"),
        }
        Ok(())
    }
}

/// Sound player that logs, with a fixed nominal length for sound sync.
#[derive(Debug)]
pub struct LoggingSoundPlayer {
    length: Duration,
    playing: Mutex<bool>,
}

impl LoggingSoundPlayer {
    pub fn new(length: Duration) -> Self {
        Self {
            length,
            playing: Mutex::new(false),
        }
    }

    pub fn is_playing(&self) -> bool {
        *self.playing.lock()
    }
}

impl SoundPlayer for LoggingSoundPlayer {
    fn play(&self, pattern_id: &str) -> Result<()> {
        info!(pattern = pattern_id, "Alert sound playing");
        *self.playing.lock() = true;
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        if std::mem::take(&mut *self.playing.lock()) {
            info!("Alert sound stopped");
        }
        Ok(())
    }
}

impl SoundClock for LoggingSoundPlayer {
    fn sound_duration(&self) -> Result<Duration> {
        if self.length.is_zero() {
            return Err(HwError::Unavailable("no alert sound loaded".into()));
        }
        Ok(self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_tracks_running_pattern() {
        let driver = LoggingAnimationDriver::new();
        driver.start("usb_guard", Duration::from_secs(30)).unwrap();
        assert_eq!(driver.running().as_deref(), Some("usb_guard"));

        driver.stop().unwrap();
        assert_eq!(driver.running(), None);

        // Stopping again is harmless.
        driver.stop().unwrap();
    }

    #[test]
    fn driver_rejects_empty_pattern() {
        let driver = LoggingAnimationDriver::new();
        assert!(matches!(
            driver.start("", Duration::from_secs(1)),
            Err(HwError::InvalidParameter(_))
        ));
        assert_eq!(driver.running(), None);
    }

    #[test]
    fn sound_play_and_stop() {
        let sound = LoggingSoundPlayer::new(Duration::from_secs(4));
        sound.play("usb_guard").unwrap();
        assert!(sound.is_playing());
        sound.stop().unwrap();
        assert!(!sound.is_playing());
    }

    #[test]
    fn sound_clock_reports_length() {
        let sound = LoggingSoundPlayer::new(Duration::from_millis(2_500));
        assert_eq!(sound.sound_duration().unwrap(), Duration::from_millis(2_500));

        let silent = LoggingSoundPlayer::new(Duration::ZERO);
        assert!(silent.sound_duration().is_err());
    }
}
