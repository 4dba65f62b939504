//! Glyph animation driver.

use std::time::Duration;

use super::Result;

/// Runs hardware light sequences on the glyph array.
///
/// Drivers are best-effort. The controller keeps its own clock, so a driver
/// that fails to start only costs the visual side effect.
pub trait AnimationDriver: Send + Sync {
    /// Start the named pattern, running for at most `duration`.
    fn start(&self, pattern_id: &str, duration: Duration) -> Result<()>;

    /// Stop whatever pattern is running. Stopping an idle driver is not an
    /// error.
    fn stop(&self) -> Result<()>;
}
