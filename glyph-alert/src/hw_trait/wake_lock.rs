//! Wake-lock resource.
//!
//! A wake-lock keeps the display and CPU awake while an alert runs. It is a
//! process-wide exclusive resource: at most one holder at a time, and every
//! acquire must be paired with a release.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::{HwError, Result};
use crate::tracing::prelude::*;

/// Proof of ownership returned by [`WakeLock::acquire`].
///
/// Handles are plain tokens; dropping one does not release the lock. Owners
/// must hand it back through [`WakeLock::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeLockHandle {
    id: u64,
    tag: String,
}

impl WakeLockHandle {
    pub fn new(id: u64, tag: impl Into<String>) -> Self {
        Self {
            id,
            tag: tag.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

/// OS-provided wake-lock.
pub trait WakeLock: Send + Sync {
    /// Take the lock. The platform drops it on its own after `max_hold`.
    fn acquire(&self, tag: &str, max_hold: Duration) -> Result<WakeLockHandle>;

    /// Give the lock back. Releasing a handle that no longer holds the lock
    /// is a no-op.
    fn release(&self, handle: &WakeLockHandle) -> Result<()>;

    /// Whether `handle` still owns the lock.
    fn is_held(&self, handle: &WakeLockHandle) -> bool;
}

#[derive(Debug)]
struct Holder {
    id: u64,
    tag: String,
    expires_at: Instant,
}

/// In-process wake-lock enforcing single ownership across every clone.
///
/// Mirrors the semantics of the platform lock: a second acquire while the
/// lock is held fails with [`HwError::Busy`], and an unreleased lock lapses
/// once its `max_hold` runs out.
#[derive(Debug, Clone, Default)]
pub struct ExclusiveWakeLock {
    holder: Arc<Mutex<Option<Holder>>>,
    next_id: Arc<AtomicU64>,
}

impl ExclusiveWakeLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag of the current holder, if any.
    pub fn holder_tag(&self) -> Option<String> {
        let holder = self.holder.lock();
        holder
            .as_ref()
            .filter(|h| Instant::now() < h.expires_at)
            .map(|h| h.tag.clone())
    }
}

impl WakeLock for ExclusiveWakeLock {
    fn acquire(&self, tag: &str, max_hold: Duration) -> Result<WakeLockHandle> {
        if max_hold.is_zero() {
            return Err(HwError::InvalidParameter("wake-lock max hold must be non-zero".into()));
        }

        let now = Instant::now();
        let mut holder = self.holder.lock();

        if let Some(current) = holder.as_ref() {
            if now < current.expires_at {
                return Err(HwError::Busy(format!("wake-lock held by {}", current.tag)));
            }
            debug!(tag = %current.tag, "Previous wake-lock holder lapsed");
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        *holder = Some(Holder {
            id,
            tag: tag.to_string(),
            expires_at: now + max_hold,
        });

        trace!(tag, id, max_hold_ms = max_hold.as_millis() as u64, "Wake-lock acquired");
        Ok(WakeLockHandle::new(id, tag))
    }

    fn release(&self, handle: &WakeLockHandle) -> Result<()> {
        let mut holder = self.holder.lock();
        match holder.as_ref() {
            Some(current) if current.id == handle.id => {
                *holder = None;
                trace!(tag = %handle.tag, id = handle.id, "Wake-lock released");
            }
            _ => debug!(tag = %handle.tag, id = handle.id, "Release of stale wake-lock handle"),
        }
        Ok(())
    }

    fn is_held(&self, handle: &WakeLockHandle) -> bool {
        let holder = self.holder.lock();
        holder
            .as_ref()
            .is_some_and(|h| h.id == handle.id && Instant::now() < h.expires_at)
    }
}
