//! Object monitors
//!
//! Every heap object carries a monitor. Proxies hand out their subject's
//! monitor, so locking a proxy is locking the array behind it.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for monitor IDs
static NEXT_MONITOR_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorId(u64);

impl MonitorId {
    /// Allocate the next monitor ID
    pub fn new() -> Self {
        Self(NEXT_MONITOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric ID
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for MonitorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Held monitor; released on drop
pub type MonitorGuard<'a> = ReentrantMutexGuard<'a, ()>;

/// Reentrant per-object lock
pub struct Monitor {
    id: MonitorId,
    lock: ReentrantMutex<()>,
}

impl Monitor {
    /// Create an unlocked monitor
    pub fn new() -> Self {
        Self {
            id: MonitorId::new(),
            lock: ReentrantMutex::new(()),
        }
    }

    /// Monitor ID
    pub fn id(&self) -> MonitorId {
        self.id
    }

    /// Block until the monitor is held by this thread
    pub fn enter(&self) -> MonitorGuard<'_> {
        self.lock.lock()
    }

    /// Take the monitor if it is free or already ours
    pub fn try_enter(&self) -> Option<MonitorGuard<'_>> {
        self.lock.try_lock()
    }

    /// Check if any thread holds the monitor
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Check if the current thread holds the monitor
    pub fn is_held_by_current_thread(&self) -> bool {
        self.lock.is_owned_by_current_thread()
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("id", &self.id.as_u64())
            .field("locked", &self.is_locked())
            .finish()
    }
}
