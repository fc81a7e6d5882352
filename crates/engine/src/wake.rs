//! Keep-awake handle held for the duration of a state-machine operation.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

pub trait WakeLock: Send + Sync {
    fn acquire(&self);

    fn release(&self);
}

/// Scoped hold on a [`WakeLock`]. Released when dropped, on every exit path.
pub struct WakeGuard<'a> {
    lock: &'a dyn WakeLock,
}

impl<'a> WakeGuard<'a> {
    pub fn acquire(lock: &'a dyn WakeLock) -> Self {
        lock.acquire();
        trace!("wake lock acquired");
        Self { lock }
    }
}

impl Drop for WakeGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
        trace!("wake lock released");
    }
}

/// Wake lock for hosts that never sleep; only counts holders.
#[derive(Default)]
pub struct CountingWakeLock {
    held: AtomicUsize,
    acquired_total: AtomicUsize,
}

impl CountingWakeLock {
    pub fn held(&self) -> usize {
        self.held.load(Ordering::SeqCst)
    }

    pub fn acquired_total(&self) -> usize {
        self.acquired_total.load(Ordering::SeqCst)
    }
}

impl WakeLock for CountingWakeLock {
    fn acquire(&self) {
        self.held.fetch_add(1, Ordering::SeqCst);
        self.acquired_total.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.held.fetch_sub(1, Ordering::SeqCst);
    }
}
