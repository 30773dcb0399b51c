use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

/// Cancellation token shared between an engine and its handles.
///
/// A full [`reset`](Resetter::reset) wakes every suspended
/// [`sleep`](Resetter::sleep) and stays in force until
/// [`resume`](Resetter::resume); steps consult [`is_reset`](Resetter::is_reset)
/// before mutating state. An [`interrupt`](Resetter::interrupt) wakes the
/// currently pending sleeps once without marking the run cancelled, which is
/// how fast-forward cuts the in-flight delay short while letting the run
/// continue.
#[derive(Debug, Clone, Default)]
pub struct Resetter {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    reset: AtomicBool,
    notify: Notify,
}

impl Resetter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.inner.reset.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn resume(&self) {
        self.inner.reset.store(false, Ordering::SeqCst);
    }

    pub fn interrupt(&self) {
        self.inner.notify.notify_waiters();
    }

    pub fn is_reset(&self) -> bool {
        self.inner.reset.load(Ordering::SeqCst)
    }

    /// Suspend for roughly `ms` milliseconds, resolving early on a reset or
    /// an interrupt. Returns immediately when a reset is already in force.
    pub async fn sleep(&self, ms: u64) {
        if self.is_reset() {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
            _ = self.inner.notify.notified() => {}
        }
    }
}
