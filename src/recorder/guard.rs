//! Maximum-duration countdown
//!
//! Counts recorded time only: pausing freezes the countdown and resuming
//! continues from where it stopped.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

type ExpireCallback = Box<dyn FnOnce() + Send + 'static>;

pub struct DurationGuard {
    max: Duration,

    /// Time counted before the current run
    banked: Duration,

    /// Start of the current run, None while paused or disarmed
    running_since: Option<Instant>,

    /// Taken by whoever gets there first: the timer (fires) or cancel (drops)
    on_expire: Arc<Mutex<Option<ExpireCallback>>>,

    fired: Arc<AtomicBool>,

    timer: Option<JoinHandle<()>>,
}

impl DurationGuard {
    /// A disarmed guard
    pub fn new() -> Self {
        Self {
            max: Duration::ZERO,
            banked: Duration::ZERO,
            running_since: None,
            on_expire: Arc::new(Mutex::new(None)),
            fired: Arc::new(AtomicBool::new(false)),
            timer: None,
        }
    }

    /// Start counting down from `max`. Re-arming cancels the previous
    /// countdown without firing it.
    pub fn arm<F>(&mut self, max: Duration, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        self.max = max;
        self.banked = Duration::ZERO;
        self.on_expire = Arc::new(Mutex::new(Some(Box::new(on_expire))));
        self.fired = Arc::new(AtomicBool::new(false));
        tracing::debug!("Duration guard armed for {:?}", max);
        self.schedule();
    }

    /// Freeze the countdown
    pub fn pause(&mut self) {
        let Some(since) = self.running_since.take() else {
            return;
        };
        self.banked += since.elapsed();
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        tracing::debug!("Duration guard paused at {:?}", self.banked);
    }

    /// Continue the countdown without resetting elapsed time
    pub fn resume(&mut self) {
        if self.running_since.is_some() || !self.is_armed() {
            return;
        }
        self.schedule();
    }

    /// Disarm. The callback is dropped and can no longer fire.
    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(since) = self.running_since.take() {
            self.banked += since.elapsed();
        }
        self.on_expire.lock().take();
    }

    /// Whether a callback is still pending
    pub fn is_armed(&self) -> bool {
        self.on_expire.lock().is_some()
    }

    /// Whether the countdown is currently running
    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Counted time so far
    pub fn elapsed(&self) -> Duration {
        self.banked + self.running_since.map(|s| s.elapsed()).unwrap_or_default()
    }

    pub fn remaining(&self) -> Duration {
        self.max.saturating_sub(self.elapsed())
    }

    fn schedule(&mut self) {
        let now = Instant::now();
        let deadline = now + self.remaining();
        let on_expire = self.on_expire.clone();
        let fired = self.fired.clone();
        self.running_since = Some(now);
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let mut slot = on_expire.lock();
            if let Some(callback) = slot.take() {
                fired.store(true, Ordering::SeqCst);
                tracing::info!("Maximum recording duration reached");
                callback();
            }
        }));
    }
}

impl Default for DurationGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DurationGuard {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_at_max() {
        let (count, on_expire) = counter();
        let mut guard = DurationGuard::new();
        guard.arm(Duration::from_secs(3), on_expire);

        sleep_ms(2999).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep_ms(2).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(guard.has_fired());
        assert!(!guard.is_armed());

        sleep_ms(10_000).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_excludes_paused_time() {
        let (count, on_expire) = counter();
        let mut guard = DurationGuard::new();
        guard.arm(Duration::from_secs(3), on_expire);

        sleep_ms(1000).await;
        guard.pause();
        sleep_ms(5000).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(guard.elapsed(), Duration::from_secs(1));

        guard.resume();
        sleep_ms(1999).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(guard.remaining(), Duration::from_millis(1));

        sleep_ms(2).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let (count, on_expire) = counter();
        let mut guard = DurationGuard::new();
        guard.arm(Duration::from_secs(1), on_expire);

        sleep_ms(999).await;
        guard.cancel();
        guard.resume();
        sleep_ms(10_000).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!guard.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_after_deadline_fires_immediately() {
        let (count, on_expire) = counter();
        let mut guard = DurationGuard::new();
        guard.arm(Duration::from_secs(1), on_expire);

        tokio::time::advance(Duration::from_millis(1500)).await;
        guard.pause();
        guard.resume();
        tokio::task::yield_now().await;
        sleep_ms(1).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
