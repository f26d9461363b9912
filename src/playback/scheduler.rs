use std::{
    panic::AssertUnwindSafe,
    sync::{Arc, Weak},
    time::Duration,
};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::task::JoinHandle;

/// Something driven by a [`Ticker`].
#[async_trait]
pub trait Tick: Send + Sync + 'static {
    /// Runs one scheduled tick. `generation` identifies the arming that
    /// fired; pass it back to [`Ticker::claim`].
    async fn on_tick(self: Arc<Self>, generation: u64);

    /// Called when `on_tick` panicked. The ticker is not re-armed.
    async fn on_tick_panic(self: Arc<Self>);
}

/// Cancellable, re-armable deferred callback.
///
/// At most one tick is pending at a time: arming replaces the pending one.
/// The pending task holds only a weak reference while it sleeps, so a
/// dropped target never runs again.
pub struct Ticker<T: Tick> {
    target: Weak<T>,
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl<T: Tick> Ticker<T> {
    pub fn new(target: Weak<T>) -> Self {
        Self {
            target,
            handle: None,
            generation: 0,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Schedules the next tick `delay` from now, dropping any pending one.
    pub fn arm(&mut self, delay: Duration) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation = self.generation.wrapping_add(1);

        let generation = self.generation;
        let target = self.target.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(target) = target.upgrade() else {
                return;
            };
            let run = AssertUnwindSafe(target.clone().on_tick(generation)).catch_unwind();
            if run.await.is_err() {
                target.on_tick_panic().await;
            }
        }));
    }

    /// Called from inside a firing tick. Returns false when the tick was
    /// superseded or cancelled. On success the handle is released without
    /// aborting, since it belongs to the running task itself.
    pub fn claim(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.handle = None;
        true
    }

    /// Drops the pending tick; an in-flight one fails its `claim`.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }
}

impl<T: Tick> Drop for Ticker<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        ticker: Mutex<Option<Ticker<Counter>>>,
        fired: AtomicUsize,
        rearm: Option<Duration>,
        panics: AtomicUsize,
        explode: bool,
    }

    impl Counter {
        fn new(rearm: Option<Duration>, explode: bool) -> Arc<Self> {
            Arc::new_cyclic(|weak| Counter {
                ticker: Mutex::new(Some(Ticker::new(weak.clone()))),
                fired: AtomicUsize::new(0),
                rearm,
                panics: AtomicUsize::new(0),
                explode,
            })
        }

        fn arm(&self, delay: Duration) {
            if let Some(ticker) = self.ticker.lock().as_mut() {
                ticker.arm(delay);
            }
        }

        fn cancel(&self) {
            if let Some(ticker) = self.ticker.lock().as_mut() {
                ticker.cancel();
            }
        }
    }

    #[async_trait]
    impl Tick for Counter {
        async fn on_tick(self: Arc<Self>, generation: u64) {
            let mut guard = self.ticker.lock();
            let Some(ticker) = guard.as_mut() else {
                return;
            };
            if !ticker.claim(generation) {
                return;
            }
            self.fired.fetch_add(1, Ordering::SeqCst);
            if self.explode {
                drop(guard);
                panic!("tick exploded");
            }
            if let Some(delay) = self.rearm {
                ticker.arm(delay);
            }
        }

        async fn on_tick_panic(self: Arc<Self>) {
            self.panics.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let counter = Counter::new(None, false);
        counter.arm(Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(900)).await;
        settle().await;
        assert_eq!(counter.fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(counter.fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_from_inside_the_tick_keeps_running() {
        let counter = Counter::new(Some(Duration::from_secs(5)), false);
        counter.arm(Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(21_500)).await;
        settle().await;
        // t = 1, 6, 11, 16, 21
        assert_eq!(counter.fired.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_pending_tick() {
        let counter = Counter::new(None, false);
        counter.arm(Duration::from_secs(1));
        counter.arm(Duration::from_secs(3));

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(counter.fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(counter.fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_everything() {
        let counter = Counter::new(Some(Duration::from_secs(1)), false);
        counter.arm(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        settle().await;
        let seen = counter.fired.load(Ordering::SeqCst);
        assert_eq!(seen, 2);

        counter.cancel();
        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(counter.fired.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_target_never_fires() {
        let counter = Counter::new(None, false);
        counter.arm(Duration::from_secs(1));
        let weak = Arc::downgrade(&counter);
        // take the ticker out so the pending task is not aborted by Drop
        let ticker = counter.ticker.lock().take();
        drop(counter);
        assert!(weak.upgrade().is_none());

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert!(ticker.is_some_and(|t| !t.is_armed()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_is_reported_not_rearmed() {
        let counter = Counter::new(Some(Duration::from_secs(1)), true);
        counter.arm(Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(counter.fired.load(Ordering::SeqCst), 1);
        assert_eq!(counter.panics.load(Ordering::SeqCst), 1);
    }
}
