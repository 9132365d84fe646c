//! Periodic refresh timer
//!
//! At most one tick loop runs per [`RefreshTimer`]. Restarting cancels the previous loop
//! before spawning the next one, and dropping the timer cancels whatever is running.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

/// Decrements the live loop count when a tick loop ends, including on abort.
struct LoopGuard(Arc<AtomicUsize>);

impl Drop for LoopGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct RefreshTimer<E> {
    period: Duration,
    make_event: fn(u64) -> E,
    handle: Option<JoinHandle<()>>,
    generation: u64,
    live_loops: Arc<AtomicUsize>,
}

impl<E: Send + 'static> RefreshTimer<E> {
    /// `make_event` builds the event sent on every tick from the loop generation.
    pub fn new(period: Duration, make_event: fn(u64) -> E) -> Self {
        RefreshTimer {
            period,
            make_event,
            handle: None,
            generation: 0,
            live_loops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Generation of the loop started last. Ticks carry it so late ticks can be told apart.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancels any running loop and starts a new one whose first tick fires one period from now.
    pub fn restart(&mut self, events: mpsc::Sender<E>) {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let period = self.period;
        let make_event = self.make_event;
        let guard = LoopGuard(Arc::clone(&self.live_loops));
        self.live_loops.fetch_add(1, Ordering::SeqCst);

        debug!(generation, ?period, "Starting refresh timer");
        self.handle = Some(tokio::spawn(async move {
            let _guard = guard;
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if events.send(make_event(generation)).await.is_err() {
                    debug!(generation, "Event receiver gone, stopping refresh timer");
                    break;
                }
            }
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!(generation = self.generation, "Cancelling refresh timer");
            handle.abort();
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Number of tick loops that have not yet wound down.
    pub fn live_loops(&self) -> usize {
        self.live_loops.load(Ordering::SeqCst)
    }
}

impl<E> Drop for RefreshTimer<E> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_after_each_period() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timer = RefreshTimer::new(Duration::from_secs(60), |generation| generation);
        timer.restart(tx);

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(rx.try_recv().is_err());

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(1));
        assert!(timer.is_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_leaves_single_loop() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timer = RefreshTimer::new(Duration::from_secs(60), |generation| generation);

        for _ in 0..5 {
            timer.restart(tx.clone());
        }
        settle().await;

        assert_eq!(timer.generation(), 5);
        assert_eq!(timer.live_loops(), 1);

        // Only the last loop delivers ticks.
        assert_eq!(rx.recv().await, Some(5));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let (tx, mut rx) = mpsc::channel::<u64>(8);
        let mut timer = RefreshTimer::new(Duration::from_secs(1), |generation| generation);
        timer.restart(tx);
        timer.cancel();
        settle().await;

        assert!(!timer.is_scheduled());
        assert_eq!(timer.live_loops(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_loop() {
        let (tx, mut rx) = mpsc::channel::<u64>(8);
        let mut timer = RefreshTimer::new(Duration::from_secs(1), |generation| generation);
        timer.restart(tx);
        let live = Arc::clone(&timer.live_loops);
        drop(timer);
        settle().await;

        assert_eq!(live.load(Ordering::SeqCst), 0);
        // Sender is dropped with the aborted loop.
        assert_eq!(rx.recv().await, None);
    }
}
