use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Repeating timer owned by exactly one view.
///
/// The callback runs once synchronously inside `start`, then every
/// `interval` on the runtime until `stop` (or drop). Stopping prevents future
/// ticks only; work the callback already spawned keeps running and must
/// check for disposal itself.
#[derive(Debug)]
pub struct PollScheduler {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl PollScheduler {
    pub fn start<F>(runtime: &Handle, interval: Duration, mut callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        // tokio intervals reject a zero period.
        let period = interval.max(Duration::from_millis(1));
        callback();
        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                callback();
            }
        });
        debug!(event = "poll_start", interval_ms = period.as_millis() as u64);
        Self {
            interval: period,
            task: Some(task),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(event = "poll_stop", interval_ms = self.interval.as_millis() as u64);
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        (count, move || {
            sink.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_immediately_then_every_period() {
        let (count, callback) = counting();
        let _poller = PollScheduler::start(&Handle::current(), Duration::from_secs(5), callback);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(5_200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_halts_ticks() {
        let (count, callback) = counting();
        let mut poller = PollScheduler::start(&Handle::current(), Duration::from_secs(5), callback);
        assert!(poller.is_running());

        poller.stop();
        poller.stop();
        assert!(!poller.is_running());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_scheduler_stops_it() {
        let (count, callback) = counting();
        let poller = PollScheduler::start(&Handle::current(), Duration::from_secs(1), callback);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        drop(poller);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn independent_schedulers_keep_their_own_period() {
        let (fast, fast_cb) = counting();
        let (slow, slow_cb) = counting();
        let _a = PollScheduler::start(&Handle::current(), Duration::from_secs(5), fast_cb);
        let _b = PollScheduler::start(&Handle::current(), Duration::from_secs(10), slow_cb);

        tokio::time::sleep(Duration::from_millis(20_500)).await;
        assert_eq!(fast.load(Ordering::SeqCst), 5);
        assert_eq!(slow.load(Ordering::SeqCst), 3);
    }
}
