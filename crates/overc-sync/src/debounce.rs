use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

type Action = Arc<dyn Fn() + Send + Sync>;

/// Trailing-edge debounce: a burst of `signal` calls collapses into one
/// invocation of the action, `delay` after the last signal.
pub struct Debouncer {
    runtime: Handle,
    delay: Duration,
    action: Action,
    pending: Mutex<Option<JoinHandle<()>>>,
    cancelled: AtomicBool,
}

impl Debouncer {
    pub fn new<F>(runtime: &Handle, delay: Duration, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            runtime: runtime.clone(),
            delay,
            action: Arc::new(action),
            pending: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        }
    }

    fn pending(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Restarts the timer. Ignored after `cancel`.
    pub fn signal(&self) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        let mut pending = self.pending();
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        let action = Arc::clone(&self.action);
        let delay = self.delay;
        *pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        }));
    }

    pub fn is_pending(&self) -> bool {
        self.pending()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Drops any pending invocation and ignores every later signal.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(task) = self.pending().take() {
            task.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("cancelled", &self.cancelled.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn recording(delay_ms: u64) -> (Arc<Mutex<Vec<Instant>>>, Debouncer) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        let debouncer = Debouncer::new(&Handle::current(), Duration::from_millis(delay_ms), move || {
            sink.lock().expect("fired lock").push(Instant::now());
        });
        (fired, debouncer)
    }

    async fn advance_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_into_one_call_after_last_signal() {
        let (fired, debouncer) = recording(100);
        let start = Instant::now();

        debouncer.signal();
        advance_ms(30).await;
        debouncer.signal();
        advance_ms(30).await;
        debouncer.signal();
        advance_ms(90).await;
        debouncer.signal();

        advance_ms(99).await;
        assert!(fired.lock().expect("fired lock").is_empty());
        assert!(debouncer.is_pending());

        advance_ms(500).await;
        let fired = fired.lock().expect("fired lock").clone();
        assert_eq!(fired.len(), 1);
        let elapsed = fired[0] - start;
        assert!(
            elapsed >= Duration::from_millis(250) && elapsed <= Duration::from_millis(251),
            "fired after {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_fire_separately() {
        let (fired, debouncer) = recording(100);

        debouncer.signal();
        advance_ms(150).await;
        debouncer.signal();
        advance_ms(150).await;

        assert_eq!(fired.lock().expect("fired lock").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_call_and_later_signals() {
        let (fired, debouncer) = recording(100);

        debouncer.signal();
        advance_ms(50).await;
        debouncer.cancel();
        debouncer.signal();
        advance_ms(500).await;

        assert!(fired.lock().expect("fired lock").is_empty());
        assert!(!debouncer.is_pending());
    }
}
