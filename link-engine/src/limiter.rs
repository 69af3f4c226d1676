//! Outbound fetch rate limiting.
//!
//! A token scheduler grants one permit per tick, in strict submission order.
//! The scheduler task parks on its queue when empty, so no timer runs while
//! the limiter is idle; the next submission wakes it.

use link_engine_core::FetchError;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// Default spacing between outbound fetches.
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(150);

/// FIFO permit scheduler for outbound fetches.
pub struct FetchLimiter {
    queue: mpsc::UnboundedSender<oneshot::Sender<()>>,
    worker: JoinHandle<()>,
}

impl FetchLimiter {
    /// Spawns the scheduler task. `delay` is the minimum spacing between
    /// consecutive grants; the first grant after an idle period is immediate.
    pub fn new(delay: Duration) -> Self {
        let (queue, mut waiters) = mpsc::unbounded_channel::<oneshot::Sender<()>>();
        let worker = tokio::spawn(async move {
            while let Some(permit) = waiters.recv().await {
                // A dropped receiver means the waiter gave up; it should not
                // consume a tick.
                if permit.send(()).is_err() {
                    continue;
                }
                tokio::time::sleep(delay).await;
            }
            debug!("Fetch limiter queue closed");
        });
        Self { queue, worker }
    }

    /// Waits for this caller's turn. Permits are granted in submission
    /// order. Returns [`FetchError::Shutdown`] when the scheduler has been
    /// shut down, including while waiting.
    pub async fn acquire(&self) -> Result<(), FetchError> {
        let (grant, granted) = oneshot::channel();
        self.queue.send(grant).map_err(|_| FetchError::Shutdown)?;
        granted.await.map_err(|_| FetchError::Shutdown)
    }

    /// Stops the scheduler. Pending waiters resolve with
    /// [`FetchError::Shutdown`]; later submissions fail the same way.
    pub fn shutdown(&self) {
        self.worker.abort();
    }
}

impl Drop for FetchLimiter {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test(start_paused = true)]
    async fn spaces_grants_by_the_configured_delay() {
        let limiter = FetchLimiter::new(Duration::from_millis(100));
        let start = tokio::time::Instant::now();

        for _ in 0..5 {
            limiter.acquire().await.unwrap();
        }

        // 5 grants with 100ms spacing: at least 400ms between first and last.
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn grants_in_submission_order() {
        let limiter = Arc::new(FetchLimiter::new(Duration::from_millis(100)));
        let order = Arc::new(Mutex::new(Vec::new()));

        // join! polls its branches in declaration order on the first pass,
        // so the submissions below happen in sequence.
        let acquire = |index: usize| {
            let limiter = Arc::clone(&limiter);
            let order = Arc::clone(&order);
            async move {
                limiter.acquire().await.unwrap();
                order.lock().unwrap().push(index);
            }
        };
        tokio::join!(acquire(0), acquire(1), acquire(2), acquire(3), acquire(4));

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn first_grant_after_idle_is_immediate() {
        let limiter = FetchLimiter::new(Duration::from_millis(100));

        let start = tokio::time::Instant::now();
        limiter.acquire().await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_waiters() {
        let limiter = Arc::new(FetchLimiter::new(Duration::from_millis(100)));

        // Occupy the first tick, then queue a second waiter behind it.
        limiter.acquire().await.unwrap();
        let waiting = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire().await })
        };
        tokio::task::yield_now().await;

        limiter.shutdown();
        let result = waiting.await.unwrap();
        assert!(matches!(result, Err(FetchError::Shutdown)));

        // Submissions after shutdown fail immediately.
        assert!(matches!(limiter.acquire().await, Err(FetchError::Shutdown)));
    }
}
