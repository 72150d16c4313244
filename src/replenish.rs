use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

use crate::Limiter;

/// [`Replenisher`] returns a fixed quantity of slots to its target limiters
/// every period, regardless of how fast slots are actually consumed.
///
/// This bounds how often slots become available, not how fast work finishes:
/// paired with a [`Limiter`] that tasks never release themselves, it turns
/// the limiter into a start-rate gate.
///
/// Dropping the handle cancels the timer, so a replenisher cannot outlive
/// the run that started it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use throttle_pool::{Limiter, Replenisher};
///
/// #[tokio::main]
/// async fn main() {
///     let limiter = Arc::new(Limiter::new(2));
///     limiter.acquire().await;
///     limiter.acquire().await;
///
///     let replenisher = Replenisher::start(
///         vec![limiter.clone()],
///         Duration::from_millis(10),
///         limiter.capacity(),
///     );
///
///     // The first tick refills the pool without any release from us.
///     limiter.idle().await;
///     replenisher.stop();
/// }
/// ```
pub struct Replenisher {
    timer: JoinHandle<()>,
}

impl Replenisher {
    /// Starts ticking. Every `period`, each target limiter receives
    /// `quantity` releases.
    ///
    /// The first tick lands one full period after `start` is called; the
    /// targets begin life with whatever slots they already hold.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn start(targets: Vec<Arc<Limiter>>, period: Duration, quantity: usize) -> Self {
        assert!(!period.is_zero(), "replenishment period must be non-zero");
        let timer = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            loop {
                ticks.tick().await;
                for limiter in &targets {
                    for _ in 0..quantity {
                        limiter.release().await;
                    }
                }
                debug!(quantity, targets = targets.len(), "replenished slot pool");
            }
        });
        Self { timer }
    }

    /// Cancels future ticks. A stopped replenisher has no further effect on
    /// its targets.
    pub fn stop(self) {
        self.timer.abort();
    }
}

impl Drop for Replenisher {
    fn drop(&mut self) {
        self.timer.abort();
    }
}
