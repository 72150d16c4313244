use std::collections::VecDeque;

use tokio::sync::{oneshot, watch, Mutex};
use tracing::trace;

/// [`Limiter`] is an admission-control pool of `capacity` identical slots.
///
/// Callers [`acquire`](Limiter::acquire) a slot before starting a unit of
/// work and [`release`](Limiter::release) it afterwards. When the pool is
/// exhausted, acquires queue up and are granted in strict FIFO order.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use throttle_pool::Limiter;
///
/// #[tokio::main]
/// async fn main() {
///     let limiter = Arc::new(Limiter::new(2));
///
///     // Both complete instantly, the pool starts full.
///     limiter.acquire().await;
///     limiter.acquire().await;
///
///     // The pool is exhausted, so this caller queues up.
///     let waiter = {
///         let limiter = limiter.clone();
///         tokio::spawn(async move { limiter.acquire().await })
///     };
///
///     limiter.release().await;
///     waiter.await.unwrap();
/// }
/// ```
pub struct Limiter {
    capacity: usize,
    /// The shared counter and wait queue.
    ///
    /// A tokio::sync::Mutex rather than a std::sync::Mutex so the guard can
    /// be taken from any spawned task without Send trouble; it is never held
    /// across an await point.
    state: Mutex<State>,
    idle_tx: watch::Sender<bool>,
}

struct State {
    available: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
    idle_latched: bool,
}

impl Limiter {
    /// Creates a limiter whose pool starts with `capacity` free slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero: a zero-capacity pool could never grant a
    /// slot and every acquire would wait forever.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "limiter capacity must be positive");
        let (idle_tx, _) = watch::channel(false);
        Self {
            capacity,
            state: Mutex::new(State {
                available: capacity,
                waiters: VecDeque::new(),
                idle_latched: false,
            }),
            idle_tx,
        }
    }

    /// Total number of slots in the pool.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently free.
    pub async fn available(&self) -> usize {
        self.state.lock().await.available
    }

    /// Number of acquires currently queued.
    pub async fn waiting(&self) -> usize {
        self.state.lock().await.waiters.len()
    }

    /// Obtains one slot, waiting if none is free.
    ///
    /// A call that finds a free slot decrements the pool and completes
    /// without suspending; it is never inserted into the wait queue. All
    /// other callers join the queue and are granted slots in the exact order
    /// they called `acquire`. Acquiring never fails, it only delays.
    pub async fn acquire(&self) {
        let waiter = {
            let mut state = self.state.lock().await;
            if state.available > 0 {
                state.available -= 1;
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                Some(rx)
            }
        };
        if let Some(rx) = waiter {
            trace!(capacity = self.capacity, "pool exhausted, waiting for a slot");
            // The sender sits in the queue until a release grants it; it
            // cannot go away while `self` is alive.
            let _ = rx.await;
        }
    }

    /// Returns one slot to the pool.
    ///
    /// With a non-empty queue the slot is handed straight to the oldest
    /// waiter and the free count is untouched; a slot is never banked while
    /// anyone is waiting. With an empty queue the free count grows,
    /// saturating at `capacity`. The release that first brings the pool back
    /// to full latches the [`idle`](Limiter::idle) signal.
    pub async fn release(&self) {
        let mut state = self.state.lock().await;
        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(()).is_ok() {
                trace!("slot handed to the oldest waiter");
                return;
            }
            // The waiting task is gone; the slot goes to the next one.
        }
        if state.available < self.capacity {
            state.available += 1;
            if state.available == self.capacity && !state.idle_latched {
                state.idle_latched = true;
                trace!(capacity = self.capacity, "pool fully idle");
                self.idle_tx.send_replace(true);
            }
        }
        // A release into a full pool is dropped; periodic replenishment is
        // additive, never a reset.
    }

    /// Resolves once the pool has returned to fully idle.
    ///
    /// One-shot: the signal latches the first time `available` climbs back
    /// to `capacity` after having been below it, and stays latched for the
    /// life of the limiter. It does not re-arm on later acquire/release
    /// cycles.
    pub async fn idle(&self) {
        let mut rx = self.idle_tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
