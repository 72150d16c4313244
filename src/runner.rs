use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::debug;

use crate::{ConfigError, Limiter, Replenisher, RunError};

/// [`ThrottledRunner`] drives a batch of independent work invocations under a
/// throttling policy.
///
/// A run invokes `work(input, index)` once for every index in `0..times`,
/// gating each invocation's start on one or two [`Limiter`]s depending on the
/// variant, and resolves with `input` followed by every returned fragment in
/// completion order.
///
/// The runner holds only validated configuration; limiters and timers are
/// built fresh for each run and discarded with it.
///
/// # Examples
///
/// ```
/// use throttle_pool::ThrottledRunner;
///
/// #[tokio::main]
/// async fn main() {
///     // At most 3 of the 10 work items are in flight at any instant.
///     let runner = ThrottledRunner::max_concurrent(3).unwrap();
///
///     let out = runner
///         .run("ids:", 10, |_input, i| async move {
///             Ok::<_, std::convert::Infallible>(format!(" {i}"))
///         })
///         .await
///         .unwrap();
///
///     assert!(out.starts_with("ids:"));
/// }
/// ```
#[derive(Debug)]
pub struct ThrottledRunner {
    limit: usize,
    variant: Variant,
}

/// Which limiter(s) gate a task's start and which one the task releases on
/// completion.
#[derive(Debug, Clone, Copy)]
enum Variant {
    /// At most `limit` tasks in flight at once; tasks release their slot
    /// when they finish.
    MaxConcurrent,
    /// At most `limit` task starts per window; slots come back only by
    /// replenishment, so concurrency is unbounded.
    MaxStartsPerPeriod { period: Duration },
    /// Both bounds at once, via two independent limiters.
    MaxConcurrentPerPeriod { period: Duration },
}

/// The per-run gate set: the limiter released by finishing tasks, the
/// limiter refilled by the timer, and the timer itself.
struct Gates {
    process: Option<Arc<Limiter>>,
    time: Option<Arc<Limiter>>,
    replenisher: Option<Replenisher>,
}

impl ThrottledRunner {
    /// Bounds how many work items may be in flight simultaneously.
    pub fn max_concurrent(limit: usize) -> Result<Self, ConfigError> {
        Self::build(limit, Variant::MaxConcurrent)
    }

    /// Bounds how many work items may start within each `period` window.
    ///
    /// How many run concurrently is not bounded; items started in earlier
    /// windows may still be in flight.
    pub fn max_starts_per_period(limit: usize, period: Duration) -> Result<Self, ConfigError> {
        check_period(period)?;
        Self::build(limit, Variant::MaxStartsPerPeriod { period })
    }

    /// Bounds simultaneous in-flight work and starts per window at once.
    ///
    /// The effective throughput ceiling is the lower of the two bounds.
    pub fn max_concurrent_per_period(
        limit: usize,
        period: Duration,
    ) -> Result<Self, ConfigError> {
        check_period(period)?;
        Self::build(limit, Variant::MaxConcurrentPerPeriod { period })
    }

    fn build(limit: usize, variant: Variant) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        Ok(Self { limit, variant })
    }

    /// Runs `times` invocations of `work`, each receiving its own clone of
    /// `input` and its index, and resolves with `input` followed by every
    /// fragment in completion order.
    ///
    /// `times == 0` resolves immediately with `input` unchanged and builds
    /// no limiter or timer. The first failing invocation settles the run
    /// with [`RunError::Work`]; still-pending siblings are dropped and any
    /// replenishment timer is stopped.
    pub async fn run<F, Fut, E>(
        &self,
        input: &str,
        times: usize,
        work: F,
    ) -> Result<String, RunError<E>>
    where
        F: Fn(String, usize) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<String, E>> + Send + 'static,
        E: Send + 'static,
    {
        if times == 0 {
            return Ok(input.to_owned());
        }

        let gates = self.gates();
        debug!(times, limit = self.limit, "starting throttled run");

        let mut tasks = JoinSet::new();
        for index in 0..times {
            let work = work.clone();
            let input = input.to_owned();
            let process = gates.process.clone();
            let time = gates.time.clone();
            tasks.spawn(async move {
                admit(time.as_deref(), process.as_deref()).await;
                let fragment = work(input, index)
                    .await
                    .map_err(|source| RunError::Work { index, source })?;
                if let Some(process) = &process {
                    process.release().await;
                }
                Ok(fragment)
            });
        }

        let mut output = input.to_owned();
        while let Some(joined) = tasks.join_next().await {
            let fragment = joined.map_err(RunError::Join)??;
            output.push_str(&fragment);
        }

        if let Some(replenisher) = gates.replenisher {
            replenisher.stop();
        }
        debug!(times, "throttled run complete");
        Ok(output)
    }

    /// Builds the per-run limiters and, for the period variants, the timer
    /// that refills the time limiter back to capacity every window.
    fn gates(&self) -> Gates {
        let process = match self.variant {
            Variant::MaxConcurrent | Variant::MaxConcurrentPerPeriod { .. } => {
                Some(Arc::new(Limiter::new(self.limit)))
            }
            Variant::MaxStartsPerPeriod { .. } => None,
        };
        let (time, replenisher) = match self.variant {
            Variant::MaxStartsPerPeriod { period }
            | Variant::MaxConcurrentPerPeriod { period } => {
                let time = Arc::new(Limiter::new(self.limit));
                let replenisher =
                    Replenisher::start(vec![time.clone()], period, time.capacity());
                (Some(time), Some(replenisher))
            }
            Variant::MaxConcurrent => (None, None),
        };
        Gates {
            process,
            time,
            replenisher,
        }
    }
}

fn check_period(period: Duration) -> Result<(), ConfigError> {
    if period.is_zero() {
        return Err(ConfigError::ZeroPeriod);
    }
    Ok(())
}

/// Waits for every gate the variant requires. Both limiters are requested
/// together, so a task waits for the slower of the two.
async fn admit(time: Option<&Limiter>, process: Option<&Limiter>) {
    match (time, process) {
        (Some(time), Some(process)) => {
            tokio::join!(time.acquire(), process.acquire());
        }
        (Some(time), None) => time.acquire().await,
        (None, Some(process)) => process.acquire().await,
        (None, None) => {}
    }
}
