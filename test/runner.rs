#[cfg(test)]
mod tests {
    use anyhow::Result;
    use std::io;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering::SeqCst;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use throttle_pool::{ConfigError, RunError, ThrottledRunner};
    use tokio::sync::Mutex;
    use tokio::time::sleep;

    /// Stand-in for the external work generator: sleeps an uneven little
    /// while, then yields one numbered fragment.
    async fn number_after_delay(_input: String, index: usize) -> Result<String, io::Error> {
        sleep(Duration::from_millis(((index * 7) % 5) as u64 * 10)).await;
        Ok(format!("{index} "))
    }

    #[tokio::test]
    async fn collects_every_fragment_exactly_once() -> Result<()> {
        let runner = ThrottledRunner::max_concurrent(3)?;
        let out = runner.run("count: ", 10, number_after_delay).await?;

        assert!(out.starts_with("count: "));
        let mut fragments: Vec<_> = out["count: ".len()..].split_whitespace().collect();
        fragments.sort();
        let expected: Vec<_> = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(fragments, expected);
        Ok(())
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_limit() -> Result<()> {
        static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);
        static PEAK: AtomicUsize = AtomicUsize::new(0);

        let runner = ThrottledRunner::max_concurrent(3)?;
        runner
            .run("", 10, |_, i| async move {
                let now = IN_FLIGHT.fetch_add(1, SeqCst) + 1;
                PEAK.fetch_max(now, SeqCst);
                sleep(Duration::from_millis(50)).await;
                IN_FLIGHT.fetch_sub(1, SeqCst);
                Ok::<_, io::Error>(format!("{i} "))
            })
            .await?;

        assert!(PEAK.load(SeqCst) <= 3);
        assert!(PEAK.load(SeqCst) >= 2);
        Ok(())
    }

    #[tokio::test]
    async fn generous_limit_runs_everything_at_once() -> Result<()> {
        let runner = ThrottledRunner::max_concurrent(10)?;
        let start = Instant::now();
        let out = runner
            .run("all: ", 10, |_, i| async move {
                sleep(Duration::from_millis(50)).await;
                Ok::<_, io::Error>(format!("{i} "))
            })
            .await?;

        // Ten overlapping 50ms sleeps, nowhere near the 500ms sequential
        // cost.
        assert!(start.elapsed() < Duration::from_millis(300));
        assert_eq!(out.len(), "all: ".len() + 20);
        Ok(())
    }

    #[tokio::test]
    async fn starts_are_paced_by_the_period() -> Result<()> {
        let starts = Arc::new(Mutex::new(Vec::new()));
        let began = Instant::now();

        let runner =
            ThrottledRunner::max_starts_per_period(2, Duration::from_millis(100))?;
        let recorded = starts.clone();
        runner
            .run("", 6, move |_, i| {
                let starts = recorded.clone();
                async move {
                    starts.lock().await.push(began.elapsed());
                    Ok::<_, io::Error>(format!("{i} "))
                }
            })
            .await?;

        let starts = starts.lock().await;
        assert_eq!(starts.len(), 6);
        // Two start immediately, then two more per 100ms window.
        for window in 0u64..3 {
            let lo = Duration::from_millis(window * 100);
            let hi = lo + Duration::from_millis(90);
            let in_window = starts.iter().filter(|t| **t >= lo && **t < hi).count();
            assert!(in_window <= 2, "window {window} admitted {in_window} starts");
        }
        assert!(began.elapsed() >= Duration::from_millis(199));
        Ok(())
    }

    #[tokio::test]
    async fn period_variant_bounds_concurrency_too() -> Result<()> {
        static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);
        static PEAK: AtomicUsize = AtomicUsize::new(0);
        let began = Instant::now();

        let runner =
            ThrottledRunner::max_concurrent_per_period(2, Duration::from_millis(80))?;
        runner
            .run("", 6, |_, i| async move {
                let now = IN_FLIGHT.fetch_add(1, SeqCst) + 1;
                PEAK.fetch_max(now, SeqCst);
                sleep(Duration::from_millis(120)).await;
                IN_FLIGHT.fetch_sub(1, SeqCst);
                Ok::<_, io::Error>(format!("{i} "))
            })
            .await?;

        // Never more than two in flight, and the 120ms work items kept the
        // second and third waves waiting on completions, not just on the
        // 80ms windows: three waves of 120ms each.
        assert!(PEAK.load(SeqCst) <= 2);
        assert!(began.elapsed() >= Duration::from_millis(349));
        Ok(())
    }

    #[tokio::test]
    async fn zero_times_returns_input_untouched() -> Result<()> {
        let runner = ThrottledRunner::max_concurrent(3)?;
        let start = Instant::now();

        let out = runner.run("nothing to do", 0, number_after_delay).await?;

        assert_eq!(out, "nothing to do");
        assert!(start.elapsed() < Duration::from_millis(10));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_configuration_is_rejected_up_front() {
        assert_eq!(
            ThrottledRunner::max_concurrent(0).unwrap_err(),
            ConfigError::ZeroLimit
        );
        assert_eq!(
            ThrottledRunner::max_starts_per_period(0, Duration::from_millis(10)).unwrap_err(),
            ConfigError::ZeroLimit
        );
        assert_eq!(
            ThrottledRunner::max_concurrent_per_period(2, Duration::ZERO).unwrap_err(),
            ConfigError::ZeroPeriod
        );
    }

    #[tokio::test]
    async fn first_failure_aborts_the_run() -> Result<()> {
        let runner = ThrottledRunner::max_concurrent(3)?;
        let err = runner
            .run("partial ", 10, |_, i| async move {
                sleep(Duration::from_millis(10)).await;
                if i == 4 {
                    Err(io::Error::new(io::ErrorKind::Other, "work item exploded"))
                } else {
                    Ok(format!("{i} "))
                }
            })
            .await
            .unwrap_err();

        match err {
            RunError::Work { index, .. } => assert_eq!(index, 4),
            other => panic!("expected a work failure, got {other}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn failure_in_a_period_variant_still_resolves() -> Result<()> {
        let runner = ThrottledRunner::max_starts_per_period(2, Duration::from_millis(30))?;
        let err = runner
            .run("", 5, |_, i| async move {
                if i == 3 {
                    Err(io::Error::new(io::ErrorKind::Other, "work item exploded"))
                } else {
                    Ok(format!("{i} "))
                }
            })
            .await
            .unwrap_err();

        match err {
            RunError::Work { index, .. } => assert_eq!(index, 3),
            other => panic!("expected a work failure, got {other}"),
        }
        Ok(())
    }
}
