use thiserror::Error;

/// Rejected configuration, reported before any work starts.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A limit of zero could never grant a slot, so every run would stall
    /// forever.
    #[error("limit must be greater than zero")]
    ZeroLimit,
    /// A zero replenishment period would tick without ever pausing.
    #[error("replenishment period must be non-zero")]
    ZeroPeriod,
}

/// Failure of a throttled run.
///
/// The first failing work item settles the run; there is no partial-success
/// value.
#[derive(Debug, Error)]
pub enum RunError<E> {
    /// The work invocation for `index` failed.
    #[error("work item {index} failed")]
    Work {
        /// Index of the failing invocation.
        index: usize,
        /// The error the work collaborator returned.
        #[source]
        source: E,
    },
    /// A spawned work task panicked or was torn down by the runtime.
    #[error("a work task did not run to completion")]
    Join(#[source] tokio::task::JoinError),
}
