//! Tools for throttling pools of asynchronous tasks
//!
//! * [`Limiter`], a FIFO slot pool for admission control
//! * [`Replenisher`], a periodic source of fresh slots
//! * [`ThrottledRunner`], which drives a batch of work items under a
//!   concurrency bound, a start-rate bound, or both
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use throttle_pool::ThrottledRunner;
//!
//! #[tokio::main]
//! async fn main() {
//!     // At most 2 work items may start per 20ms window.
//!     let runner =
//!         ThrottledRunner::max_starts_per_period(2, Duration::from_millis(20)).unwrap();
//!
//!     let out = runner
//!         .run("got", 6, |_input, i| async move {
//!             Ok::<_, std::convert::Infallible>(format!(" {i}"))
//!         })
//!         .await
//!         .unwrap();
//!
//!     // Every fragment arrives exactly once, in completion order.
//!     assert_eq!(out.len(), "got".len() + 6 * 2);
//! }
//! ```
pub use error::{ConfigError, RunError};
pub use limiter::Limiter;
pub use replenish::Replenisher;
pub use runner::ThrottledRunner;

mod error;
mod limiter;
mod replenish;
mod runner;
