//! Monitoring pipeline.
//!
//! - `detect`: diff a sample against the seen-state
//! - `digest`: render notification title and body
//! - `retry`: backoff ladder around a fetch
//! - `cycle`: one fetch, detect, digest and notify pass
//! - `schedule`: run cycles on the configured cadence

pub mod cycle;
pub mod detect;
pub mod digest;
pub mod retry;
pub mod schedule;

pub use cycle::{CycleOutcome, CycleRunner};
pub use detect::{Delta, SeenState, detect};
pub use digest::{Digest, DigestBuilder};
pub use retry::{FetchOutcome, RetryPolicy, RetryState};
pub use schedule::{PollScheduler, draw_interval, next_fixed_run};
