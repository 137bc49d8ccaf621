//! Deduplicated tile retrieval.
//!
//! [`RetrievalCoordinator`] moves each tile address through
//!
//! ```text
//! NotRequested -> Queued -> InFlight -> Succeeded | Failed -> NotRequested
//! ```
//!
//! `request_async` is fire-and-forget: it never blocks and never reports
//! errors. At most one fetch per address is queued or in flight at a time.
//! `request_sync` runs the same steps inline on the calling task and joins
//! an in-flight fetch for the same address instead of starting another.
//!
//! Disk checks and writes for a cache namespace run under that namespace's
//! lock. The network transfer itself runs outside the lock.

mod config;
mod coordinator;
mod error;
mod postprocess;
mod state;
mod stats;

pub use config::{RetrievalConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};
pub use coordinator::{RetrievalCoordinator, Submission, TileSource};
pub use error::RetrievalError;
pub use postprocess::{check_content_type, ImagePostProcessor, PassThrough, PostProcessor};
pub use state::RequestState;
pub use stats::{RetrievalStats, StatsSnapshot};
