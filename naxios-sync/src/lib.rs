//! Naxios Sync - Concurrency Primitives
//!
//! Building blocks used by the contract orchestrator, each usable on its own:
//!
//! - [`CallQueue`]: sequential execution with tag-based merging of duplicate calls
//! - [`poll_until`] / [`poll_until_cancelled`]: probe until a predicate holds
//! - [`with_fallback`]: ordered trial across interchangeable providers

pub mod fallback;
pub mod polling;
pub mod queue;

pub use fallback::{classify_failure, with_fallback, FailureKind};
pub use polling::{poll_until, poll_until_cancelled, PollConfig, MIN_POLL_INTERVAL};
pub use queue::{CallQueue, QueuedCall};
