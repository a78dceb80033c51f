//! Call and audio-route state for the in-call proximity policy.
//!
//! `state.rs` holds the platform-facing value types; `aggregator.rs` folds
//! call-state notifications into the derived booleans the policy engine
//! reads, and tells it which resync to run.

mod aggregator;
mod state;

pub use aggregator::{CallStateAggregator, CallStatus, ChangeSet, Trigger};
pub use state::{ActiveCall, AudioRoute, CallList, CallState};
