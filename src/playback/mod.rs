//! Shared playback document: selection, transitions, the write path and local reconciliation.

pub mod coordinator;
pub mod gateway;
pub mod machine;
pub mod selector;
pub mod state;
pub mod sync;
pub mod timing;
