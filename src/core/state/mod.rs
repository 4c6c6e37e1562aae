//! Sync state management
//!
//! Watermark values and the durable state store used for incremental syncs.

pub mod store;
pub mod watermark;

pub use store::SyncStateStore;
pub use watermark::Watermark;
