//! Background tasks module
//!
//! This module contains the countdown ticker, the debounced remote sync worker
//! and the runtime that owns both.

pub mod remote_sync;
pub mod runtime;
pub mod ticker;

// Re-export main types
pub use remote_sync::{remote_sync_channel, RemoteSyncHandle, RemoteSyncWorker, SyncCommand};
pub use runtime::TimerRuntime;
pub use ticker::ticker_task;
