//! State management module
//!
//! This module contains the persisted snapshot shape, the timer phase state
//! machine and the shared application state.

pub mod app_state;
pub mod snapshot;
pub mod timer_state;

/// Focus length used when nothing else is known
pub const DEFAULT_FOCUS_SECONDS: u64 = 25 * 60;

// Re-export main types
pub use app_state::{AppState, RemoteWiring, Wiring};
pub use snapshot::{deadline_after, LocalRecord, RemoteRecord, TimerSnapshot};
pub use timer_state::{check_completion, remaining, Completion, RunState, SessionKind, TimerPhase};
