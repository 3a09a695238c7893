//! Focus Keeper - A focus-timer daemon with local and remote state reconciliation
//! 
//! This library runs a single countdown timer (focus sessions and breaks),
//! persists it locally on every change, mirrors it to a remote document store
//! when a user is identified, and reconciles both copies on startup.

pub mod config;
pub mod error;
pub mod state;
pub mod controller;
pub mod lifecycle;
pub mod api;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{StoreError, TimerError};
pub use state::{AppState, TimerSnapshot};
pub use controller::{TimerController, TimerSettings};
pub use api::create_router;
pub use tasks::TimerRuntime;
pub use utils::signals::shutdown_signal;
