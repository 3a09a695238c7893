//! Persistence and external collaborator module
//!
//! This module contains the local and remote snapshot stores and the ports the
//! timer controller talks to: session recording, notifications, analytics
//! caching and state publication.

pub mod local_store;
pub mod notifier;
pub mod publisher;
pub mod remote_store;
pub mod session_recorder;
pub mod stats_cache;

// Re-export main types
pub use local_store::LocalSnapshotStore;
pub use notifier::{CommandNotifier, LogNotifier, NotificationKind, Notifier};
pub use publisher::{StatePublisher, WatchPublisher};
pub use remote_store::{DocumentBackend, HttpBackend, MemoryBackend, RemoteSnapshotStore};
pub use session_recorder::{JournalRecorder, SessionRecorder, StatsSummary};
pub use stats_cache::StatsCache;
