//! Lifecycle hooks that force an immediate save
//!
//! These are the moments timer state is most likely to be lost: the client tab
//! going to the background, the client page unloading, and the daemon itself
//! shutting down.

use tokio::sync::Mutex;
use tracing::info;

use crate::controller::TimerController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    VisibilityHidden,
    BeforeUnload,
    Shutdown,
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::VisibilityHidden => "hidden",
            LifecycleEvent::BeforeUnload => "unload",
            LifecycleEvent::Shutdown => "shutdown",
        }
    }

    /// Parse a client-reported event; shutdown is daemon-internal only
    pub fn from_client(name: &str) -> Option<Self> {
        match name {
            "hidden" => Some(LifecycleEvent::VisibilityHidden),
            "unload" => Some(LifecycleEvent::BeforeUnload),
            _ => None,
        }
    }
}

/// Write the current state to both stores without waiting for the debounce
pub async fn handle_lifecycle_event(controller: &Mutex<TimerController>, event: LifecycleEvent) {
    info!("Lifecycle event: {}", event.as_str());
    controller.lock().await.flush(event).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_events_parse() {
        assert_eq!(
            LifecycleEvent::from_client("hidden"),
            Some(LifecycleEvent::VisibilityHidden)
        );
        assert_eq!(
            LifecycleEvent::from_client("unload"),
            Some(LifecycleEvent::BeforeUnload)
        );
        assert_eq!(LifecycleEvent::from_client("shutdown"), None);
    }
}
