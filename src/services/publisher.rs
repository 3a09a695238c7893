//! Outbound timer state publication

use tokio::sync::watch;
use tracing::trace;

use crate::state::TimerSnapshot;

/// Port through which every timer state change is announced to observers
/// such as the browser extension
pub trait StatePublisher: Send + Sync {
    fn publish_timer_state(&self, snapshot: &TimerSnapshot);
}

/// Publishes into a `watch` channel; subscribers always see the latest snapshot
#[derive(Debug)]
pub struct WatchPublisher {
    tx: watch::Sender<TimerSnapshot>,
    /// Keep the receiver alive to prevent channel closure
    _rx: watch::Receiver<TimerSnapshot>,
}

impl WatchPublisher {
    pub fn new(initial: TimerSnapshot) -> Self {
        let (tx, rx) = watch::channel(initial);
        Self { tx, _rx: rx }
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> TimerSnapshot {
        self.tx.borrow().clone()
    }
}

impl StatePublisher for WatchPublisher {
    fn publish_timer_state(&self, snapshot: &TimerSnapshot) {
        // Ticks republish identical snapshots while idle or paused
        self.tx.send_if_modified(|current| {
            if current == snapshot {
                false
            } else {
                *current = snapshot.clone();
                true
            }
        });
        trace!("Published timer state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_sees_only_changes() {
        let publisher = WatchPublisher::new(TimerSnapshot::idle(60));
        let mut rx = publisher.subscribe();

        publisher.publish_timer_state(&TimerSnapshot::idle(60));
        assert!(!rx.has_changed().unwrap());

        publisher.publish_timer_state(&TimerSnapshot::idle(120));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().total_duration_seconds, 120);
        assert_eq!(publisher.current().total_duration_seconds, 120);
    }
}
