//! Completion notifications

use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// What just finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    FocusComplete,
    BreakComplete,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::FocusComplete => "focusComplete",
            NotificationKind::BreakComplete => "breakComplete",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            NotificationKind::FocusComplete => "Focus session complete, time for a break",
            NotificationKind::BreakComplete => "Break is over, ready to focus",
        }
    }
}

/// Fire-and-forget notification dispatcher
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind);
}

/// Logs notifications only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NotificationKind) {
        info!("Notification: {} ({})", kind.message(), kind.as_str());
    }
}

/// Runs an external command such as `notify-send`, passing the kind and a message.
///
/// The command runs in a detached task; its outcome is only logged.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, kind: NotificationKind) {
        LogNotifier.notify(kind);

        let program = self.program.clone();
        let spawned = tokio::runtime::Handle::try_current().map(|handle| {
            handle.spawn(async move {
                debug!("Running notify command {} for {}", program, kind.as_str());
                match Command::new(&program)
                    .args([kind.as_str(), kind.message()])
                    .output()
                    .await
                {
                    Ok(output) if output.status.success() => {}
                    Ok(output) => warn!(
                        "Notify command {} exited with {}: {}",
                        program,
                        output.status,
                        String::from_utf8_lossy(&output.stderr)
                    ),
                    Err(e) => warn!("Failed to execute notify command {}: {}", program, e),
                }
            })
        });
        if spawned.is_err() {
            warn!("No async runtime available, skipping notify command");
        }
    }
}
