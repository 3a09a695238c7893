//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::controller::TimerSettings;

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "focus-keeper")]
#[command(about = "A focus-timer daemon that keeps local and remote timer state in sync")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, env = "FOCUS_KEEPER_PORT", default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "FOCUS_KEEPER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Directory holding the local snapshot, heartbeat and session journal
    #[arg(long, env = "FOCUS_KEEPER_STATE_DIR", default_value = ".focus-keeper")]
    pub state_dir: PathBuf,

    /// Identity of the current user; without it the timer runs local-only
    #[arg(long, env = "FOCUS_KEEPER_USER")]
    pub user_id: Option<String>,

    /// Base URL of the remote timer document store
    #[arg(long, env = "FOCUS_KEEPER_REMOTE_URL")]
    pub remote_url: Option<String>,

    /// Bearer token for the remote document store
    #[arg(long, env = "FOCUS_KEEPER_REMOTE_TOKEN", hide_env_values = true)]
    pub remote_token: Option<String>,

    /// Remote request timeout in seconds
    #[arg(long, env = "FOCUS_KEEPER_REMOTE_TIMEOUT_SECS", default_value = "10")]
    pub remote_timeout_secs: u64,

    /// Quiet period before a state change is written to the remote store
    #[arg(long, env = "FOCUS_KEEPER_SYNC_DEBOUNCE_MS", default_value = "2000")]
    pub sync_debounce_ms: u64,

    /// How long past its deadline a remote running timer is still trusted
    #[arg(long, env = "FOCUS_KEEPER_STALE_GRACE_SECS", default_value = "60")]
    pub stale_grace_secs: u64,

    /// Default focus duration in minutes
    #[arg(long, env = "FOCUS_KEEPER_FOCUS_MINUTES", default_value = "25")]
    pub focus_minutes: u64,

    /// Short break duration in minutes
    #[arg(long, env = "FOCUS_KEEPER_SHORT_BREAK_MINUTES", default_value = "5")]
    pub short_break_minutes: u64,

    /// Long break duration in minutes
    #[arg(long, env = "FOCUS_KEEPER_LONG_BREAK_MINUTES", default_value = "15")]
    pub long_break_minutes: u64,

    /// Completed focus sessions between long breaks (0 disables long breaks)
    #[arg(long, env = "FOCUS_KEEPER_LONG_BREAK_EVERY", default_value = "4")]
    pub long_break_every: u32,

    /// Start a break automatically when a focus session completes
    #[arg(long, env = "FOCUS_KEEPER_AUTO_BREAK")]
    pub auto_break: bool,

    /// Start the next focus session automatically when a break completes
    #[arg(long, env = "FOCUS_KEEPER_AUTO_START_NEXT")]
    pub auto_start_next: bool,

    /// Minimum seconds of focus for a manual stop to be recorded
    #[arg(long, env = "FOCUS_KEEPER_MIN_PARTIAL_SECS", default_value = "60")]
    pub min_partial_secs: u64,

    /// Command run on completion, e.g. notify-send
    #[arg(long, env = "FOCUS_KEEPER_NOTIFY_COMMAND")]
    pub notify_command: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn timer_settings(&self) -> TimerSettings {
        TimerSettings {
            focus_secs: self.focus_minutes.max(1).saturating_mul(60),
            short_break_secs: self.short_break_minutes.max(1).saturating_mul(60),
            long_break_secs: self.long_break_minutes.max(1).saturating_mul(60),
            long_break_every: self.long_break_every,
            auto_break: self.auto_break,
            auto_start_next: self.auto_start_next,
            min_partial_secs: self.min_partial_secs,
        }
    }

    pub fn sync_debounce(&self) -> Duration {
        Duration::from_millis(self.sync_debounce_ms)
    }

    pub fn stale_grace(&self) -> Duration {
        Duration::from_secs(self.stale_grace_secs)
    }

    /// Owner id and URL when both identity and remote store are configured
    pub fn remote_target(&self) -> Option<(&str, &str)> {
        match (self.user_id.as_deref(), self.remote_url.as_deref()) {
            (Some(user), Some(url)) if !user.is_empty() && !url.is_empty() => Some((user, url)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["focus-keeper"]).unwrap();
        assert_eq!(config.address(), "127.0.0.1:20554");
        assert_eq!(config.sync_debounce(), Duration::from_secs(2));
        assert_eq!(config.stale_grace(), Duration::from_secs(60));
        assert_eq!(config.timer_settings().focus_secs, 1500);
        assert!(config.remote_target().is_none());
    }

    #[test]
    fn test_remote_requires_identity_and_url() {
        let config = Config::try_parse_from([
            "focus-keeper",
            "--remote-url",
            "https://docs.example.com",
        ])
        .unwrap();
        assert!(config.remote_target().is_none());

        let config = Config::try_parse_from([
            "focus-keeper",
            "--remote-url",
            "https://docs.example.com",
            "--user-id",
            "alice",
            "--auto-break",
        ])
        .unwrap();
        assert_eq!(
            config.remote_target(),
            Some(("alice", "https://docs.example.com"))
        );
        assert!(config.timer_settings().auto_break);
    }
}
