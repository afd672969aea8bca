//! Outbound notices to the report chat.
//!
//! Defines the `Notifier` trait and provides a Telegram implementation and
//! a log-only implementation for dry runs.

pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

pub use telegram::TelegramNotifier;

/// Sends a text notice to the single report destination.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Writes notices to the log instead of posting them.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        info!(text, "[DRY RUN] Would post notice");
        Ok(())
    }
}

/// Notice posted when an address enters tracking.
pub fn tracking_started_text(address: &str, template: &str) -> String {
    format!("Tracking started for CA: {address}. {template}")
}

/// Notice posted for a sample at or above the win threshold.
pub fn threshold_text(address: &str, multiplier: f64) -> String {
    format!("New update for {address}: {multiplier:.2}x")
}
