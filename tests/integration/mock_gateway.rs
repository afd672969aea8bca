//! Mock quote gateway and recording notifier for integration testing.
//!
//! Quotes are scripted per address and replayed in order; once a script
//! runs out the address reports "unavailable".

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use callwatch::notify::Notifier;
use callwatch::quotes::QuoteGateway;

#[derive(Clone, Default)]
pub struct MockGateway {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Option<f64>>>>>,
    calls: Arc<Mutex<Vec<String>>>,
    /// If set, every request fails with this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append quotes for `address`. `None` means "no quote this time".
    pub fn script(&self, address: &str, quotes: &[Option<f64>]) {
        self.scripts
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default()
            .extend(quotes.iter().copied());
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    /// Number of quote requests made for `address`.
    pub fn calls_for(&self, address: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.as_str() == address)
            .count()
    }
}

#[async_trait]
impl QuoteGateway for MockGateway {
    async fn fetch_price(&self, address: &str) -> Result<Option<f64>> {
        self.calls.lock().unwrap().push(address.to_string());
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        Ok(self
            .scripts
            .lock()
            .unwrap()
            .get_mut(address)
            .and_then(|q| q.pop_front())
            .flatten())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Collects every notice instead of posting it.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.sent().iter().filter(|t| t.contains(needle)).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
