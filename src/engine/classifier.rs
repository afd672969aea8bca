//! Ingestion classifier.
//!
//! Turns raw group-chat text into at most one validated contract address,
//! confirms that the address has a live quote, and hands it to the
//! [`Tracker`]. Everything that does not look like a call is dropped
//! without a trace in the chat.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{GroupDirectory, TemplatesConfig, TrackingConfig};
use crate::engine::tracker::{StartOutcome, Tracker};
use crate::notify::{tracking_started_text, Notifier};
use crate::quotes::QuoteGateway;
use crate::types::{GroupCategory, TrackError};

/// First maximal run of ASCII word characters that is entirely
/// alphanumeric and at least `min_len` long.
///
/// Only the first such run is considered; a second address in the same
/// message is never seen.
pub fn extract_candidate(text: &str, min_len: usize) -> Option<&str> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .find(|run| run.len() >= min_len && run.bytes().all(|b| b.is_ascii_alphanumeric()))
}

/// An address that passed extraction and exclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sighting {
    pub address: String,
    pub group_name: String,
    pub category: GroupCategory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Empty text or no candidate token.
    Ignored,
    /// Candidate found but starts with an excluded prefix.
    Excluded { address: String },
    Candidate(Sighting),
}

/// Pure text → sighting step.
#[derive(Debug, Clone)]
pub struct Classifier {
    directory: GroupDirectory,
    min_len: usize,
    excluded_prefixes: Vec<String>,
}

impl Classifier {
    pub fn new(directory: GroupDirectory, settings: &TrackingConfig) -> Self {
        Self {
            directory,
            min_len: settings.min_address_len,
            excluded_prefixes: settings.excluded_prefixes.clone(),
        }
    }

    pub fn classify(&self, group_name: &str, text: &str) -> Classification {
        let text = text.trim();
        if text.is_empty() {
            return Classification::Ignored;
        }

        let Some(address) = extract_candidate(text, self.min_len) else {
            return Classification::Ignored;
        };

        if self
            .excluded_prefixes
            .iter()
            .any(|prefix| address.starts_with(prefix.as_str()))
        {
            return Classification::Excluded {
                address: address.to_string(),
            };
        }

        Classification::Candidate(Sighting {
            address: address.to_string(),
            group_name: group_name.to_string(),
            category: self.directory.category_of(group_name),
        })
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Ignored,
    Excluded { address: String },
    /// No usable quote, the sighting was dropped.
    Unpriced { address: String },
    Tracked {
        address: String,
        category: GroupCategory,
        initial_price: f64,
    },
    AlreadyTracked { address: String },
    Failed { address: String, reason: String },
}

/// Full inbound pipeline: classify, confirm the quote, start tracking,
/// announce.
pub struct Ingestor {
    classifier: Classifier,
    gateway: Arc<dyn QuoteGateway>,
    tracker: Arc<Tracker>,
    notifier: Arc<dyn Notifier>,
    templates: TemplatesConfig,
}

impl Ingestor {
    pub fn new(
        classifier: Classifier,
        gateway: Arc<dyn QuoteGateway>,
        tracker: Arc<Tracker>,
        notifier: Arc<dyn Notifier>,
        templates: TemplatesConfig,
    ) -> Self {
        Self {
            classifier,
            gateway,
            tracker,
            notifier,
            templates,
        }
    }

    pub async fn handle_message(&self, group_name: &str, text: &str) -> IngestOutcome {
        let sighting = match self.classifier.classify(group_name, text) {
            Classification::Ignored => return IngestOutcome::Ignored,
            Classification::Excluded { address } => {
                debug!(address = %address, group = group_name, "Excluded address prefix");
                return IngestOutcome::Excluded { address };
            }
            Classification::Candidate(sighting) => sighting,
        };
        let address = sighting.address;

        let initial_price = match self.gateway.fetch_price(&address).await {
            Ok(Some(price)) if price.is_finite() && price > 0.0 => price,
            Ok(Some(price)) => {
                debug!(address = %address, price, "Quote not usable as a baseline");
                return IngestOutcome::Unpriced { address };
            }
            Ok(None) => {
                debug!(address = %address, "No quote, dropping sighting");
                return IngestOutcome::Unpriced { address };
            }
            Err(e) => {
                debug!(address = %address, error = %e, "Quote request failed, dropping sighting");
                return IngestOutcome::Unpriced { address };
            }
        };

        match self
            .tracker
            .start_tracking(&address, initial_price, &sighting.group_name)
            .await
        {
            Ok(StartOutcome::Started) => {
                let template = self.templates.for_category(sighting.category);
                let text = tracking_started_text(&address, template);
                if let Err(e) = self.notifier.send(&text).await {
                    warn!(address = %address, error = %e, "Failed to send tracking notice");
                }
                info!(
                    address = %address,
                    group = %sighting.group_name,
                    category = %sighting.category,
                    initial_price,
                    "New call tracked"
                );
                IngestOutcome::Tracked {
                    address,
                    category: sighting.category,
                    initial_price,
                }
            }
            Ok(StartOutcome::AlreadyTracked) => IngestOutcome::AlreadyTracked { address },
            Err(TrackError::InvalidInitialPrice { .. }) => IngestOutcome::Unpriced { address },
            Err(e) => {
                warn!(address = %address, error = %e, "Failed to start tracking");
                IngestOutcome::Failed {
                    address,
                    reason: e.to_string(),
                }
            }
        }
    }
}
