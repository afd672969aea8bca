//! Shared types for the CALLWATCH tracker.
//!
//! These types form the data model used across all modules, so the
//! engine, storage, and dashboard can depend on them without circular
//! references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Multiplier at or above which a tracked address counts as a win.
pub const DEFAULT_WIN_THRESHOLD: f64 = 1.5;

/// Group name used when the chat transport provides no title.
pub const UNKNOWN_GROUP: &str = "Unknown";

// ---------------------------------------------------------------------------
// Tracked item
// ---------------------------------------------------------------------------

/// One monitored contract address. The address is the primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub address: String,
    /// Price at first sighting. Fixed for the lifetime of the record.
    pub initial_price: f64,
    /// Latest successfully sampled price. `None` only for legacy rows.
    pub current_price: Option<f64>,
    /// Best multiplier ever observed. Never decreases, never below 1.0.
    pub highest_multiplier: f64,
    pub group_name: String,
    pub tracked_since: DateTime<Utc>,
}

impl TrackedItem {
    /// Build a fresh record for a first sighting.
    pub fn new(address: &str, initial_price: f64, group_name: &str) -> Self {
        Self {
            address: address.to_string(),
            initial_price,
            current_price: Some(initial_price),
            highest_multiplier: 1.0,
            group_name: group_name.to_string(),
            tracked_since: Utc::now(),
        }
    }

    /// Ratio of `price` to the initial reference price.
    pub fn multiplier_at(&self, price: f64) -> f64 {
        price / self.initial_price
    }

    /// Whether the record can drive a sampling loop at all.
    pub fn has_valid_baseline(&self) -> bool {
        self.initial_price.is_finite() && self.initial_price > 0.0
    }

    /// Whether the best multiplier reached the win threshold.
    pub fn is_win(&self, threshold: f64) -> bool {
        self.highest_multiplier >= threshold
    }
}

impl fmt::Display for TrackedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {:.2}x | {}",
            self.address, self.highest_multiplier, self.group_name
        )
    }
}

// ---------------------------------------------------------------------------
// Group categories
// ---------------------------------------------------------------------------

/// Operator-assigned category of a source group. Selects the text of the
/// "tracking started" notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupCategory {
    Red,
    Yellow,
    Green,
    /// Not present in any configured list.
    Unlisted,
}

impl fmt::Display for GroupCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupCategory::Red => write!(f, "red"),
            GroupCategory::Yellow => write!(f, "yellow"),
            GroupCategory::Green => write!(f, "green"),
            GroupCategory::Unlisted => write!(f, "unlisted"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sampling loop status
// ---------------------------------------------------------------------------

/// Observable state of one address's sampling loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoopStatus {
    /// Sleeping until the next sample.
    Scheduled { next_sample_at: DateTime<Utc> },
    /// Waiting on the quote gateway.
    AwaitingQuote,
    /// Loop ended on an unhandled error. Needs an external restart.
    Terminated { reason: String, at: DateTime<Utc> },
    /// Loop ended because the record was deleted externally.
    Removed { at: DateTime<Utc> },
}

impl LoopStatus {
    /// Whether the loop has stopped for good.
    pub fn is_finished(&self) -> bool {
        matches!(self, LoopStatus::Terminated { .. } | LoopStatus::Removed { .. })
    }
}

impl fmt::Display for LoopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopStatus::Scheduled { next_sample_at } => {
                write!(f, "SCHEDULED (next {})", next_sample_at.to_rfc3339())
            }
            LoopStatus::AwaitingQuote => write!(f, "AWAITING_QUOTE"),
            LoopStatus::Terminated { reason, .. } => write!(f, "TERMINATED ({reason})"),
            LoopStatus::Removed { .. } => write!(f, "REMOVED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific failures of the tracking pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("Quote unavailable for {0}")]
    QuoteUnavailable(String),

    #[error("Store write failed for {address}: {message}")]
    StoreWrite { address: String, message: String },

    #[error("Sampling failed for {address}: {message}")]
    Sampling { address: String, message: String },

    #[error("Invalid initial price {price} for {address}")]
    InvalidInitialPrice { address: String, price: f64 },

    /// A newer sampling loop took over the address.
    #[error("Sampling loop for {0} was superseded")]
    Superseded(String),
}

impl TrackError {
    /// Transient errors are retried by the sampling loop; everything else
    /// is either skipped for one interval or ends the loop.
    pub fn is_transient(&self) -> bool {
        matches!(self, TrackError::QuoteUnavailable(_))
    }

    /// Errors after which the sampling loop must stop.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrackError::Sampling { .. } | TrackError::InvalidInitialPrice { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
