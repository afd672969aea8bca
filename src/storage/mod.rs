//! Persistence layer.
//!
//! Defines the `WatchlistStore` trait over the keyed watchlist table and
//! provides a SQLite implementation (production) and an in-memory one
//! (tests and dry runs).

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::types::TrackedItem;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Keyed store of tracked items. Writes to distinct addresses must be
/// safe to run concurrently; no cross-key transactions are needed.
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    /// Insert `item` unless its address is already present.
    /// Returns `true` if a new record was created.
    async fn insert_if_absent(&self, item: &TrackedItem) -> Result<bool>;

    /// Record one successful sample: set `current_price` and raise
    /// `highest_multiplier` to `multiplier` if that is larger.
    /// Returns the number of records changed (0 if the address is gone).
    async fn record_sample(&self, address: &str, current_price: f64, multiplier: f64)
        -> Result<u64>;

    /// Delete by address. Returns the number of records removed.
    async fn delete(&self, address: &str) -> Result<u64>;

    async fn get(&self, address: &str) -> Result<Option<TrackedItem>>;

    /// All records, highest multiplier first.
    async fn scan_by_multiplier_desc(&self) -> Result<Vec<TrackedItem>>;
}

/// Outcome of an administrative removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    NotFound,
}

/// Remove one address from the watchlist. A missing address is reported
/// as `NotFound`, not as an error. Running sampling loops are not
/// interrupted.
pub async fn remove_from_watchlist(store: &dyn WatchlistStore, address: &str) -> Result<Removal> {
    let changed = store.delete(address).await?;
    if changed > 0 {
        info!(address, "Removed from watchlist");
        Ok(Removal::Removed)
    } else {
        info!(address, "Address not found in watchlist");
        Ok(Removal::NotFound)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
