//! In-memory watchlist with the same semantics as the SQLite store.
//! Nothing survives a restart.

use anyhow::Result;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Mutex;

use super::WatchlistStore;
use crate::types::TrackedItem;

#[derive(Default)]
pub struct MemoryStore {
    /// Insertion order doubles as the tie-break for equal multipliers.
    items: Mutex<Vec<TrackedItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TrackedItem>> {
        // A panic while holding the lock cannot leave a half-written row.
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[async_trait]
impl WatchlistStore for MemoryStore {
    async fn insert_if_absent(&self, item: &TrackedItem) -> Result<bool> {
        let mut items = self.lock();
        if items.iter().any(|i| i.address == item.address) {
            return Ok(false);
        }
        items.push(item.clone());
        Ok(true)
    }

    async fn record_sample(
        &self,
        address: &str,
        current_price: f64,
        multiplier: f64,
    ) -> Result<u64> {
        let mut items = self.lock();
        match items.iter_mut().find(|i| i.address == address) {
            Some(item) => {
                item.current_price = Some(current_price);
                if multiplier > item.highest_multiplier {
                    item.highest_multiplier = multiplier;
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, address: &str) -> Result<u64> {
        let mut items = self.lock();
        let before = items.len();
        items.retain(|i| i.address != address);
        Ok((before - items.len()) as u64)
    }

    async fn get(&self, address: &str) -> Result<Option<TrackedItem>> {
        Ok(self.lock().iter().find(|i| i.address == address).cloned())
    }

    async fn scan_by_multiplier_desc(&self) -> Result<Vec<TrackedItem>> {
        let mut items = self.lock().clone();
        // Stable sort, so ties keep insertion order.
        items.sort_by(|a, b| {
            b.highest_multiplier
                .partial_cmp(&a.highest_multiplier)
                .unwrap_or(Ordering::Equal)
        });
        Ok(items)
    }
}
