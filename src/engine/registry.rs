//! Loop registry: observable status of every sampling loop.
//!
//! Each tracked address runs its own task. The registry is the only place
//! those tasks report to, so operators can see which loops are alive and
//! which ended (and why) without digging through logs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::types::LoopStatus;

/// Snapshot of one address's sampling loop.
#[derive(Debug, Clone, Serialize)]
pub struct LoopState {
    pub address: String,
    pub group_name: String,
    /// Distinguishes loops for the same address across restarts.
    pub run_id: Uuid,
    pub status: LoopStatus,
    /// Successful samples recorded.
    pub samples: u64,
    /// Unavailable quotes since the last successful sample.
    pub unavailable_streak: u32,
    pub notifications: u64,
    /// The record was found deleted while this loop kept sampling.
    pub record_missing: bool,
    pub last_price: Option<f64>,
    pub highest_multiplier: f64,
    pub last_sample_at: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
}

/// Shared, cloneable handle to all loop states.
#[derive(Debug, Clone, Default)]
pub struct LoopRegistry {
    inner: Arc<RwLock<HashMap<String, LoopState>>>,
}

impl LoopRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new loop. Returns `None` if a loop for this address is
    /// still running; a finished loop is replaced.
    pub async fn register(
        &self,
        address: &str,
        group_name: &str,
        highest_multiplier: f64,
        first_sample_at: DateTime<Utc>,
    ) -> Option<Uuid> {
        let mut loops = self.inner.write().await;
        if let Some(existing) = loops.get(address) {
            if !existing.status.is_finished() {
                return None;
            }
        }
        Some(Self::install(
            &mut loops,
            address,
            group_name,
            highest_multiplier,
            first_sample_at,
        ))
    }

    /// Register a new loop unconditionally. A loop still running for this
    /// address loses its `run_id` and stops at its next check.
    pub async fn supersede(
        &self,
        address: &str,
        group_name: &str,
        highest_multiplier: f64,
        first_sample_at: DateTime<Utc>,
    ) -> Uuid {
        let mut loops = self.inner.write().await;
        Self::install(
            &mut loops,
            address,
            group_name,
            highest_multiplier,
            first_sample_at,
        )
    }

    fn install(
        loops: &mut HashMap<String, LoopState>,
        address: &str,
        group_name: &str,
        highest_multiplier: f64,
        first_sample_at: DateTime<Utc>,
    ) -> Uuid {
        let run_id = Uuid::new_v4();
        loops.insert(
            address.to_string(),
            LoopState {
                address: address.to_string(),
                group_name: group_name.to_string(),
                run_id,
                status: LoopStatus::Scheduled {
                    next_sample_at: first_sample_at,
                },
                samples: 0,
                unavailable_streak: 0,
                notifications: 0,
                record_missing: false,
                last_price: None,
                highest_multiplier,
                last_sample_at: None,
                started_at: Utc::now(),
            },
        );
        run_id
    }

    /// Whether `run_id` is still the loop in charge of `address`.
    pub async fn is_current(&self, address: &str, run_id: Uuid) -> bool {
        self.inner
            .read()
            .await
            .get(address)
            .is_some_and(|s| s.run_id == run_id)
    }

    /// Updates below apply only while `run_id` owns the address; a
    /// superseded loop cannot overwrite its successor's state.
    pub async fn set_status(&self, address: &str, run_id: Uuid, status: LoopStatus) {
        let mut loops = self.inner.write().await;
        if let Some(state) = Self::current_mut(&mut loops, address, run_id) {
            state.status = status;
        }
    }

    /// Record a successful sample.
    pub async fn record_sample(
        &self,
        address: &str,
        run_id: Uuid,
        price: f64,
        multiplier: f64,
        notified: bool,
    ) {
        let mut loops = self.inner.write().await;
        if let Some(state) = Self::current_mut(&mut loops, address, run_id) {
            state.samples += 1;
            state.unavailable_streak = 0;
            state.last_price = Some(price);
            state.last_sample_at = Some(Utc::now());
            if multiplier > state.highest_multiplier {
                state.highest_multiplier = multiplier;
            }
            if notified {
                state.notifications += 1;
            }
        }
    }

    pub async fn record_unavailable(&self, address: &str, run_id: Uuid) {
        let mut loops = self.inner.write().await;
        if let Some(state) = Self::current_mut(&mut loops, address, run_id) {
            state.unavailable_streak += 1;
        }
    }

    /// Flag the record as deleted. Returns `true` only the first time for
    /// this loop.
    pub async fn mark_record_missing(&self, address: &str, run_id: Uuid) -> bool {
        let mut loops = self.inner.write().await;
        match Self::current_mut(&mut loops, address, run_id) {
            Some(state) if !state.record_missing => {
                state.record_missing = true;
                true
            }
            _ => false,
        }
    }

    fn current_mut<'a>(
        loops: &'a mut HashMap<String, LoopState>,
        address: &str,
        run_id: Uuid,
    ) -> Option<&'a mut LoopState> {
        loops.get_mut(address).filter(|s| s.run_id == run_id)
    }

    /// Mark the loop for `run_id` as terminated. Ignored if a newer loop
    /// has since taken over the address.
    pub async fn mark_terminated(&self, address: &str, run_id: Uuid, reason: String) {
        if let Some(state) = self.inner.write().await.get_mut(address) {
            if state.run_id == run_id && !state.status.is_finished() {
                state.status = LoopStatus::Terminated {
                    reason,
                    at: Utc::now(),
                };
            }
        }
    }

    pub async fn get(&self, address: &str) -> Option<LoopState> {
        self.inner.read().await.get(address).cloned()
    }

    pub async fn is_running(&self, address: &str) -> bool {
        self.inner
            .read()
            .await
            .get(address)
            .is_some_and(|s| !s.status.is_finished())
    }

    /// All loops, sorted by address for stable output.
    pub async fn snapshot(&self) -> Vec<LoopState> {
        let mut all: Vec<LoopState> = self.inner.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.address.cmp(&b.address));
        all
    }

    /// Loops that ended on an error and need an external restart.
    pub async fn terminated(&self) -> Vec<LoopState> {
        self.snapshot()
            .await
            .into_iter()
            .filter(|s| matches!(s.status, LoopStatus::Terminated { .. }))
            .collect()
    }

    pub async fn running_count(&self) -> usize {
        self.inner
            .read()
            .await
            .values()
            .filter(|s| !s.status.is_finished())
            .count()
    }
}
