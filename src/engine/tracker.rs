//! Tracking engine.
//!
//! Owns the lifecycle of every monitored address: record creation on the
//! first valid sighting, then one independent sampling task per address
//! that re-quotes the token forever on a flat schedule.
//!
//! Per address:
//! `Unstarted → Scheduled → AwaitingQuote → Scheduled → … → Terminated`
//!
//! - Quote unavailable: retry after the short delay, record untouched.
//! - Quote available: store price, ratchet the best multiplier, notify when
//!   the multiplier is at or above the win threshold (every such sample,
//!   not only the first crossing), then wait the long interval.
//! - Store write failure: skip this sample, wait the long interval.
//! - Anything else (invalid quote, task panic): the loop ends and is marked
//!   `Terminated` in the [`LoopRegistry`]. Nothing restarts it.
//!
//! A new record for an address always gets a fresh loop. Any older loop
//! still sampling that address (its record was removed, then the address
//! was called again) loses its `run_id` and exits before its next write.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::TrackingConfig;
use crate::engine::registry::LoopRegistry;
use crate::notify::{threshold_text, Notifier};
use crate::quotes::QuoteGateway;
use crate::storage::WatchlistStore;
use crate::types::{LoopStatus, TrackError, TrackedItem};

/// Result of a creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// New record created and a sampling loop spawned.
    Started,
    /// The address was already on the watchlist. Nothing changed.
    AlreadyTracked,
}

/// One successful price check.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub price: f64,
    pub multiplier: f64,
    /// A threshold notice was delivered for this sample.
    pub notified: bool,
    /// `false` when the update touched no row (record deleted externally).
    pub record_present: bool,
}

pub struct Tracker {
    gateway: Arc<dyn QuoteGateway>,
    store: Arc<dyn WatchlistStore>,
    notifier: Arc<dyn Notifier>,
    settings: TrackingConfig,
    loops: LoopRegistry,
}

impl Tracker {
    pub fn new(
        gateway: Arc<dyn QuoteGateway>,
        store: Arc<dyn WatchlistStore>,
        notifier: Arc<dyn Notifier>,
        settings: TrackingConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            notifier,
            settings,
            loops: LoopRegistry::new(),
        }
    }

    pub fn loops(&self) -> &LoopRegistry {
        &self.loops
    }

    pub fn settings(&self) -> &TrackingConfig {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn WatchlistStore> {
        &self.store
    }

    /// Create the record for `address` and schedule its first sample.
    ///
    /// Idempotent: if the address is already tracked, neither the record
    /// nor its sampling schedule is touched. A newly created record replaces
    /// any loop left over from a removed record of the same address.
    pub async fn start_tracking(
        self: &Arc<Self>,
        address: &str,
        initial_price: f64,
        group_name: &str,
    ) -> Result<StartOutcome, TrackError> {
        if !(initial_price.is_finite() && initial_price > 0.0) {
            return Err(TrackError::InvalidInitialPrice {
                address: address.to_string(),
                price: initial_price,
            });
        }

        let item = TrackedItem::new(address, initial_price, group_name);
        let inserted = self
            .store
            .insert_if_absent(&item)
            .await
            .map_err(|e| TrackError::StoreWrite {
                address: address.to_string(),
                message: format!("{e:#}"),
            })?;

        if !inserted {
            debug!(address, group = group_name, "Already tracked, ignoring sighting");
            return Ok(StartOutcome::AlreadyTracked);
        }

        info!(address, group = group_name, initial_price, "Tracking started");
        self.spawn_loop(item, true).await;
        Ok(StartOutcome::Started)
    }

    /// Spawn a sampling loop for every persisted record with a usable
    /// baseline. Returns how many loops were started.
    pub async fn resume_all(self: &Arc<Self>) -> anyhow::Result<usize> {
        let items = self.store.scan_by_multiplier_desc().await?;
        let total = items.len();
        let mut resumed = 0;

        for item in items {
            if !item.has_valid_baseline() {
                warn!(
                    address = %item.address,
                    initial_price = item.initial_price,
                    "Skipping record without a valid initial price"
                );
                continue;
            }
            if self.spawn_loop(item, false).await {
                resumed += 1;
            }
        }

        info!(resumed, total, "Resumed sampling loops");
        Ok(resumed)
    }

    /// Register and spawn the loop, plus a watcher that records a panic
    /// as a terminal status.
    ///
    /// With `supersede`, a loop still running for the address is replaced.
    /// Otherwise returns `false` if one is already running.
    async fn spawn_loop(self: &Arc<Self>, item: TrackedItem, supersede: bool) -> bool {
        let first_sample_at = wall_clock_after(self.settings.initial_delay());
        let run_id = if supersede {
            if self.loops.is_running(&item.address).await {
                info!(address = %item.address, "Replacing sampling loop of a removed record");
            }
            self.loops
                .supersede(
                    &item.address,
                    &item.group_name,
                    item.highest_multiplier,
                    first_sample_at,
                )
                .await
        } else {
            let Some(run_id) = self
                .loops
                .register(
                    &item.address,
                    &item.group_name,
                    item.highest_multiplier,
                    first_sample_at,
                )
                .await
            else {
                debug!(address = %item.address, "Sampling loop already running");
                return false;
            };
            run_id
        };

        let address = item.address.clone();
        let tracker = Arc::clone(self);
        let handle = tokio::spawn(async move { tracker.run_sampling_loop(item, run_id).await });

        let loops = self.loops.clone();
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                error!(address = %address, run_id = %run_id, error = %e, "Sampling loop crashed");
                loops
                    .mark_terminated(&address, run_id, format!("sampling task failed: {e}"))
                    .await;
            }
        });

        true
    }

    async fn run_sampling_loop(self: Arc<Self>, item: TrackedItem, run_id: Uuid) {
        let address = item.address.as_str();
        let mut delay = self.settings.initial_delay();

        debug!(address, run_id = %run_id, "Sampling loop started");

        loop {
            self.loops
                .set_status(
                    address,
                    run_id,
                    LoopStatus::Scheduled {
                        next_sample_at: wall_clock_after(delay),
                    },
                )
                .await;
            tokio::time::sleep(delay).await;

            if !self.loops.is_current(address, run_id).await {
                debug!(address, run_id = %run_id, "Sampling loop superseded, exiting");
                return;
            }
            self.loops
                .set_status(address, run_id, LoopStatus::AwaitingQuote)
                .await;

            match self.sample(&item, Some(run_id)).await {
                Ok(sample) => {
                    self.loops
                        .record_sample(
                            address,
                            run_id,
                            sample.price,
                            sample.multiplier,
                            sample.notified,
                        )
                        .await;

                    if !sample.record_present {
                        if self.settings.stop_when_removed {
                            info!(address, "Record removed, stopping sampling loop");
                            let removed = LoopStatus::Removed { at: Utc::now() };
                            self.loops.set_status(address, run_id, removed).await;
                            return;
                        }
                        if self.loops.mark_record_missing(address, run_id).await {
                            warn!(address, "Record no longer in watchlist, sampling continues");
                        }
                    }
                    delay = self.settings.sample_interval();
                }
                Err(TrackError::Superseded(_)) => {
                    debug!(address, run_id = %run_id, "Sampling loop superseded, exiting");
                    return;
                }
                Err(e) if e.is_transient() => {
                    self.loops.record_unavailable(address, run_id).await;
                    debug!(address, "Quote unavailable, retrying shortly");
                    delay = self.settings.retry_delay();
                }
                Err(e) if e.is_terminal() => {
                    error!(address, run_id = %run_id, error = %e, "Sampling loop terminated");
                    self.loops.mark_terminated(address, run_id, e.to_string()).await;
                    return;
                }
                Err(e) => {
                    warn!(address, error = %e, "Sample skipped");
                    delay = self.settings.sample_interval();
                }
            }
        }
    }

    /// Run one price check for `item`.
    pub async fn sample_once(&self, item: &TrackedItem) -> Result<Sample, TrackError> {
        self.sample(item, None).await
    }

    /// One price check. With a `run_id`, nothing is written once that run
    /// no longer owns the address.
    async fn sample(
        &self,
        item: &TrackedItem,
        run_id: Option<Uuid>,
    ) -> Result<Sample, TrackError> {
        let address = item.address.as_str();

        let price = match self.gateway.fetch_price(address).await {
            Ok(Some(price)) => price,
            Ok(None) => return Err(TrackError::QuoteUnavailable(address.to_string())),
            Err(e) => {
                debug!(address, provider = self.gateway.name(), error = %e, "Quote request failed");
                return Err(TrackError::QuoteUnavailable(address.to_string()));
            }
        };

        if !price.is_finite() || price < 0.0 {
            return Err(TrackError::Sampling {
                address: address.to_string(),
                message: format!("provider returned invalid price {price}"),
            });
        }

        let multiplier = item.multiplier_at(price);
        if !multiplier.is_finite() {
            return Err(TrackError::Sampling {
                address: address.to_string(),
                message: format!(
                    "multiplier is not finite (price {price}, initial {})",
                    item.initial_price
                ),
            });
        }

        if let Some(run_id) = run_id {
            if !self.loops.is_current(address, run_id).await {
                return Err(TrackError::Superseded(address.to_string()));
            }
        }

        let changed = self
            .store
            .record_sample(address, price, multiplier)
            .await
            .map_err(|e| TrackError::StoreWrite {
                address: address.to_string(),
                message: format!("{e:#}"),
            })?;
        let record_present = changed > 0;

        let mut notified = false;
        let suppress = !record_present && self.settings.stop_when_removed;
        if multiplier >= self.settings.win_threshold && !suppress {
            match self.notifier.send(&threshold_text(address, multiplier)).await {
                Ok(()) => notified = true,
                Err(e) => warn!(address, error = %e, "Failed to send threshold notice"),
            }
        }

        debug!(
            address,
            price,
            multiplier = format!("{multiplier:.4}"),
            notified,
            "Sample recorded"
        );

        Ok(Sample {
            price,
            multiplier,
            notified,
            record_present,
        })
    }
}

/// Wall-clock time `delay` from now, for status display.
fn wall_clock_after(delay: Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
