//! SQLite-backed watchlist.
//!
//! Uses the same `watchlist` table layout as earlier versions of the bot,
//! so an existing `watchlist.db` can be opened as-is.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use super::WatchlistStore;
use crate::types::{TrackedItem, UNKNOWN_GROUP};

const INIT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS watchlist (
    ca TEXT PRIMARY KEY,
    initial_price REAL,
    current_price REAL,
    highest_multiplier REAL DEFAULT 1.0,
    group_name TEXT,
    tracked_since TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
"#;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `database_url` and make
    /// sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database: {database_url}"))?;

        sqlx::query(INIT_SCHEMA)
            .execute(&pool)
            .await
            .context("Failed to initialise watchlist schema")?;

        info!(database_url, "Watchlist database ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_item(row: &SqliteRow) -> Result<TrackedItem> {
        let tracked_since: Option<DateTime<Utc>> = row.try_get("tracked_since")?;
        Ok(TrackedItem {
            address: row.try_get("ca")?,
            initial_price: row.try_get::<Option<f64>, _>("initial_price")?.unwrap_or(0.0),
            current_price: row.try_get("current_price")?,
            highest_multiplier: row
                .try_get::<Option<f64>, _>("highest_multiplier")?
                .unwrap_or(1.0),
            group_name: row
                .try_get::<Option<String>, _>("group_name")?
                .unwrap_or_else(|| UNKNOWN_GROUP.to_string()),
            tracked_since: tracked_since.unwrap_or_else(Utc::now),
        })
    }
}

#[async_trait]
impl WatchlistStore for SqliteStore {
    async fn insert_if_absent(&self, item: &TrackedItem) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO watchlist
             (ca, initial_price, current_price, highest_multiplier, group_name, tracked_since)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.address)
        .bind(item.initial_price)
        .bind(item.current_price)
        .bind(item.highest_multiplier)
        .bind(&item.group_name)
        .bind(item.tracked_since)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to add {} to watchlist", item.address))?;

        let inserted = result.rows_affected() > 0;
        debug!(address = %item.address, inserted, "Watchlist insert");
        Ok(inserted)
    }

    async fn record_sample(
        &self,
        address: &str,
        current_price: f64,
        multiplier: f64,
    ) -> Result<u64> {
        // MAX() keeps the ratchet atomic per row.
        let result = sqlx::query(
            "UPDATE watchlist
             SET current_price = ?,
                 highest_multiplier = MAX(COALESCE(highest_multiplier, 1.0), ?)
             WHERE ca = ?",
        )
        .bind(current_price)
        .bind(multiplier)
        .bind(address)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update watchlist entry {address}"))?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, address: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM watchlist WHERE ca = ?")
            .bind(address)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to remove {address} from watchlist"))?;

        Ok(result.rows_affected())
    }

    async fn get(&self, address: &str) -> Result<Option<TrackedItem>> {
        let row = sqlx::query(
            "SELECT ca, initial_price, current_price, highest_multiplier, group_name, tracked_since
             FROM watchlist WHERE ca = ?",
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load watchlist entry {address}"))?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn scan_by_multiplier_desc(&self) -> Result<Vec<TrackedItem>> {
        let rows = sqlx::query(
            "SELECT ca, initial_price, current_price, highest_multiplier, group_name, tracked_since
             FROM watchlist
             ORDER BY highest_multiplier DESC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to scan watchlist")?;

        rows.iter().map(Self::row_to_item).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
