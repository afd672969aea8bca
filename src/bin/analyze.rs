//! Print the performance report for every tracked address.
//!
//! Usage: `analyze [--json]`

use anyhow::{Context, Result};

use callwatch::config::AppConfig;
use callwatch::engine::build_report;
use callwatch::logging::init_logging;
use callwatch::storage::{SqliteStore, WatchlistStore};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    init_logging();

    let json = std::env::args().skip(1).any(|a| a == "--json");

    let cfg = AppConfig::load_or_default(&AppConfig::default_path())?;
    let store = SqliteStore::connect(&cfg.storage.database_url)
        .await
        .context("Failed to open watchlist database")?;

    let items = store.scan_by_multiplier_desc().await?;
    let report = build_report(items, cfg.tracking.win_threshold);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}
