//! Remove one address from the watchlist.
//!
//! Usage: `remove <address>`

use anyhow::{bail, Context, Result};

use callwatch::config::AppConfig;
use callwatch::logging::init_logging;
use callwatch::storage::{remove_from_watchlist, Removal, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [address] = args.as_slice() else {
        bail!("usage: remove <address>");
    };
    let address = address.trim();

    let cfg = AppConfig::load_or_default(&AppConfig::default_path())?;
    let store = SqliteStore::connect(&cfg.storage.database_url)
        .await
        .context("Failed to open watchlist database")?;

    match remove_from_watchlist(&store, address).await? {
        Removal::Removed => println!("CA {address} removed from the watchlist."),
        Removal::NotFound => println!("CA {address} not found in the watchlist."),
    }
    Ok(())
}
