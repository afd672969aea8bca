//! CALLWATCH, a token-call tracker for chat groups.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the quote gateway, watchlist store and report notifier into the
//! tracker, resumes persisted loops, and listens to the source groups
//! until Ctrl+C.

use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use std::sync::Arc;
use teloxide::Bot;
use tracing::{info, warn};

use callwatch::chat::telegram::run_listener;
use callwatch::config::{self, GroupDirectory};
use callwatch::dashboard::{spawn_dashboard, DashboardState};
use callwatch::engine::{Classifier, Ingestor, Tracker};
use callwatch::logging::init_logging;
use callwatch::notify::telegram::parse_recipient;
use callwatch::notify::{LogNotifier, Notifier, TelegramNotifier};
use callwatch::quotes::dexscreener::DexScreenerClient;
use callwatch::quotes::QuoteGateway;
use callwatch::storage::{SqliteStore, WatchlistStore};

const BANNER: &str = r#"
   ____    _    _     _ __        ___  _____ ____ _   _
  / ___|  / \  | |   | |\ \      / / \|_   _/ ___| | | |
 | |     / _ \ | |   | | \ \ /\ / / _ \ | || |   | |_| |
 | |___ / ___ \| |___| |__\ V  V / ___ \| || |___|  _  |
  \____/_/   \_\_____|_____\_/\_/_/   \_\_| \____|_| |_|

  Token-call tracker
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path = config::AppConfig::default_path();
    let cfg = config::AppConfig::load(&config_path)?;
    cfg.validate_for_bot()?;

    println!("{BANNER}");
    info!(
        bot_name = %cfg.bot.name,
        config = %config_path,
        sample_interval_secs = cfg.tracking.sample_interval_secs,
        win_threshold = cfg.tracking.win_threshold,
        dry_run = cfg.bot.dry_run,
        "CALLWATCH starting up"
    );

    // -- Initialise components -------------------------------------------

    let token = cfg.bot_token()?;
    let bot = Bot::new(token.expose_secret().as_str());

    let notifier: Arc<dyn Notifier> = if cfg.bot.dry_run {
        warn!("Dry run: notices are logged, not posted");
        Arc::new(LogNotifier)
    } else {
        let report_chat = config::AppConfig::resolve_env(&cfg.bot.report_chat_env)?;
        Arc::new(TelegramNotifier::new(bot.clone(), parse_recipient(&report_chat)))
    };

    let store: Arc<dyn WatchlistStore> = Arc::new(
        SqliteStore::connect(&cfg.storage.database_url)
            .await
            .context("Failed to open watchlist database")?,
    );
    let gateway: Arc<dyn QuoteGateway> = Arc::new(DexScreenerClient::new(&cfg.quotes)?);

    let tracker = Arc::new(Tracker::new(
        gateway.clone(),
        store.clone(),
        notifier.clone(),
        cfg.tracking.clone(),
    ));

    if cfg.tracking.resume_on_startup {
        tracker
            .resume_all()
            .await
            .context("Failed to resume sampling loops")?;
    }

    let directory = GroupDirectory::from_config(&cfg.groups);
    info!(groups = directory.len(), "Source groups configured");

    let ingestor = Arc::new(Ingestor::new(
        Classifier::new(directory, &cfg.tracking),
        gateway,
        tracker.clone(),
        notifier,
        cfg.templates.clone(),
    ));

    if cfg.dashboard.enabled {
        spawn_dashboard(
            Arc::new(DashboardState::new(
                store,
                tracker.loops().clone(),
                cfg.tracking.win_threshold,
            )),
            cfg.dashboard.port,
        );
    }

    // -- Listen ----------------------------------------------------------

    info!("Listening to source groups. Press Ctrl+C to stop.");
    run_listener(bot, ingestor).await;

    let loops = tracker.loops();
    info!(
        running = loops.running_count().await,
        terminated = loops.terminated().await.len(),
        "CALLWATCH shut down"
    );
    Ok(())
}
