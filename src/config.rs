//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the bot token) are referenced by env-var name in the config
//! and resolved at runtime via `std::env::var`.

use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::types::{GroupCategory, DEFAULT_WIN_THRESHOLD};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub groups: GroupsConfig,
    pub templates: TemplatesConfig,
    pub tracking: TrackingConfig,
    pub quotes: QuotesConfig,
    pub storage: StorageConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BotConfig {
    pub name: String,
    /// Env var holding the Telegram bot token.
    pub telegram_token_env: String,
    /// Env var holding the report chat (numeric id or `@channel`).
    pub report_chat_env: String,
    /// Log outbound notices instead of posting them.
    pub dry_run: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "CALLWATCH-001".to_string(),
            telegram_token_env: "TELEGRAM_API_KEY".to_string(),
            report_chat_env: "POST_GROUP".to_string(),
            dry_run: false,
        }
    }
}

/// Source group names by category.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GroupsConfig {
    pub red: Vec<String>,
    pub yellow: Vec<String>,
    pub green: Vec<String>,
}

impl GroupsConfig {
    pub fn is_empty(&self) -> bool {
        self.red.is_empty() && self.yellow.is_empty() && self.green.is_empty()
    }
}

/// Text appended to the "tracking started" notice, per group category.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TemplatesConfig {
    pub red: String,
    pub yellow: String,
    pub green: String,
    pub default: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            red: "Red group template".to_string(),
            yellow: "Yellow group template".to_string(),
            green: "Green group template".to_string(),
            default: "Placeholder template".to_string(),
        }
    }
}

impl TemplatesConfig {
    pub fn for_category(&self, category: GroupCategory) -> &str {
        match category {
            GroupCategory::Red => &self.red,
            GroupCategory::Yellow => &self.yellow,
            GroupCategory::Green => &self.green,
            GroupCategory::Unlisted => &self.default,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrackingConfig {
    /// Delay before the first sample after tracking starts.
    pub initial_delay_secs: u64,
    /// Delay before retrying when the quote is unavailable.
    pub retry_delay_secs: u64,
    /// Delay between successful samples.
    pub sample_interval_secs: u64,
    pub win_threshold: f64,
    pub min_address_len: usize,
    pub excluded_prefixes: Vec<String>,
    /// Respawn sampling loops for persisted rows at startup.
    pub resume_on_startup: bool,
    /// End a loop once its record has been deleted externally.
    pub stop_when_removed: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 3,
            retry_delay_secs: 3,
            sample_interval_secs: 300,
            win_threshold: DEFAULT_WIN_THRESHOLD,
            min_address_len: 32,
            excluded_prefixes: vec!["0x".to_string()],
            resume_on_startup: true,
            stop_when_removed: false,
        }
    }
}

impl TrackingConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QuotesConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.dexscreener.com/latest/dex/search".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://watchlist.db".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8090,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    /// Used by the admin binaries, which only need the storage section.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!(path, "No config file found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Path of the config file: `CALLWATCH_CONFIG` or `config.toml`.
    pub fn default_path() -> String {
        std::env::var("CALLWATCH_CONFIG").unwrap_or_else(|_| "config.toml".to_string())
    }

    /// Reject values the tracker cannot run with.
    pub fn validate(&self) -> Result<()> {
        let t = &self.tracking;
        if t.initial_delay_secs == 0 || t.retry_delay_secs == 0 || t.sample_interval_secs == 0 {
            bail!("tracking delays must be at least one second");
        }
        if !(t.win_threshold.is_finite() && t.win_threshold > 1.0) {
            bail!("tracking.win_threshold must be greater than 1.0, got {}", t.win_threshold);
        }
        if t.min_address_len == 0 {
            bail!("tracking.min_address_len must be positive");
        }
        if self.quotes.timeout_secs == 0 {
            bail!("quotes.timeout_secs must be positive");
        }
        Ok(())
    }

    /// Extra checks for running the chat bot itself.
    pub fn validate_for_bot(&self) -> Result<()> {
        if self.groups.is_empty() {
            bail!("no source groups configured: set at least one of groups.red, groups.yellow, groups.green");
        }
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Resolve the bot token as a secret.
    pub fn bot_token(&self) -> Result<SecretString> {
        Self::resolve_env(&self.bot.telegram_token_env).map(SecretString::new)
    }
}

// ---------------------------------------------------------------------------
// Group directory
// ---------------------------------------------------------------------------

/// Explicit group → category mapping handed to the classifier.
#[derive(Debug, Clone, Default)]
pub struct GroupDirectory {
    categories: HashMap<String, GroupCategory>,
}

impl GroupDirectory {
    /// Build from config. A name listed twice keeps its first category in
    /// red, yellow, green order.
    pub fn from_config(groups: &GroupsConfig) -> Self {
        let mut categories = HashMap::new();
        let lists = [
            (&groups.red, GroupCategory::Red),
            (&groups.yellow, GroupCategory::Yellow),
            (&groups.green, GroupCategory::Green),
        ];
        for (names, category) in lists {
            for name in names {
                categories.entry(name.clone()).or_insert(category);
            }
        }
        Self { categories }
    }

    pub fn category_of(&self, group_name: &str) -> GroupCategory {
        self.categories
            .get(group_name)
            .copied()
            .unwrap_or(GroupCategory::Unlisted)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
