use config::{Config, ConfigError, Environment, File};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::time::Duration;
use url::Url;

use crate::plugins::trackers::DEFAULT_IN_STOCK_PHRASE;
use crate::scheduler::job_schedule;

pub const DEFAULT_CONFIG_PATH: &str = "config/default";

/// Webhook variable read when the config files leave the Discord URL unset.
pub const WEBHOOK_ENV_VAR: &str = "DISCORD_WEBHOOK";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Human name of the tracked item, used in notification text.
    pub item_name: String,
    pub sources: Vec<SourceConfig>,
    pub scraper: ScraperConfig,
    pub scheduler: SchedulerConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub price_selector: String,
    pub stock_selector: String,
    #[serde(default = "default_in_stock_phrase")]
    pub in_stock_phrase: String,
}

fn default_in_stock_phrase() -> String {
    DEFAULT_IN_STOCK_PHRASE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub headless: bool,
    pub element_timeout_ms: u64,
    pub pacing_delay_ms: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub chrome_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub cron: String,
    pub run_on_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Write a daily-rolling log file here in addition to stdout.
    #[serde(default)]
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl ScraperConfig {
    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }
}

impl AppConfig {
    /// Layered load: `base`, then `config/{RUN_MODE}`, then `config/local`,
    /// then `WATCHER_*` environment variables (`__` separates nested keys).
    pub fn load(base: &str) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name(base))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("WATCHER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.notifications.discord.webhook_url.is_none() {
            config.notifications.discord.webhook_url =
                env::var(WEBHOOK_ENV_VAR).ok().filter(|url| !url.trim().is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.item_name.trim().is_empty() {
            return Err(ConfigError::Message("item_name must not be empty".into()));
        }

        if self.sources.is_empty() {
            return Err(ConfigError::Message("At least one source must be configured".into()));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::Message("Source name must not be empty".into()));
            }

            if !names.insert(source.name.as_str()) {
                return Err(ConfigError::Message(format!("Duplicate source name: {}", source.name)));
            }

            if Url::parse(&source.url).is_err() {
                return Err(ConfigError::Message(format!("Invalid URL for source {}", source.name)));
            }

            for selector in [&source.price_selector, &source.stock_selector] {
                if Selector::parse(selector).is_err() {
                    return Err(ConfigError::Message(format!(
                        "Invalid CSS selector for source {}: {}",
                        source.name, selector
                    )));
                }
            }

            if source.in_stock_phrase.trim().is_empty() {
                return Err(ConfigError::Message(format!(
                    "in_stock_phrase must not be empty for source {}",
                    source.name
                )));
            }
        }

        if self.scraper.element_timeout_ms == 0 {
            return Err(ConfigError::Message("Scraper element_timeout_ms must be greater than 0".into()));
        }

        if !is_valid_cron(&self.scheduler.cron) {
            return Err(ConfigError::Message("Invalid cron expression in scheduler.cron".into()));
        }

        if let Some(webhook_url) = &self.notifications.discord.webhook_url {
            if Url::parse(webhook_url).is_err() {
                return Err(ConfigError::Message("Invalid Discord webhook URL".into()));
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        Ok(())
    }
}

/// Cron validation: 5 fields (minute hour day month weekday), or 6 with a
/// leading seconds field. Weekdays use standard numbering, 0 or 7 for Sunday.
pub fn is_valid_cron(cron_expr: &str) -> bool {
    let parts: Vec<&str> = cron_expr.split_whitespace().collect();
    if parts.len() != 5 && parts.len() != 6 {
        return false;
    }

    parts.iter().all(|part| {
        part.chars()
            .all(|c| c.is_ascii_digit() || c == '*' || c == '-' || c == ',' || c == '/')
    }) && job_schedule(cron_expr).is_some()
}
