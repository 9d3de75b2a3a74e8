use std::str::FromStr;

use crate::market::{is_supported_interval, EOD_INTERVALS, INTRADAY_INTERVALS};
use crate::{Error, Result};

/// All configuration loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_token: String,
    /// Chats that receive live buy/sell notifications.
    pub telegram_chat_ids: Vec<i64>,
    /// Users allowed to issue commands. Falls back to `telegram_chat_ids`.
    pub telegram_allowed_user_ids: Vec<i64>,

    // Market data
    pub eodhd_api_token: String,
    pub eodhd_base_url: Option<String>,

    // Session defaults
    pub default_symbol: String,
    pub default_interval: String,
    pub fee_rate: f64,
    pub mark_to_market: bool,
    pub poll_interval_secs: u64,

    // Strategy config file path
    pub strategy_config_path: Option<String>,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let telegram_chat_ids =
            parse_id_list("TELEGRAM_CHAT_IDS", &required_env("TELEGRAM_CHAT_IDS")?)?;
        let telegram_allowed_user_ids = match optional_env("TELEGRAM_ALLOWED_USER_IDS") {
            Some(raw) if !raw.trim().is_empty() => {
                parse_id_list("TELEGRAM_ALLOWED_USER_IDS", &raw)?
            }
            _ => telegram_chat_ids.clone(),
        };

        let fee_rate: f64 = parse_env("FEE_RATE", 0.001)?;
        if !(0.0..1.0).contains(&fee_rate) {
            return Err(Error::Config(format!(
                "FEE_RATE must be a fraction in [0, 1), got {fee_rate}"
            )));
        }

        let poll_interval_secs: u64 = parse_env("POLL_INTERVAL_SECS", 60)?;
        if poll_interval_secs == 0 {
            return Err(Error::Config("POLL_INTERVAL_SECS must be positive".into()));
        }

        let default_interval = validate_interval(
            optional_env("DEFAULT_INTERVAL").unwrap_or_else(|| "d".to_string()),
        )?;

        Ok(Config {
            telegram_token: required_env("TELEGRAM_TOKEN")?,
            telegram_chat_ids,
            telegram_allowed_user_ids,
            eodhd_api_token: required_env("EODHD_API_TOKEN")?,
            eodhd_base_url: optional_env("EODHD_BASE_URL"),
            default_symbol: optional_env("DEFAULT_SYMBOL")
                .unwrap_or_else(|| "AAPL.US".to_string()),
            default_interval,
            fee_rate,
            mark_to_market: parse_env("MARK_TO_MARKET", false)?,
            poll_interval_secs,
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH"),
        })
    }
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        Error::Config(format!(
            "Required environment variable '{key}' is not set. Check your .env file."
        ))
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: '{raw}'"))),
        None => Ok(default),
    }
}

fn validate_interval(raw: String) -> Result<String> {
    let interval = raw.trim();
    if !is_supported_interval(interval) {
        let accepted: Vec<&str> = INTRADAY_INTERVALS.iter().chain(&EOD_INTERVALS).copied().collect();
        return Err(Error::Config(format!(
            "DEFAULT_INTERVAL must be one of {}; got '{raw}'",
            accepted.join(", ")
        )));
    }
    Ok(interval.to_string())
}

fn parse_id_list(key: &str, raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| Error::Config(format!("{key} contains non-numeric ID: '{s}'")))
        })
        .collect()
}
