use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use backtest::BacktestOptions;
use common::{Config, ContextKey};
use strategy::StrategyConfig;

use crate::guard::LiveGuard;

/// What the next evaluation runs: which instrument, at which candle interval,
/// with which strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub symbol: String,
    pub interval: String,
    pub strategy: StrategyConfig,
    pub fee_rate: f64,
    pub mark_to_market: bool,
}

impl SessionConfig {
    pub fn from_config(config: &Config, strategy: StrategyConfig) -> Self {
        Self {
            symbol: config.default_symbol.clone(),
            interval: config.default_interval.clone(),
            strategy,
            fee_rate: config.fee_rate,
            mark_to_market: config.mark_to_market,
        }
    }

    pub fn context_key(&self) -> ContextKey {
        ContextKey::new(&self.symbol, &self.interval)
    }

    pub fn backtest_options(&self, fee_rate: Option<f64>) -> BacktestOptions {
        BacktestOptions {
            fee_rate: fee_rate.unwrap_or(self.fee_rate),
            mark_to_market: self.mark_to_market,
        }
    }
}

/// Mutable state of one running bot.
///
/// The config is swapped atomically and read once per evaluation, so a
/// change lands on the next evaluation rather than one in progress. Each
/// context owns its own guard behind an async mutex; holding that mutex for
/// the whole evaluation keeps evaluations of one context strictly serial.
pub struct Session {
    config: RwLock<SessionConfig>,
    guards: Mutex<HashMap<ContextKey, Arc<Mutex<LiveGuard>>>>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config: RwLock::new(config),
            guards: Mutex::new(HashMap::new()),
        }
    }

    /// Copy of the current config.
    pub async fn snapshot(&self) -> SessionConfig {
        self.config.read().await.clone()
    }

    /// Apply `f` under the write lock and return the updated config.
    pub async fn update<F>(&self, f: F) -> SessionConfig
    where
        F: FnOnce(&mut SessionConfig),
    {
        let mut cfg = self.config.write().await;
        f(&mut cfg);
        cfg.clone()
    }

    /// Guard of `key`, created on first use.
    pub async fn guard(&self, key: &ContextKey) -> Arc<Mutex<LiveGuard>> {
        let mut guards = self.guards.lock().await;
        guards.entry(key.clone()).or_default().clone()
    }
}
