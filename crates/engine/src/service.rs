use std::sync::Arc;

use tracing::{info, warn};

use backtest::{BacktestReport, BacktestTable};
use common::{Alert, ContextKey, Error, MarketData, Notifier, Result, SignalSeries};
use strategy::{StrategyConfig, StrategyParams, StrategyRegistry};

use crate::eodhd::is_supported_interval;
use crate::guard::{GuardDecision, LiveGuard};
use crate::session::{Session, SessionConfig};

/// Command-level surface shared by the chat bot, the scheduler and the CLI.
pub struct SignalService {
    session: Session,
    market: Arc<dyn MarketData>,
    notifier: Arc<dyn Notifier>,
}

impl SignalService {
    pub fn new(session: Session, market: Arc<dyn MarketData>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            session,
            market,
            notifier,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn list_strategies(&self) -> Vec<&'static str> {
        StrategyRegistry::list()
    }

    /// Validate `name` + `params` by building the strategy, then make it the
    /// session strategy. The session is untouched on error.
    pub async fn set_strategy(&self, name: &str, params: StrategyParams) -> Result<StrategyConfig> {
        let built = StrategyRegistry::create(name, &params)?;
        let strategy = StrategyConfig::new(built.name(), params);
        let cfg = self.session.update(|c| c.strategy = strategy).await;
        info!(strategy = %cfg.strategy, "Strategy changed");
        Ok(cfg.strategy)
    }

    pub async fn current_strategy(&self) -> StrategyConfig {
        self.session.snapshot().await.strategy
    }

    pub async fn set_symbol(&self, symbol: &str) -> SessionConfig {
        let symbol = symbol.trim().to_string();
        let cfg = self.session.update(|c| c.symbol = symbol).await;
        info!(symbol = %cfg.symbol, "Symbol changed");
        cfg
    }

    pub async fn set_interval(&self, interval: &str) -> Result<SessionConfig> {
        let interval = interval.trim();
        if !is_supported_interval(interval) {
            return Err(Error::InvalidInterval(interval.to_string()));
        }
        let cfg = self.session.update(|c| c.interval = interval.to_string()).await;
        info!(interval = %cfg.interval, "Interval changed");
        Ok(cfg)
    }

    /// Latest quote of the session symbol.
    pub async fn price(&self) -> Result<(String, Option<f64>)> {
        let symbol = self.session.snapshot().await.symbol;
        let price = self.market.latest_price(&symbol).await?;
        Ok((symbol, price))
    }

    /// Fetch `symbol` history, run `strategy` over it and simulate the result.
    /// `fee` defaults to the session fee rate.
    pub async fn backtest(
        &self,
        strategy: &StrategyConfig,
        symbol: &str,
        interval: &str,
        fee: Option<f64>,
    ) -> Result<BacktestReport> {
        if let Some(fee) = fee {
            if !(0.0..1.0).contains(&fee) {
                return Err(Error::invalid_param(
                    &strategy.strategy_type,
                    "fee",
                    format!("{fee} is not a fraction in [0, 1)"),
                ));
            }
        }
        let opts = self.session.snapshot().await.backtest_options(fee);
        let signals = self.signals(strategy, symbol, interval).await?;
        backtest::simulate(&BacktestTable::from(&signals), &opts)
    }

    /// Backtest over the session symbol and interval, rendered as a chat
    /// summary.
    ///
    /// Without a name the session strategy runs with its parameters; a named
    /// strategy other than the session one runs with its defaults.
    pub async fn backtest_summary(&self, strategy: Option<&str>, fee: Option<f64>) -> Result<String> {
        let cfg = self.session.snapshot().await;
        let strategy = match strategy {
            Some(name) if !name.trim().eq_ignore_ascii_case(&cfg.strategy.strategy_type) => {
                StrategyConfig::new(name.trim().to_lowercase(), StrategyParams::new())
            }
            _ => cfg.strategy.clone(),
        };
        let report = self
            .backtest(&strategy, &cfg.symbol, &cfg.interval, fee)
            .await?;
        let title = format!("{} ({}, {})", cfg.symbol, cfg.interval, strategy);
        Ok(report.summary(&title))
    }

    /// Unguarded look at the latest candle of the session context: the
    /// alert it would carry, if any. Leaves the live guard untouched.
    pub async fn latest_signal(&self) -> Result<Option<Alert>> {
        let cfg = self.session.snapshot().await;
        let signals = self
            .signals(&cfg.strategy, &cfg.symbol, &cfg.interval)
            .await?;
        let mut probe = LiveGuard::new();
        Ok(match probe.observe(&cfg.context_key(), &signals) {
            GuardDecision::Emit(alert) => Some(alert),
            _ => None,
        })
    }

    /// Guarded live evaluation of one context.
    ///
    /// The context's guard stays locked from fetch to update, so overlapping
    /// calls for the same context run one after the other and a candle is
    /// reported at most once.
    pub async fn analyse(
        &self,
        symbol: &str,
        interval: &str,
        strategy: &str,
        params: &StrategyParams,
    ) -> Result<Option<Alert>> {
        let strategy = StrategyRegistry::create(strategy, params)?;
        let key = ContextKey::new(symbol, interval);

        let slot = self.session.guard(&key).await;
        let mut guard = slot.lock().await;

        let series = self.market.fetch_ohlc(symbol, interval).await?;
        let signals = strategy.generate_signals(&series)?;

        match guard.observe(&key, &signals) {
            GuardDecision::Emit(alert) => {
                info!(context = %key, action = %alert.action, price = alert.price, "New signal");
                Ok(Some(alert))
            }
            GuardDecision::Quiet | GuardDecision::Duplicate => Ok(None),
        }
    }

    /// One scheduled evaluation of the session context. Failures are logged
    /// and produce nothing.
    pub async fn tick(&self) -> Option<Alert> {
        let cfg = self.session.snapshot().await;
        let result = self
            .analyse(
                &cfg.symbol,
                &cfg.interval,
                &cfg.strategy.strategy_type,
                &cfg.strategy.params,
            )
            .await;

        match result {
            Ok(Some(alert)) => {
                if let Err(e) = self.notifier.notify(&alert.to_string()).await {
                    warn!(context = %cfg.context_key(), error = %e, "Failed to deliver alert");
                }
                Some(alert)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(context = %cfg.context_key(), error = %e, "Live evaluation skipped");
                None
            }
        }
    }

    async fn signals(
        &self,
        strategy: &StrategyConfig,
        symbol: &str,
        interval: &str,
    ) -> Result<SignalSeries> {
        let strategy = StrategyRegistry::from_config(strategy)?;
        let series = self.market.fetch_ohlc(symbol, interval).await?;
        strategy.generate_signals(&series)
    }
}
