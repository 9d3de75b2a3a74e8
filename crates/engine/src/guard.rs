use chrono::{DateTime, Utc};
use tracing::debug;

use common::{Action, Alert, ContextKey, SignalSeries};

/// Outcome of feeding one freshly computed series to a [`LiveGuard`].
#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    /// The last candle was already evaluated; nothing changed.
    Duplicate,
    /// New candle (or empty series) without an actionable signal.
    Quiet,
    Emit(Alert),
}

/// Remembers the last candle evaluated for one (symbol, interval) context so
/// each distinct candle produces at most one alert, whatever the polling period.
#[derive(Debug, Clone, Default)]
pub struct LiveGuard {
    last_candle: Option<DateTime<Utc>>,
}

impl LiveGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_candle(&self) -> Option<DateTime<Utc>> {
        self.last_candle
    }

    pub fn observe(&mut self, key: &ContextKey, series: &SignalSeries) -> GuardDecision {
        let Some(row) = series.last() else {
            return GuardDecision::Quiet;
        };
        let candle_time = row.candle.timestamp;

        if self.last_candle == Some(candle_time) {
            debug!(context = %key, %candle_time, "Candle already evaluated");
            return GuardDecision::Duplicate;
        }
        self.last_candle = Some(candle_time);

        match Action::from_stance(row.signal) {
            Some(action) => GuardDecision::Emit(Alert {
                symbol: key.symbol.clone(),
                action,
                price: row.candle.close,
                timestamp: candle_time,
            }),
            None => GuardDecision::Quiet,
        }
    }
}
