use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use common::TIME_FORMAT;

/// Number of trailing log lines included in a summary message.
pub const SUMMARY_LOG_LINES: usize = 10;

/// A realized round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_price: f64,
    pub entry_time: Option<DateTime<Utc>>,
    pub exit_price: f64,
    pub exit_time: Option<DateTime<Utc>>,
    /// Fractional return net of fee, e.g. `0.05` for +5%.
    pub net_return: f64,
    /// Closed at the last row because the series ended while long.
    pub marked_to_market: bool,
}

impl Trade {
    pub fn return_pct(&self) -> f64 {
        self.net_return * 100.0
    }

    pub fn is_win(&self) -> bool {
        self.net_return > 0.0
    }
}

/// Aggregate statistics of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestReport {
    pub trades: usize,
    /// Sum of per-trade returns in percent, rounded to 2 decimals.
    pub total_return_pct: f64,
    /// Winning share of trades in percent, rounded to 2 decimals; 0 without trades.
    pub win_rate_pct: f64,
    pub wins: usize,
    /// Trades returning zero or less.
    pub losses: usize,
    pub log: Vec<String>,
    pub ledger: Vec<Trade>,
    /// Rows left after dropping incomplete ones.
    pub data_points: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl BacktestReport {
    pub(crate) fn from_ledger(
        ledger: Vec<Trade>,
        log: Vec<String>,
        data_points: usize,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Self {
        let trades = ledger.len();
        let wins = ledger.iter().filter(|t| t.is_win()).count();
        let total: f64 = ledger.iter().map(|t| t.net_return).sum();
        let win_rate = if trades > 0 {
            wins as f64 / trades as f64 * 100.0
        } else {
            0.0
        };

        Self {
            trades,
            total_return_pct: round2(total * 100.0),
            win_rate_pct: round2(win_rate),
            wins,
            losses: trades - wins,
            log,
            ledger,
            data_points,
            start_time,
            end_time,
        }
    }

    /// Multi-line chat message with the headline numbers and the last
    /// [`SUMMARY_LOG_LINES`] log lines.
    pub fn summary(&self, title: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Backtest results for {title}");
        let _ = writeln!(out, "Trades: {}", self.trades);
        let _ = writeln!(out, "Wins: {} | Losses: {}", self.wins, self.losses);
        let _ = writeln!(out, "Win rate: {:.2}%", self.win_rate_pct);
        let _ = writeln!(out, "Total return: {:.2}%", self.total_return_pct);
        let _ = writeln!(out, "Data points: {}", self.data_points);
        let _ = write!(
            out,
            "Period: {} \u{2192} {}",
            fmt_time(self.start_time),
            fmt_time(self.end_time)
        );

        if !self.log.is_empty() {
            let skip = self.log.len().saturating_sub(SUMMARY_LOG_LINES);
            let _ = write!(out, "\n\nLast trades:");
            for line in &self.log[skip..] {
                let _ = write!(out, "\n{line}");
            }
        }
        out
    }
}

fn fmt_time(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
