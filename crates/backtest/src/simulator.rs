use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use common::{Error, Result};

use crate::report::{BacktestReport, Trade};
use crate::table::{BacktestRow, BacktestTable};

/// Knobs of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestOptions {
    /// Round-trip trading cost as a fraction (0.001 = 0.1%).
    pub fee_rate: f64,
    /// Close a position still open at the last row and score it.
    pub mark_to_market: bool,
}

impl Default for BacktestOptions {
    fn default() -> Self {
        Self {
            fee_rate: 0.001,
            mark_to_market: false,
        }
    }
}

impl BacktestOptions {
    pub fn with_fee(fee_rate: f64) -> Self {
        Self {
            fee_rate,
            ..Self::default()
        }
    }
}

enum State {
    Flat,
    Long {
        entry_price: f64,
        entry_time: Option<DateTime<Utc>>,
    },
}

/// Replay `table` as a flat/long state machine.
///
/// Signal `1` opens a position at the row's close when flat, `-1` closes it
/// when long; every other combination is inert. Rows missing `close` or
/// `signal` are dropped first. A position still open at the end is ignored
/// unless `mark_to_market` is set.
pub fn simulate(table: &BacktestTable, opts: &BacktestOptions) -> Result<BacktestReport> {
    let missing = table.missing_columns();
    if !missing.is_empty() {
        return Err(Error::MissingColumns(missing));
    }

    let rows: Vec<&BacktestRow> = table.rows().iter().filter(|r| r.is_complete()).collect();

    let mut state = State::Flat;
    let mut ledger = Vec::new();
    let mut log = Vec::new();

    for row in &rows {
        let (Some(price), Some(signal)) = (row.close, row.signal) else {
            continue;
        };

        match state {
            State::Flat if signal == 1.0 => {
                log.push(format!("BUY at {price:.2} on {}", row.label()));
                debug!(price, time = %row.label(), "Backtest entry");
                state = State::Long {
                    entry_price: price,
                    entry_time: row.time,
                };
            }
            State::Long {
                entry_price,
                entry_time,
            } if signal == -1.0 => {
                let trade = close_trade(entry_price, entry_time, row, opts.fee_rate, false);
                log.push(format!(
                    "SELL at {price:.2} on {} (Return: {:.2}%)",
                    row.label(),
                    trade.return_pct()
                ));
                debug!(price, net_return = trade.net_return, "Backtest exit");
                ledger.push(trade);
                state = State::Flat;
            }
            _ => {}
        }
    }

    if let (
        State::Long {
            entry_price,
            entry_time,
        },
        Some(last),
    ) = (&state, rows.last())
    {
        if opts.mark_to_market {
            let trade = close_trade(*entry_price, *entry_time, last, opts.fee_rate, true);
            log.push(format!(
                "CLOSE at {:.2} on {} (mark-to-market, Return: {:.2}%)",
                trade.exit_price,
                last.label(),
                trade.return_pct()
            ));
            ledger.push(trade);
        } else {
            debug!(entry_price, "Open position at end of series is not scored");
        }
    }

    let report = BacktestReport::from_ledger(
        ledger,
        log,
        rows.len(),
        rows.first().and_then(|r| r.time),
        rows.last().and_then(|r| r.time),
    );
    info!(
        trades = report.trades,
        total_return_pct = report.total_return_pct,
        win_rate_pct = report.win_rate_pct,
        data_points = report.data_points,
        "Backtest complete"
    );
    Ok(report)
}

fn close_trade(
    entry_price: f64,
    entry_time: Option<DateTime<Utc>>,
    exit: &BacktestRow,
    fee_rate: f64,
    marked_to_market: bool,
) -> Trade {
    let exit_price = exit.close.unwrap_or(entry_price);
    Trade {
        entry_price,
        entry_time,
        exit_price,
        exit_time: exit.time,
        net_return: (exit_price - entry_price) / entry_price - fee_rate,
        marked_to_market,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(closes: &[f64], signals: &[f64]) -> BacktestTable {
        let rows = closes
            .iter()
            .zip(signals)
            .enumerate()
            .map(|(index, (&close, &signal))| BacktestRow {
                index,
                time: None,
                close: Some(close),
                signal: Some(signal),
            })
            .collect();
        BacktestTable::new(rows, true, true)
    }

    #[test]
    fn single_round_trip_without_fee() {
        let t = table(&[100.0, 100.0, 105.0, 105.0, 110.0], &[0.0, 1.0, 0.0, -1.0, 0.0]);
        let report = simulate(&t, &BacktestOptions::with_fee(0.0)).unwrap();
        assert_eq!(report.trades, 1);
        assert_eq!(report.ledger[0].entry_price, 100.0);
        assert_eq!(report.ledger[0].exit_price, 105.0);
        assert_eq!(report.total_return_pct, 5.0);
        assert_eq!(report.win_rate_pct, 100.0);
        assert_eq!(
            report.log,
            vec![
                "BUY at 100.00 on 1".to_string(),
                "SELL at 105.00 on 3 (Return: 5.00%)".to_string(),
            ]
        );
    }

    #[test]
    fn fee_is_subtracted_from_each_trade() {
        let t = table(&[100.0, 110.0], &[1.0, -1.0]);
        let report = simulate(&t, &BacktestOptions::with_fee(0.01)).unwrap();
        assert!((report.ledger[0].net_return - 0.09).abs() < 1e-12);
        assert_eq!(report.total_return_pct, 9.0);
    }

    #[test]
    fn direct_flip_scores_adjacent_rows() {
        let t = table(&[100.0, 90.0], &[1.0, -1.0]);
        let report = simulate(&t, &BacktestOptions::with_fee(0.0)).unwrap();
        assert_eq!(report.trades, 1);
        assert_eq!(report.losses, 1);
        assert_eq!(report.total_return_pct, -10.0);
    }

    #[test]
    fn repeated_buys_do_not_reenter() {
        let t = table(&[100.0, 120.0, 150.0, 110.0], &[1.0, 1.0, 1.0, -1.0]);
        let report = simulate(&t, &BacktestOptions::with_fee(0.0)).unwrap();
        assert_eq!(report.trades, 1);
        assert_eq!(report.ledger[0].entry_price, 100.0);
    }

    #[test]
    fn sell_while_flat_is_inert() {
        let t = table(&[100.0, 101.0, 102.0], &[-1.0, -1.0, 0.0]);
        let report = simulate(&t, &BacktestOptions::default()).unwrap();
        assert_eq!(report.trades, 0);
        assert!(report.log.is_empty());
    }

    #[test]
    fn open_position_at_end_is_not_scored_by_default() {
        let t = table(&[100.0, 130.0], &[1.0, 1.0]);
        let report = simulate(&t, &BacktestOptions::with_fee(0.0)).unwrap();
        assert_eq!(report.trades, 0);
        assert_eq!(report.log.len(), 1);
    }

    #[test]
    fn mark_to_market_closes_open_position() {
        let t = table(&[100.0, 130.0], &[1.0, 0.0]);
        let opts = BacktestOptions {
            fee_rate: 0.0,
            mark_to_market: true,
        };
        let report = simulate(&t, &opts).unwrap();
        assert_eq!(report.trades, 1);
        assert!(report.ledger[0].marked_to_market);
        assert_eq!(report.total_return_pct, 30.0);
        assert_eq!(
            report.log.last().unwrap(),
            "CLOSE at 130.00 on 1 (mark-to-market, Return: 30.00%)"
        );
    }

    #[test]
    fn incomplete_rows_are_dropped() {
        let mut t = table(&[100.0, 0.0, 120.0], &[1.0, -1.0, -1.0]);
        let mut rows = t.rows().to_vec();
        rows[1].close = None;
        t = BacktestTable::new(rows, true, true);
        let report = simulate(&t, &BacktestOptions::with_fee(0.0)).unwrap();
        assert_eq!(report.data_points, 2);
        assert_eq!(report.ledger[0].exit_price, 120.0);
    }

    #[test]
    fn missing_columns_are_reported() {
        let t = BacktestTable::new(vec![], true, false);
        let err = simulate(&t, &BacktestOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MissingColumns(cols) if cols == vec!["signal".to_string()]));
    }

    #[test]
    fn empty_table_yields_empty_report() {
        let report = simulate(&BacktestTable::new(vec![], true, true), &BacktestOptions::default())
            .unwrap();
        assert_eq!(report.trades, 0);
        assert_eq!(report.data_points, 0);
        assert_eq!(report.start_time, None);
    }
}
