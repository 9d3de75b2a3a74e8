use backtest::{simulate, BacktestOptions, BacktestRow, BacktestTable};
use proptest::prelude::*;

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

fn signal_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![Just(-1.0), Just(0.0), Just(1.0)]
}

#[test]
fn csv_round_trip_through_simulator() {
    let csv = "\
datetime,close,signal
2024-01-01 00:00:00,100,0
2024-01-02 00:00:00,100,1
2024-01-03 00:00:00,105,0
2024-01-04 00:00:00,105,-1
2024-01-05 00:00:00,110,0
";
    let t = BacktestTable::from_csv_reader(csv.as_bytes()).unwrap();
    let report = simulate(&t, &BacktestOptions::with_fee(0.0)).unwrap();
    assert_eq!(report.trades, 1);
    assert_eq!(report.total_return_pct, 5.0);
    assert_eq!(report.win_rate_pct, 100.0);
    assert_eq!(report.data_points, 5);
    assert_eq!(report.log[0], "BUY at 100.00 on 2024-01-02 00:00:00");
    let summary = report.summary("TEST");
    assert!(summary.contains("Period: 2024-01-01 00:00:00 \u{2192} 2024-01-05 00:00:00"));
}

proptest! {
    /// Same input, same fee → identical report.
    #[test]
    fn simulation_is_deterministic(
        rows in prop::collection::vec((1.0f64..1_000.0, signal_strategy()), 0..100),
        fee in 0.0f64..0.01,
    ) {
        let (closes, signals): (Vec<f64>, Vec<f64>) = rows.into_iter().unzip();
        let t = table(&closes, &signals);
        let opts = BacktestOptions::with_fee(fee);
        prop_assert_eq!(simulate(&t, &opts).unwrap(), simulate(&t, &opts).unwrap());
    }

    /// Without a -1 there is nothing to close, so no trade is ever recorded.
    #[test]
    fn constant_signal_yields_no_trades(
        closes in prop::collection::vec(1.0f64..1_000.0, 0..100),
        level in prop_oneof![Just(0.0), Just(1.0)],
    ) {
        let signals = vec![level; closes.len()];
        let report = simulate(&table(&closes, &signals), &BacktestOptions::default()).unwrap();
        prop_assert_eq!(report.trades, 0);
        prop_assert_eq!(report.wins + report.losses, 0);
    }

    /// A higher fee strictly lowers the return of the same trade.
    #[test]
    fn higher_fee_lowers_trade_return(
        entry in 1.0f64..1_000.0,
        exit in 1.0f64..1_000.0,
        fee in 0.0f64..0.05,
        bump in 0.0001f64..0.05,
    ) {
        let t = table(&[entry, exit], &[1.0, -1.0]);
        let low = simulate(&t, &BacktestOptions::with_fee(fee)).unwrap();
        let high = simulate(&t, &BacktestOptions::with_fee(fee + bump)).unwrap();
        prop_assert!(high.ledger[0].net_return < low.ledger[0].net_return);
    }

    /// Wins and losses always partition the ledger.
    #[test]
    fn wins_and_losses_partition_trades(
        rows in prop::collection::vec((1.0f64..1_000.0, signal_strategy()), 0..100),
    ) {
        let (closes, signals): (Vec<f64>, Vec<f64>) = rows.into_iter().unzip();
        let report = simulate(&table(&closes, &signals), &BacktestOptions::default()).unwrap();
        prop_assert_eq!(report.wins + report.losses, report.trades);
        prop_assert_eq!(report.ledger.len(), report.trades);
        prop_assert!((0.0..=100.0).contains(&report.win_rate_pct));
    }
}
