use std::io::Read;

use tracing::debug;

use common::{Candle, Error, OhlcSeries, Result};

use crate::table::{cell, open_csv, parse_number, parse_time};

/// Read an OHLC history from CSV.
///
/// A time column (`datetime`, `date` or `timestamp`) and `close` are
/// required; `open`, `high` and `low` fall back to `close`, `adjusted_close`
/// and `volume` are optional. Rows without a time or close are dropped. The
/// remaining rows must already be in ascending time order.
pub fn read_ohlc_csv<R: Read>(reader: R) -> Result<OhlcSeries> {
    let (mut reader, columns) = open_csv(reader)?;
    let column = |name: &str| columns.position(name);

    let time_col = columns.time();
    let close_col = column("close");
    let missing: Vec<String> = [
        ("time", time_col.is_none()),
        ("close", close_col.is_none()),
    ]
    .iter()
    .filter(|(_, absent)| *absent)
    .map(|(name, _)| name.to_string())
    .collect();
    if !missing.is_empty() {
        return Err(Error::MissingColumns(missing));
    }
    let (open_col, high_col, low_col) = (column("open"), column("high"), column("low"));
    let (adj_col, volume_col) = (column("adjusted_close"), column("volume"));

    let mut candles = Vec::new();
    let mut dropped = 0usize;
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| Error::Csv(e.to_string()))?;
        let number = |col: Option<usize>, name: &str| -> Result<Option<f64>> {
            cell(&record, col)
                .map(|v| parse_number(index, name, v))
                .transpose()
        };

        let time = cell(&record, time_col).map(parse_time).transpose()?;
        let (Some(timestamp), Some(close)) = (time, number(close_col, "close")?) else {
            dropped += 1;
            continue;
        };

        candles.push(Candle {
            timestamp,
            open: number(open_col, "open")?.unwrap_or(close),
            high: number(high_col, "high")?.unwrap_or(close),
            low: number(low_col, "low")?.unwrap_or(close),
            close,
            adjusted_close: number(adj_col, "adjusted_close")?,
            volume: number(volume_col, "volume")?,
        });
    }

    debug!(rows = candles.len(), dropped, "Loaded OHLC CSV");
    OhlcSeries::new(candles)
}

pub fn read_ohlc_path(path: &str) -> Result<OhlcSeries> {
    let file = std::fs::File::open(path)?;
    read_ohlc_csv(file)
}
