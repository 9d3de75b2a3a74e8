use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

use common::{Error, Result, SignalSeries};

/// Candidate names of the time column, in lookup order.
const TIME_COLUMNS: [&str; 3] = ["datetime", "date", "timestamp"];

/// One simulator input row. Any cell may be missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestRow {
    /// Position in the source table, used as the label when there is no time column.
    pub index: usize,
    pub time: Option<DateTime<Utc>>,
    pub close: Option<f64>,
    pub signal: Option<f64>,
}

impl BacktestRow {
    /// Label used in trade logs: the formatted time, or the row index.
    pub fn label(&self) -> String {
        match self.time {
            Some(t) => t.format(common::TIME_FORMAT).to_string(),
            None => self.index.to_string(),
        }
    }

    /// Both `close` and `signal` are present and not NaN.
    pub fn is_complete(&self) -> bool {
        matches!((self.close, self.signal), (Some(c), Some(s)) if !c.is_nan() && !s.is_nan())
    }
}

/// Loosely-typed backtest input: a signal-annotated price table whose
/// `close` or `signal` columns may be absent altogether.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BacktestTable {
    rows: Vec<BacktestRow>,
    has_close: bool,
    has_signal: bool,
}

impl BacktestTable {
    pub fn new(rows: Vec<BacktestRow>, has_close: bool, has_signal: bool) -> Self {
        Self {
            rows,
            has_close,
            has_signal,
        }
    }

    pub fn rows(&self) -> &[BacktestRow] {
        &self.rows
    }

    /// Names of required columns the table lacks.
    pub fn missing_columns(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if !self.has_close {
            missing.push("close".to_string());
        }
        if !self.has_signal {
            missing.push("signal".to_string());
        }
        missing
    }

    /// Read a CSV table with a header row.
    ///
    /// Column names are matched case-insensitively. Blank, `NaN` and `null`
    /// cells are treated as missing values.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let (mut reader, columns) = open_csv(reader)?;
        let close_col = columns.position("close");
        let signal_col = columns.position("signal");
        let time_col = columns.time();

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|e| Error::Csv(e.to_string()))?;

            let time = cell(&record, time_col).map(parse_time).transpose()?;
            let close = cell(&record, close_col)
                .map(|v| parse_number(index, "close", v))
                .transpose()?;
            let signal = cell(&record, signal_col)
                .map(|v| parse_number(index, "signal", v))
                .transpose()?;

            rows.push(BacktestRow {
                index,
                time,
                close,
                signal,
            });
        }

        Ok(Self::new(rows, close_col.is_some(), signal_col.is_some()))
    }

    pub fn from_csv_path(path: &str) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }
}

impl From<&SignalSeries> for BacktestTable {
    fn from(series: &SignalSeries) -> Self {
        let rows = series
            .rows()
            .iter()
            .enumerate()
            .map(|(index, row)| BacktestRow {
                index,
                time: Some(row.candle.timestamp),
                close: Some(row.candle.close),
                signal: Some(f64::from(row.signal.value())),
            })
            .collect();
        Self::new(rows, true, true)
    }
}

/// Lowercased header row of a CSV table.
pub(crate) struct Columns(Vec<String>);

impl Columns {
    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|h| h == name)
    }

    /// Index of the first time column present, in `TIME_COLUMNS` order.
    pub(crate) fn time(&self) -> Option<usize> {
        TIME_COLUMNS.iter().find_map(|&name| self.position(name))
    }
}

/// Open a CSV source with trimmed cells and read its header row.
pub(crate) fn open_csv<R: Read>(reader: R) -> Result<(csv::Reader<R>, Columns)> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|e| Error::Csv(e.to_string()))?
        .iter()
        .map(str::to_lowercase)
        .collect();
    Ok((reader, Columns(headers)))
}

/// Cell `col` of `record`, `None` when the column is absent or the cell blank.
pub(crate) fn cell(record: &csv::StringRecord, col: Option<usize>) -> Option<&str> {
    col.and_then(|c| record.get(c)).filter(|v| !is_blank(v))
}

fn is_blank(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("nan") || value.eq_ignore_ascii_case("null")
}

pub(crate) fn parse_number(index: usize, column: &str, raw: &str) -> Result<f64> {
    raw.parse()
        .map_err(|_| Error::Csv(format!("row {index}: invalid {column} value '{raw}'")))
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD` and unix seconds.
pub(crate) fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&t));
    }
    if let Some(t) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&t));
    }
    if let Some(t) = raw
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    {
        return Ok(t);
    }
    Err(Error::Csv(format!("unrecognised time value '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_columns_case_insensitively() {
        let csv = "Date,Close,Signal\n2024-01-02,100.5,1\n2024-01-03,101,-1\n";
        let table = BacktestTable::from_csv_reader(csv.as_bytes()).unwrap();
        assert!(table.missing_columns().is_empty());
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.rows()[0].close, Some(100.5));
        assert_eq!(table.rows()[1].signal, Some(-1.0));
        assert_eq!(table.rows()[0].label(), "2024-01-02 00:00:00");
    }

    #[test]
    fn blank_and_nan_cells_are_missing() {
        let csv = "close,signal\n,1\nNaN,0\n5,\n";
        let table = BacktestTable::from_csv_reader(csv.as_bytes()).unwrap();
        assert!(table.rows().iter().all(|r| !r.is_complete()));
        assert_eq!(table.rows()[2].close, Some(5.0));
    }

    #[test]
    fn reports_absent_columns() {
        let table = BacktestTable::from_csv_reader("date,close\n2024-01-01,1\n".as_bytes()).unwrap();
        assert_eq!(table.missing_columns(), vec!["signal".to_string()]);
    }

    #[test]
    fn rows_without_time_are_labelled_by_index() {
        let table = BacktestTable::from_csv_reader("close,signal\n1,0\n2,1\n".as_bytes()).unwrap();
        assert_eq!(table.rows()[1].time, None);
        assert_eq!(table.rows()[1].label(), "1");
    }

    #[test]
    fn datetime_column_wins_over_date() {
        let csv = "date,datetime,close,signal\n2024-01-01,2024-01-01 09:30:00,1,0\n";
        let table = BacktestTable::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.rows()[0].label(), "2024-01-01 09:30:00");
    }

    #[test]
    fn garbage_number_is_csv_error() {
        let err = BacktestTable::from_csv_reader("close,signal\nabc,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Csv(msg) if msg.contains("abc")));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let csv = " Timestamp , CLOSE,Date\n0, nan ,x\n";
        let (mut reader, columns) = open_csv(csv.as_bytes()).unwrap();
        assert_eq!(columns.position("close"), Some(1));
        assert_eq!(columns.position("signal"), None);
        assert_eq!(columns.time(), Some(2));

        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(cell(&record, Some(0)), Some("0"));
        assert_eq!(cell(&record, columns.position("close")), None);
        assert_eq!(cell(&record, None), None);
    }

    #[test]
    fn accepts_unix_and_rfc3339_times() {
        assert_eq!(parse_time("0").unwrap().timestamp(), 0);
        let t = parse_time("2024-05-01T12:00:00+02:00").unwrap();
        assert_eq!(t.format("%H").to_string(), "10");
    }
}
