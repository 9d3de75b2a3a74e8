pub mod ohlc;
pub mod report;
pub mod simulator;
pub mod table;

pub use ohlc::{read_ohlc_csv, read_ohlc_path};
pub use report::{BacktestReport, Trade};
pub use simulator::{simulate, BacktestOptions};
pub use table::{BacktestRow, BacktestTable};
