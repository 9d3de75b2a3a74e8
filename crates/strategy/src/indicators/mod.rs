// Technical indicators over close-price series, oldest first.
// Every function returns one value per input row.

pub mod bollinger;
pub mod macd;
pub mod moving_average;
pub mod rsi;

pub use bollinger::{Band, BollingerBands};
pub use macd::{MacdIndicator, MacdPoint};
pub use moving_average::{ema, ema_expanding, sma};
pub use rsi::RsiIndicator;
