// Technical indicators module
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod volume;

pub use ema::{ema_series, Ema, EmaSnapshot, EmaStack, StackTrend};
pub use macd::{crossover, Crossover, Macd, MacdSnapshot};
pub use rsi::Rsi;
pub use sma::Sma;
pub use volume::{ObvTrend, VolumeAnalyzer, VolumeSnapshot, VwapPosition};

use shared::models::Candle;

/// Candle field a series indicator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    Close,
    Volume,
}

impl PriceSource {
    pub fn value(&self, candle: &Candle) -> f64 {
        match self {
            PriceSource::Close => candle.close,
            PriceSource::Volume => candle.volume,
        }
    }
}

// Common trait for all series indicators
pub trait IndicatorCalculator: Send + Sync {
    fn name(&self) -> &str;
    /// Minimum number of candles before the first value is produced.
    fn lookback(&self) -> usize;
    fn calculate(&self, data: &[Candle]) -> Vec<Option<f64>>; // aligned with `data`, None until enough history
}

/// Last defined value of a calculated series.
pub fn latest_value(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}
