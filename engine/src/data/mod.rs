// Candle data: CSV import and the in-memory store the engine reads from
pub mod csv_parser;
pub mod market_data;

use crate::error::Result;
use async_trait::async_trait;
use shared::models::{Candle, TimeFrame};

pub use csv_parser::OhlcvCsvParser;
pub use market_data::MarketDataStore;

/// Where the engine gets candles from. Implementations return candles in strictly
/// increasing `open_time`, at most `min_count` of the most recent ones when more exist.
/// `RateLimited` and `Unavailable` skip the pair for one cycle.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch_candles(&self, symbol: &str, timeframe: TimeFrame, min_count: usize) -> Result<Vec<Candle>>;
}
