// In-memory candle history per symbol and timeframe
use super::csv_parser::{exchange_format, OhlcvCsvParser};
use super::CandleSource;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use shared::models::{Candle, TimeFrame};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub struct MarketDataStore {
    data: HashMap<String, HashMap<TimeFrame, Vec<Candle>>>,
}

impl MarketDataStore {
    pub fn new() -> Self {
        MarketDataStore { data: HashMap::new() }
    }

    /// Merges `new_candles` into the pair's history, keeping it sorted and unique by open time.
    /// On duplicate open times the candle already stored wins.
    pub fn add_candles(&mut self, symbol: &str, timeframe: TimeFrame, new_candles: Vec<Candle>) -> usize {
        let series = self
            .data
            .entry(symbol.trim().to_uppercase())
            .or_default()
            .entry(timeframe)
            .or_default();

        let before = series.len();
        series.extend(new_candles);
        series.sort_by_key(|c| c.open_time);
        series.dedup_by_key(|c| c.open_time);
        series.len() - before
    }

    /// The most recent `count` candles, oldest first.
    pub fn latest(&self, symbol: &str, timeframe: TimeFrame, count: usize) -> Option<&[Candle]> {
        self.series(symbol, timeframe)
            .map(|candles| &candles[candles.len().saturating_sub(count)..])
    }

    pub fn pairs(&self) -> Vec<(String, TimeFrame)> {
        let mut pairs: Vec<_> = self
            .data
            .iter()
            .flat_map(|(symbol, by_tf)| by_tf.keys().map(move |tf| (symbol.clone(), *tf)))
            .collect();
        pairs.sort();
        pairs
    }

    /// Loads every `SYMBOL_TIMEFRAME.csv` under `dir`. Files with other names are skipped;
    /// a malformed file fails the whole load.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some((symbol, timeframe)) = exchange_format::parse_file_name(&path) else {
                warn!(path = %path.display(), "skipping CSV without a SYMBOL_TIMEFRAME name");
                continue;
            };
            let candles = OhlcvCsvParser::load_candles_from_csv(&path)?;
            let added = self.add_candles(&symbol, timeframe, candles);
            debug!(%symbol, %timeframe, candles = added, "loaded candles");
            loaded += added;
        }
        info!(dir = %dir.display(), candles = loaded, pairs = self.pairs().len(), "market data loaded");
        Ok(loaded)
    }

    fn series(&self, symbol: &str, timeframe: TimeFrame) -> Option<&Vec<Candle>> {
        self.data
            .get(&symbol.trim().to_uppercase())
            .and_then(|by_tf| by_tf.get(&timeframe))
    }
}

impl Default for MarketDataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandleSource for RwLock<MarketDataStore> {
    async fn fetch_candles(&self, symbol: &str, timeframe: TimeFrame, min_count: usize) -> Result<Vec<Candle>> {
        let store = self.read().await;
        store
            .latest(symbol, timeframe, min_count)
            .filter(|candles| !candles.is_empty())
            .map(<[Candle]>::to_vec)
            .ok_or_else(|| EngineError::Unavailable(format!("no candles for {} {}", symbol, timeframe)))
    }
}
