// Engine settings, loaded from a JSON file or defaulted
use super::{FilterConfig, IndicatorsConfig};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::Level;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub log_level: String,
    /// Candles requested per pair; raised to the indicators' lookback when smaller.
    pub candle_history: usize,
    pub max_concurrent_pairs: usize,
    /// Indicators used for system-wide detection.
    pub indicators: IndicatorsConfig,
    /// Filter used for the global scope when no user supplies one.
    pub filter: FilterConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            log_level: "info".to_string(),
            candle_history: 200,
            max_concurrent_pairs: 8,
            indicators: IndicatorsConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl EngineSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let settings: EngineSettings = serde_json::from_str(&contents)?;
        settings.indicators.validate()?;
        Ok(settings)
    }

    /// Tracing level for `log_level`, `INFO` when unrecognised.
    pub fn tracing_level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }

    pub fn candles_needed(&self) -> usize {
        self.candle_history.max(self.indicators.lookback())
    }
}
