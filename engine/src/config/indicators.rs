// Indicator configuration: which indicators take part in the confluence score and with which parameters
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use shared::models::TimeFrame;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiParams {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        RsiParams {
            period: 14,
            oversold: 20.0,
            overbought: 80.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaParams {
    pub fast: usize,
    pub medium: usize,
    pub slow: usize,
}

impl Default for EmaParams {
    fn default() -> Self {
        EmaParams {
            fast: 9,
            medium: 21,
            slow: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        MacdParams {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeParams {
    pub sma_period: usize,
    pub threshold_multiplier: f64,
    pub obv_lookback: usize,
}

impl Default for VolumeParams {
    fn default() -> Self {
        VolumeParams {
            sma_period: 20,
            threshold_multiplier: 1.2,
            obv_lookback: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum IndicatorParams {
    #[serde(rename = "RSI")]
    Rsi(RsiParams),
    #[serde(rename = "EMA")]
    Ema(EmaParams),
    #[serde(rename = "MACD")]
    Macd(MacdParams),
    #[serde(rename = "Volume")]
    Volume(VolumeParams),
}

impl IndicatorParams {
    /// Name used in the confluence breakdown.
    pub fn name(&self) -> &'static str {
        match self {
            IndicatorParams::Rsi(_) => "RSI",
            IndicatorParams::Ema(_) => "EMA",
            IndicatorParams::Macd(_) => "MACD",
            IndicatorParams::Volume(_) => "Volume",
        }
    }

    /// Points this indicator can contribute when enabled.
    pub fn max_score(&self) -> u32 {
        match self {
            IndicatorParams::Rsi(_) => 2,
            IndicatorParams::Ema(_) => 3,
            IndicatorParams::Macd(_) => 1,
            IndicatorParams::Volume(_) => 2,
        }
    }

    /// Candles required before the indicator can be scored.
    pub fn lookback(&self) -> usize {
        match self {
            IndicatorParams::Rsi(p) => p.period + 1,
            IndicatorParams::Ema(p) => p.fast.max(p.medium).max(p.slow),
            IndicatorParams::Macd(p) => p.fast.max(p.slow) + p.signal,
            IndicatorParams::Volume(p) => p.sma_period.max(p.obv_lookback + 1),
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub params: IndicatorParams,
}

impl IndicatorSpec {
    pub fn enabled(params: IndicatorParams) -> Self {
        Self { enabled: true, params }
    }

    pub fn disabled(params: IndicatorParams) -> Self {
        Self { enabled: false, params }
    }
}

/// Minimum confluence score per timeframe for a directional signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfluenceThresholds {
    pub default_min_score: u32,
    pub timeframes: BTreeMap<TimeFrame, u32>,
}

impl Default for ConfluenceThresholds {
    fn default() -> Self {
        let timeframes = BTreeMap::from([
            (TimeFrame::Minute15, 4),
            (TimeFrame::Hour1, 4),
            (TimeFrame::Hour4, 5),
            (TimeFrame::Day1, 5),
        ]);
        ConfluenceThresholds {
            default_min_score: 4,
            timeframes,
        }
    }
}

impl ConfluenceThresholds {
    pub fn min_score(&self, timeframe: TimeFrame) -> u32 {
        self.timeframes.get(&timeframe).copied().unwrap_or(self.default_min_score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorsConfig {
    pub indicators: Vec<IndicatorSpec>,
    pub min_score: ConfluenceThresholds,
}

impl Default for IndicatorsConfig {
    fn default() -> Self {
        IndicatorsConfig {
            indicators: vec![
                IndicatorSpec::enabled(IndicatorParams::Rsi(RsiParams::default())),
                IndicatorSpec::enabled(IndicatorParams::Ema(EmaParams::default())),
                IndicatorSpec::enabled(IndicatorParams::Macd(MacdParams::default())),
                IndicatorSpec::enabled(IndicatorParams::Volume(VolumeParams::default())),
            ],
            min_score: ConfluenceThresholds::default(),
        }
    }
}

impl IndicatorsConfig {
    pub fn enabled(&self) -> impl Iterator<Item = &IndicatorParams> {
        self.indicators.iter().filter(|spec| spec.enabled).map(|spec| &spec.params)
    }

    /// Parameters of the first enabled RSI entry.
    pub fn rsi(&self) -> Option<&RsiParams> {
        self.enabled().find_map(|params| match params {
            IndicatorParams::Rsi(p) => Some(p),
            _ => None,
        })
    }

    /// Candles needed so every enabled indicator can be scored.
    pub fn lookback(&self) -> usize {
        self.enabled().map(IndicatorParams::lookback).max().unwrap_or(0)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for params in self.enabled() {
            if !seen.insert(params.name()) {
                return Err(EngineError::InvalidConfiguration(format!(
                    "{} is enabled more than once",
                    params.name()
                )));
            }
            match params {
                IndicatorParams::Rsi(p) => {
                    if p.period == 0 {
                        return Err(EngineError::InvalidConfiguration("RSI period must be greater than 0".into()));
                    }
                    if p.oversold >= p.overbought {
                        return Err(EngineError::InvalidConfiguration(format!(
                            "RSI oversold level {} must be below overbought level {}",
                            p.oversold, p.overbought
                        )));
                    }
                }
                IndicatorParams::Ema(p) => {
                    if p.fast == 0 || p.medium == 0 || p.slow == 0 {
                        return Err(EngineError::InvalidConfiguration("EMA periods must be greater than 0".into()));
                    }
                }
                IndicatorParams::Macd(p) => {
                    if p.fast == 0 || p.slow == 0 || p.signal == 0 || p.fast >= p.slow {
                        return Err(EngineError::InvalidConfiguration(format!(
                            "MACD periods {}/{}/{} are invalid",
                            p.fast, p.slow, p.signal
                        )));
                    }
                }
                IndicatorParams::Volume(p) => {
                    if p.sma_period == 0 || p.obv_lookback == 0 || p.threshold_multiplier <= 0.0 {
                        return Err(EngineError::InvalidConfiguration("Volume parameters must be positive".into()));
                    }
                }
            }
        }
        if self.min_score.default_min_score == 0 || self.min_score.timeframes.values().any(|&v| v == 0) {
            return Err(EngineError::InvalidConfiguration("min_score thresholds must be greater than 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_possible_score(config: &IndicatorsConfig) -> u32 {
        config.enabled().map(IndicatorParams::max_score).sum()
    }

    #[test]
    fn default_config_scores_out_of_eight() {
        let config = IndicatorsConfig::default();
        assert_eq!(max_possible_score(&config), 8);
        assert_eq!(config.lookback(), 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn min_score_defaults_per_timeframe() {
        let thresholds = ConfluenceThresholds::default();
        assert_eq!(thresholds.min_score(TimeFrame::Minute15), 4);
        assert_eq!(thresholds.min_score(TimeFrame::Hour1), 4);
        assert_eq!(thresholds.min_score(TimeFrame::Hour4), 5);
        assert_eq!(thresholds.min_score(TimeFrame::Day1), 5);
        assert_eq!(thresholds.min_score(TimeFrame::Minute5), 4);
    }

    #[test]
    fn parses_tagged_indicator_list() {
        let json = r#"{
            "indicators": [
                {"kind": "RSI", "period": 7, "oversold": 25, "overbought": 75},
                {"kind": "EMA", "enabled": false},
                {"kind": "MACD"},
                {"kind": "Volume", "threshold_multiplier": 1.5}
            ],
            "min_score": {"timeframes": {"4h": 6}}
        }"#;
        let config: IndicatorsConfig = serde_json::from_str(json).unwrap();

        let rsi = config.rsi().unwrap();
        assert_eq!(rsi.period, 7);
        assert_eq!(rsi.oversold, 25.0);
        assert!(!config.enabled().any(|p| matches!(p, IndicatorParams::Ema(_))));
        assert_eq!(max_possible_score(&config), 5);
        assert_eq!(config.lookback(), 35);
        assert_eq!(config.min_score.min_score(TimeFrame::Hour4), 6);
        assert_eq!(config.min_score.min_score(TimeFrame::Minute15), 4);

        match &config.indicators[3].params {
            IndicatorParams::Volume(p) => {
                assert_eq!(p.threshold_multiplier, 1.5);
                assert_eq!(p.sma_period, 20);
            }
            other => panic!("unexpected params {:?}", other),
        }
    }

    #[test]
    fn rejects_inverted_rsi_levels() {
        let mut config = IndicatorsConfig::default();
        config.indicators[0] = IndicatorSpec::enabled(IndicatorParams::Rsi(RsiParams {
            period: 14,
            oversold: 80.0,
            overbought: 20.0,
        }));
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfiguration(_))));
    }

    #[test]
    fn rejects_duplicate_enabled_kind() {
        let mut config = IndicatorsConfig::default();
        config.indicators.push(IndicatorSpec::enabled(IndicatorParams::Macd(MacdParams::default())));
        match config.validate() {
            Err(EngineError::InvalidConfiguration(msg)) => assert!(msg.contains("MACD"), "{}", msg),
            other => panic!("expected invalid configuration, got {:?}", other),
        }

        // A disabled second entry is never scored
        config.indicators.pop();
        config.indicators.push(IndicatorSpec::disabled(IndicatorParams::Macd(MacdParams::default())));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn all_disabled_has_no_possible_score() {
        let mut config = IndicatorsConfig::default();
        for spec in &mut config.indicators {
            spec.enabled = false;
        }
        assert_eq!(max_possible_score(&config), 0);
        assert_eq!(config.lookback(), 0);
    }
}
