// Confluence analyzer: combines the latest indicator readings into one weighted score
use crate::config::{IndicatorParams, IndicatorsConfig, RsiParams, VolumeParams};
use crate::error::Result;
use crate::indicators::{
    Crossover, EmaSnapshot, EmaStack, Macd, MacdSnapshot, ObvTrend, Rsi, StackTrend, VolumeAnalyzer, VolumeSnapshot,
};
use serde::Serialize;
use serde_json::json;
use shared::models::{Candle, ConfluenceScore, Direction, IndicatorResult};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiZone {
    Oversold,
    Overbought,
    Neutral,
}

impl RsiZone {
    pub fn of(value: f64, params: &RsiParams) -> Self {
        if value <= params.oversold {
            RsiZone::Oversold
        } else if value >= params.overbought {
            RsiZone::Overbought
        } else {
            RsiZone::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiReading {
    pub value: f64,
    pub zone: RsiZone,
}

/// Outcome of running one calculator over the candle window.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading<T> {
    Ready(T),
    Unavailable(String),
}

impl<T> Reading<T> {
    fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Reading::Ready(value),
            Err(e) => Reading::Unavailable(e.to_string()),
        }
    }

    fn ready(&self) -> Option<&T> {
        match self {
            Reading::Ready(value) => Some(value),
            Reading::Unavailable(_) => None,
        }
    }
}

/// Latest values of each enabled indicator. `None` means the indicator was not computed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndicatorReadings {
    pub price: f64,
    pub rsi: Option<Reading<f64>>,
    pub ema: Option<Reading<EmaSnapshot>>,
    pub macd: Option<Reading<MacdSnapshot>>,
    pub volume: Option<Reading<VolumeSnapshot>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfluenceAnalysis {
    pub score: ConfluenceScore,
    pub rsi: Option<RsiReading>,
    pub ema: Option<EmaSnapshot>,
    pub price: f64,
}

impl ConfluenceAnalysis {
    /// Zone of the RSI reading; neutral when RSI is disabled or unavailable.
    pub fn rsi_zone(&self) -> RsiZone {
        self.rsi.map(|r| r.zone).unwrap_or(RsiZone::Neutral)
    }
}

pub struct ConfluenceAnalyzer<'a> {
    config: &'a IndicatorsConfig,
}

impl<'a> ConfluenceAnalyzer<'a> {
    pub fn new(config: &'a IndicatorsConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, candles: &[Candle]) -> ConfluenceAnalysis {
        self.score(&self.read(candles))
    }

    /// Runs every enabled calculator. Failures are kept as unavailable readings.
    pub fn read(&self, candles: &[Candle]) -> IndicatorReadings {
        let mut readings = IndicatorReadings {
            price: candles.last().map(|c| c.close).unwrap_or_default(),
            ..IndicatorReadings::default()
        };

        for params in self.config.enabled() {
            match params {
                IndicatorParams::Rsi(p) if readings.rsi.is_none() => {
                    readings.rsi = Some(Reading::from_result(Rsi::new(p.period).latest(candles)));
                }
                IndicatorParams::Ema(p) if readings.ema.is_none() => {
                    let stack = EmaStack::new(p.fast, p.medium, p.slow);
                    readings.ema = Some(Reading::from_result(stack.snapshot(candles)));
                }
                IndicatorParams::Macd(p) if readings.macd.is_none() => {
                    let macd = Macd::new(p.fast, p.slow, p.signal);
                    readings.macd = Some(Reading::from_result(macd.snapshot(candles)));
                }
                IndicatorParams::Volume(p) if readings.volume.is_none() => {
                    let analyzer = VolumeAnalyzer::new(p.sma_period, p.threshold_multiplier, p.obv_lookback);
                    readings.volume = Some(Reading::from_result(analyzer.snapshot(candles)));
                }
                _ => {}
            }
        }
        readings
    }

    pub fn score(&self, readings: &IndicatorReadings) -> ConfluenceAnalysis {
        let rsi = self.config.rsi().and_then(|params| {
            let value = *readings.rsi.as_ref()?.ready()?;
            Some(RsiReading {
                value,
                zone: RsiZone::of(value, params),
            })
        });
        let ema = readings.ema.as_ref().and_then(Reading::ready).cloned();

        let direction = match rsi.map(|r| r.zone) {
            Some(RsiZone::Oversold) => Direction::Bullish,
            Some(RsiZone::Overbought) => Direction::Bearish,
            _ => match ema.as_ref().map(|s| s.trend) {
                Some(StackTrend::Bearish) => Direction::Bearish,
                _ => Direction::Bullish,
            },
        };

        let mut breakdown = Vec::new();
        for params in self.config.enabled() {
            let name = params.name();
            let result = match params {
                IndicatorParams::Rsi(p) => match &readings.rsi {
                    Some(Reading::Ready(value)) => score_rsi(*value, p),
                    other => not_scored(name, other),
                },
                IndicatorParams::Ema(_) => match &readings.ema {
                    Some(Reading::Ready(snapshot)) => score_ema(snapshot, direction),
                    other => not_scored(name, other),
                },
                IndicatorParams::Macd(_) => match &readings.macd {
                    Some(Reading::Ready(snapshot)) => score_macd(snapshot, direction),
                    other => not_scored(name, other),
                },
                IndicatorParams::Volume(p) => match &readings.volume {
                    Some(Reading::Ready(snapshot)) => score_volume(snapshot, p, direction),
                    other => not_scored(name, other),
                },
            };
            debug!(indicator = name, score = result.score, max = result.max_score, reason = %result.reason);
            breakdown.push(result);
        }

        ConfluenceAnalysis {
            score: ConfluenceScore::from_breakdown(direction, breakdown),
            rsi,
            ema,
            price: readings.price,
        }
    }
}

fn not_scored<T>(name: &str, reading: &Option<Reading<T>>) -> IndicatorResult {
    match reading {
        Some(Reading::Unavailable(reason)) => IndicatorResult::unavailable(name, reason.clone()),
        _ => IndicatorResult::unavailable(name, format!("{} was not computed", name)),
    }
}

fn result(name: &str, score: u32, max_score: u32, raw_values: BTreeMap<String, serde_json::Value>, reason: String) -> IndicatorResult {
    IndicatorResult {
        name: name.to_string(),
        score,
        max_score,
        raw_values,
        is_contributing: score > 0,
        reason,
    }
}

fn score_rsi(value: f64, params: &RsiParams) -> IndicatorResult {
    let zone = RsiZone::of(value, params);
    let (score, reason) = match zone {
        RsiZone::Oversold => (2, format!("RSI {:.2} oversold (<= {})", value, params.oversold)),
        RsiZone::Overbought => (2, format!("RSI {:.2} overbought (>= {})", value, params.overbought)),
        RsiZone::Neutral => (0, format!("RSI {:.2} in neutral zone", value)),
    };
    let raw = BTreeMap::from([
        ("value".to_string(), json!(value)),
        ("oversold".to_string(), json!(params.oversold)),
        ("overbought".to_string(), json!(params.overbought)),
        ("zone".to_string(), json!(zone)),
    ]);
    result("RSI", score, 2, raw, reason)
}

fn score_ema(snapshot: &EmaSnapshot, direction: Direction) -> IndicatorResult {
    let (aligned, favorable_side) = match direction {
        Direction::Bullish => (snapshot.trend == StackTrend::Bullish, snapshot.price_above_slow()),
        Direction::Bearish => (snapshot.trend == StackTrend::Bearish, snapshot.price_below_slow()),
    };
    let score = (if aligned { 2 } else { 0 }) + u32::from(favorable_side);

    let mut reasons = Vec::new();
    reasons.push(if aligned {
        format!("EMA stack {:?} aligned", snapshot.trend)
    } else {
        format!("EMA stack {:?} not aligned", snapshot.trend)
    });
    reasons.push(if favorable_side {
        "price on favorable side of slow EMA".to_string()
    } else {
        "price on wrong side of slow EMA".to_string()
    });

    let raw = BTreeMap::from([
        ("fast".to_string(), json!(snapshot.fast)),
        ("medium".to_string(), json!(snapshot.medium)),
        ("slow".to_string(), json!(snapshot.slow)),
        ("price".to_string(), json!(snapshot.price)),
        ("trend".to_string(), json!(snapshot.trend)),
    ]);
    result("EMA", score, 3, raw, reasons.join(", "))
}

fn score_macd(snapshot: &MacdSnapshot, direction: Direction) -> IndicatorResult {
    let wanted = match direction {
        Direction::Bullish => Crossover::Bullish,
        Direction::Bearish => Crossover::Bearish,
    };
    let favorable = snapshot.crossover == Some(wanted);
    let reason = match snapshot.crossover {
        Some(cross) if favorable => format!("{:?} crossover on latest candle", cross),
        Some(cross) => format!("{:?} crossover against direction", cross),
        None => "no crossover on latest candle".to_string(),
    };

    let raw = BTreeMap::from([
        ("macd_line".to_string(), json!(snapshot.macd_line)),
        ("signal_line".to_string(), json!(snapshot.signal_line)),
        ("histogram".to_string(), json!(snapshot.histogram)),
        ("crossover".to_string(), json!(snapshot.crossover)),
    ]);
    result("MACD", u32::from(favorable), 1, raw, reason)
}

fn score_volume(snapshot: &VolumeSnapshot, params: &VolumeParams, direction: Direction) -> IndicatorResult {
    let obv_agrees = matches!(
        (direction, snapshot.obv_trend),
        (Direction::Bullish, ObvTrend::Up) | (Direction::Bearish, ObvTrend::Down)
    );
    let score = u32::from(snapshot.is_high_volume) + u32::from(obv_agrees);
    let reason = format!(
        "volume ratio {:.2} {} {:.2}, OBV {:?}",
        snapshot.volume_ratio,
        if snapshot.is_high_volume { ">=" } else { "<" },
        params.threshold_multiplier,
        snapshot.obv_trend
    );

    let raw = BTreeMap::from([
        ("volume".to_string(), json!(snapshot.volume)),
        ("volume_sma".to_string(), json!(snapshot.volume_sma)),
        ("volume_ratio".to_string(), json!(snapshot.volume_ratio)),
        ("threshold".to_string(), json!(params.threshold_multiplier)),
        ("obv".to_string(), json!(snapshot.obv)),
        ("obv_trend".to_string(), json!(snapshot.obv_trend)),
        ("vwap".to_string(), json!(snapshot.vwap)),
        ("price_vs_vwap".to_string(), json!(snapshot.price_vs_vwap)),
    ]);
    result("Volume", score, 2, raw, reason)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::IndicatorSpec;
    use crate::indicators::test_support::candles_from_closes;
    use crate::indicators::VwapPosition;

    /// Readings for an oversold market with every other indicator agreeing except high volume.
    pub(crate) fn bullish_readings(rsi: f64) -> IndicatorReadings {
        IndicatorReadings {
            price: 105.0,
            rsi: Some(Reading::Ready(rsi)),
            ema: Some(Reading::Ready(EmaSnapshot::new(103.0, 101.0, 100.0, 105.0))),
            macd: Some(Reading::Ready(MacdSnapshot {
                macd_line: 0.4,
                signal_line: 0.1,
                histogram: 0.3,
                crossover: Some(Crossover::Bullish),
            })),
            volume: Some(Reading::Ready(VolumeSnapshot {
                volume: 85.0,
                volume_sma: 100.0,
                volume_ratio: 0.85,
                is_high_volume: false,
                obv: 1200.0,
                obv_trend: ObvTrend::Up,
                vwap: 102.0,
                price_vs_vwap: VwapPosition::Above,
            })),
        }
    }

    #[test]
    fn oversold_scenario_scores_seven_of_eight() {
        let config = IndicatorsConfig::default();
        let analysis = ConfluenceAnalyzer::new(&config).score(&bullish_readings(18.4));

        assert_eq!(analysis.score.direction, Direction::Bullish);
        assert_eq!(analysis.score.total_score, 7);
        assert_eq!(analysis.score.max_possible_score, 8);
        assert!((analysis.score.score_percentage - 87.5).abs() < 1e-9);
        assert_eq!(analysis.rsi_zone(), RsiZone::Oversold);

        let scores: Vec<(&str, u32)> = analysis.score.breakdown.iter().map(|r| (r.name.as_str(), r.score)).collect();
        assert_eq!(scores, vec![("RSI", 2), ("EMA", 3), ("MACD", 1), ("Volume", 1)]);
        let volume = analysis.score.indicator("Volume").unwrap();
        assert_eq!(volume.raw_values["volume_ratio"], json!(0.85));
        assert!(volume.is_contributing);
    }

    #[test]
    fn neutral_rsi_scores_zero_for_rsi() {
        let config = IndicatorsConfig::default();
        let analysis = ConfluenceAnalyzer::new(&config).score(&bullish_readings(45.0));

        let rsi = analysis.score.indicator("RSI").unwrap();
        assert_eq!(rsi.score, 0);
        assert!(!rsi.is_contributing);
        assert_eq!(analysis.rsi_zone(), RsiZone::Neutral);
        // Direction falls back to the EMA stack, so the rest still scores
        assert_eq!(analysis.score.direction, Direction::Bullish);
        assert_eq!(analysis.score.total_score, 5);
    }

    #[test]
    fn overbought_scores_against_a_bullish_stack() {
        let config = IndicatorsConfig::default();
        let analysis = ConfluenceAnalyzer::new(&config).score(&bullish_readings(85.0));

        assert_eq!(analysis.score.direction, Direction::Bearish);
        assert_eq!(analysis.score.indicator("RSI").unwrap().score, 2);
        assert_eq!(analysis.score.indicator("EMA").unwrap().score, 0);
        assert_eq!(analysis.score.indicator("MACD").unwrap().score, 0);
        assert_eq!(analysis.score.indicator("Volume").unwrap().score, 0);
        assert_eq!(analysis.score.total_score, 2);
    }

    #[test]
    fn short_series_degrades_every_indicator_to_zero() {
        let config = IndicatorsConfig::default();
        let candles = candles_from_closes(&[100.0, 99.0, 98.0, 97.0, 96.0]);
        let analysis = ConfluenceAnalyzer::new(&config).analyze(&candles);

        assert_eq!(analysis.score.breakdown.len(), 4);
        for result in &analysis.score.breakdown {
            assert_eq!((result.score, result.max_score), (0, 0));
            assert!(!result.is_contributing);
            assert!(result.reason.contains("Insufficient data"), "{}", result.reason);
        }
        assert_eq!(analysis.score.total_score, 0);
        assert_eq!(analysis.score.max_possible_score, 0);
        assert_eq!(analysis.score.score_percentage, 0.0);
        assert!(analysis.rsi.is_none());
    }

    #[test]
    fn partial_history_scores_only_ready_indicators() {
        let config = IndicatorsConfig::default();
        let closes: Vec<f64> = (0..25).map(|i| 100.0 - i as f64).collect();
        let analysis = ConfluenceAnalyzer::new(&config).analyze(&candles_from_closes(&closes));

        // RSI(15) and Volume(20) have enough candles, EMA(50) and MACD(35) do not
        assert_eq!(analysis.score.max_possible_score, 4);
        assert_eq!(analysis.score.indicator("EMA").unwrap().max_score, 0);
        assert_eq!(analysis.score.indicator("MACD").unwrap().max_score, 0);
        assert_eq!(analysis.rsi.unwrap().value, 0.0);
        assert_eq!(analysis.rsi_zone(), RsiZone::Oversold);

        let sum: u32 = analysis.score.breakdown.iter().map(|r| r.score).sum();
        assert_eq!(analysis.score.total_score, sum);
        assert!(analysis.score.total_score <= analysis.score.max_possible_score);
    }

    #[test]
    fn disabled_indicators_leave_the_breakdown() {
        let mut config = IndicatorsConfig::default();
        config.indicators[2].enabled = false; // MACD
        config.indicators[3] = IndicatorSpec::disabled(IndicatorParams::Volume(VolumeParams::default()));

        let analysis = ConfluenceAnalyzer::new(&config).score(&bullish_readings(18.4));
        assert_eq!(analysis.score.max_possible_score, 5);
        assert_eq!(analysis.score.total_score, 5);
        assert!(analysis.score.indicator("MACD").is_none());
        assert!(analysis.score.indicator("Volume").is_none());
    }

    #[test]
    fn missing_reading_is_not_contributing() {
        let config = IndicatorsConfig::default();
        let readings = IndicatorReadings {
            macd: None,
            ..bullish_readings(18.4)
        };
        let analysis = ConfluenceAnalyzer::new(&config).score(&readings);
        let macd = analysis.score.indicator("MACD").unwrap();
        assert_eq!((macd.score, macd.max_score), (0, 0));
        assert_eq!(analysis.score.total_score, 6);
    }
}
