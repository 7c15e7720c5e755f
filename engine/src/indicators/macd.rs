// Moving Average Convergence Divergence (MACD) indicator implementation
use super::ema::ema_series;
use crate::error::{EngineError, Result};
use serde::Serialize;
use shared::models::Candle;

/// Direction of a line crossing another between two consecutive candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Crossover {
    Bullish,
    Bearish,
}

/// Determine if `line` crossed `reference` between the previous and current values.
pub fn crossover(prev_line: f64, prev_reference: f64, line: f64, reference: f64) -> Option<Crossover> {
    if prev_line <= prev_reference && line > reference {
        Some(Crossover::Bullish)
    } else if prev_line >= prev_reference && line < reference {
        Some(Crossover::Bearish)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSnapshot {
    pub macd_line: f64,
    pub signal_line: f64,
    pub histogram: f64,
    /// Crossover between the previous and the latest candle, if any.
    pub crossover: Option<Crossover>,
}

/// Aligned MACD, signal and histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self { fast, slow, signal }
    }

    pub fn name(&self) -> String {
        format!("MACD({},{},{})", self.fast, self.slow, self.signal)
    }

    /// Candles needed for two consecutive signal-line values.
    pub fn lookback(&self) -> usize {
        self.fast.max(self.slow) + self.signal
    }

    pub fn series(&self, data: &[Candle]) -> MacdSeries {
        let closes: Vec<f64> = data.iter().map(|c| c.close).collect();
        let fast = ema_series(&closes, self.fast);
        let slow = ema_series(&closes, self.slow);

        let macd: Vec<Option<f64>> = fast
            .iter()
            .zip(slow.iter())
            .map(|(f, s)| match (f, s) {
                (Some(f), Some(s)) => Some(f - s),
                _ => None,
            })
            .collect();

        // Signal line is an EMA over the defined part of the MACD line only
        let offset = macd.iter().position(Option::is_some).unwrap_or(macd.len());
        let defined: Vec<f64> = macd.iter().skip(offset).flatten().copied().collect();
        let mut signal = vec![None; offset];
        signal.extend(ema_series(&defined, self.signal));

        let histogram = macd
            .iter()
            .zip(signal.iter())
            .map(|(m, s)| match (m, s) {
                (Some(m), Some(s)) => Some(m - s),
                _ => None,
            })
            .collect();

        MacdSeries { macd, signal, histogram }
    }

    pub fn snapshot(&self, data: &[Candle]) -> Result<MacdSnapshot> {
        if self.fast == 0 || self.slow == 0 || self.signal == 0 {
            return Err(EngineError::InvalidConfiguration("MACD periods must be greater than 0".to_string()));
        }
        let insufficient = || EngineError::insufficient(self.name(), self.lookback(), data.len());
        if data.len() < self.lookback() {
            return Err(insufficient());
        }

        let series = self.series(data);
        let n = data.len();
        let (Some(macd_line), Some(signal_line)) = (series.macd[n - 1], series.signal[n - 1]) else {
            return Err(insufficient());
        };
        let (Some(prev_macd), Some(prev_signal)) = (series.macd[n - 2], series.signal[n - 2]) else {
            return Err(insufficient());
        };

        Ok(MacdSnapshot {
            macd_line,
            signal_line,
            histogram: macd_line - signal_line,
            crossover: crossover(prev_macd, prev_signal, macd_line, signal_line),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::candles_from_closes;

    #[test]
    fn test_crossover_detection() {
        assert_eq!(crossover(-1.0, 0.0, 1.0, 0.0), Some(Crossover::Bullish));
        assert_eq!(crossover(0.0, 0.0, 0.5, 0.0), Some(Crossover::Bullish));
        assert_eq!(crossover(1.0, 0.0, -1.0, 0.0), Some(Crossover::Bearish));
        assert_eq!(crossover(1.0, 0.0, 2.0, 0.0), None);
        assert_eq!(crossover(-1.0, 0.0, -2.0, 0.0), None);
    }

    #[test]
    fn test_series_alignment() {
        let candles = candles_from_closes(&(1..=40).map(f64::from).collect::<Vec<_>>());
        let series = Macd::new(12, 26, 9).series(&candles);
        assert_eq!(series.macd.len(), 40);
        assert_eq!(series.macd.iter().position(Option::is_some), Some(25));
        assert_eq!(series.signal.iter().position(Option::is_some), Some(33));
        assert_eq!(series.histogram.iter().position(Option::is_some), Some(33));
    }

    #[test]
    fn test_snapshot_at_minimum_lookback() {
        let candles = candles_from_closes(&(1..=35).map(f64::from).collect::<Vec<_>>());
        let snapshot = Macd::new(12, 26, 9).snapshot(&candles).unwrap();
        // Linear prices give a constant EMA spread, so MACD equals its signal line
        assert!(snapshot.macd_line > 0.0);
        assert!((snapshot.histogram - (snapshot.macd_line - snapshot.signal_line)).abs() < 1e-12);
    }

    #[test]
    fn test_bullish_crossover_on_latest_candle() {
        // Steady decline, a capitulation candle pushes MACD under its signal, then a sharp rally
        let mut closes: Vec<f64> = (0..40).map(|i| 100.0 - i as f64).collect();
        closes.push(50.0);
        closes.push(120.0);
        let candles = candles_from_closes(&closes);
        let snapshot = Macd::new(12, 26, 9).snapshot(&candles).unwrap();
        assert_eq!(snapshot.crossover, Some(Crossover::Bullish));
        assert!(snapshot.histogram > 0.0);
    }

    #[test]
    fn test_bearish_crossover_on_latest_candle() {
        let mut closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        closes.push(150.0);
        closes.push(80.0);
        let candles = candles_from_closes(&closes);
        let snapshot = Macd::new(12, 26, 9).snapshot(&candles).unwrap();
        assert_eq!(snapshot.crossover, Some(Crossover::Bearish));
    }

    #[test]
    fn test_insufficient_data() {
        let candles = candles_from_closes(&[1.0; 34]);
        match Macd::new(12, 26, 9).snapshot(&candles) {
            Err(EngineError::InsufficientData { required, available, .. }) => {
                assert_eq!(required, 35);
                assert_eq!(available, 34);
            }
            other => panic!("expected InsufficientData, got {:?}", other),
        }
    }
}
