// Exponential Moving Average (EMA) indicator implementation
use super::{IndicatorCalculator, PriceSource};
use crate::error::{EngineError, Result};
use serde::Serialize;
use shared::models::Candle;

/// SMA-seeded EMA over a plain series. The first `period - 1` entries are None.
pub fn ema_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || values.len() < period {
        return vec![None; values.len()];
    }

    let mut results = vec![None; period - 1];
    let multiplier = 2.0 / (period as f64 + 1.0);

    // Calculate initial SMA for the first EMA value
    let initial_sum: f64 = values.iter().take(period).sum();
    let mut previous_ema = initial_sum / period as f64;
    results.push(Some(previous_ema));

    for value in values.iter().skip(period) {
        let ema = (value - previous_ema) * multiplier + previous_ema;
        results.push(Some(ema));
        previous_ema = ema;
    }
    results
}

pub struct Ema {
    name: String,
    period: usize,
    source: PriceSource,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            name: format!("EMA({})", period),
            period,
            source: PriceSource::Close,
        }
    }
}

impl IndicatorCalculator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn calculate(&self, data: &[Candle]) -> Vec<Option<f64>> {
        let values: Vec<f64> = data.iter().map(|c| self.source.value(c)).collect();
        ema_series(&values, self.period)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StackTrend {
    Bullish,
    Bearish,
    Mixed,
}

/// Latest values of the fast/medium/slow EMAs and how they are ordered.
#[derive(Debug, Clone, PartialEq)]
pub struct EmaSnapshot {
    pub fast: f64,
    pub medium: f64,
    pub slow: f64,
    pub price: f64,
    pub trend: StackTrend,
}

impl EmaSnapshot {
    pub fn new(fast: f64, medium: f64, slow: f64, price: f64) -> Self {
        let trend = if fast > medium && medium > slow {
            StackTrend::Bullish
        } else if fast < medium && medium < slow {
            StackTrend::Bearish
        } else {
            StackTrend::Mixed
        };
        Self {
            fast,
            medium,
            slow,
            price,
            trend,
        }
    }

    pub fn price_above_slow(&self) -> bool {
        self.price > self.slow
    }

    pub fn price_below_slow(&self) -> bool {
        self.price < self.slow
    }
}

/// Three EMAs evaluated together, e.g. 9/21/50.
pub struct EmaStack {
    fast: Ema,
    medium: Ema,
    slow: Ema,
}

impl EmaStack {
    pub fn new(fast: usize, medium: usize, slow: usize) -> Self {
        Self {
            fast: Ema::new(fast),
            medium: Ema::new(medium),
            slow: Ema::new(slow),
        }
    }

    pub fn lookback(&self) -> usize {
        self.fast.lookback().max(self.medium.lookback()).max(self.slow.lookback())
    }

    pub fn snapshot(&self, data: &[Candle]) -> Result<EmaSnapshot> {
        if [&self.fast, &self.medium, &self.slow].iter().any(|ema| ema.period == 0) {
            return Err(EngineError::InvalidConfiguration("EMA periods must be greater than 0".to_string()));
        }
        let insufficient = || EngineError::insufficient("EMA", self.lookback(), data.len());
        let last = data.last().ok_or_else(insufficient)?;

        let fast = super::latest_value(&self.fast.calculate(data)).ok_or_else(insufficient)?;
        let medium = super::latest_value(&self.medium.calculate(data)).ok_or_else(insufficient)?;
        let slow = super::latest_value(&self.slow.calculate(data)).ok_or_else(insufficient)?;

        Ok(EmaSnapshot::new(fast, medium, slow, last.close))
    }
}
