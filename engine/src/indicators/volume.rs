// Volume statistics: volume SMA ratio, On-Balance Volume and VWAP
use super::{latest_value, IndicatorCalculator, PriceSource, Sma};
use crate::error::{EngineError, Result};
use serde::Serialize;
use shared::models::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObvTrend {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VwapPosition {
    Above,
    Below,
    At,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSnapshot {
    pub volume: f64,
    pub volume_sma: f64,
    pub volume_ratio: f64,
    pub is_high_volume: bool,
    pub obv: f64,
    pub obv_trend: ObvTrend,
    pub vwap: f64,
    pub price_vs_vwap: VwapPosition,
}

/// On-Balance Volume, starting at 0 on the first candle.
pub fn obv_series(data: &[Candle]) -> Vec<f64> {
    let mut result = Vec::with_capacity(data.len());
    let mut obv = 0.0;
    for (i, candle) in data.iter().enumerate() {
        if i > 0 {
            let prev_close = data[i - 1].close;
            if candle.close > prev_close {
                obv += candle.volume;
            } else if candle.close < prev_close {
                obv -= candle.volume;
            }
        }
        result.push(obv);
    }
    result
}

/// Cumulative VWAP over the whole window. Falls back to the last close without volume.
pub fn vwap(data: &[Candle]) -> Option<f64> {
    let last = data.last()?;
    let (tp_volume, volume) = data.iter().fold((0.0, 0.0), |(tpv, vol), c| {
        (tpv + c.typical_price() * c.volume, vol + c.volume)
    });
    if volume > 0.0 {
        Some(tp_volume / volume)
    } else {
        Some(last.close)
    }
}

pub struct VolumeAnalyzer {
    sma_period: usize,
    threshold_multiplier: f64,
    obv_lookback: usize,
}

impl VolumeAnalyzer {
    pub fn new(sma_period: usize, threshold_multiplier: f64, obv_lookback: usize) -> Self {
        Self {
            sma_period,
            threshold_multiplier,
            obv_lookback,
        }
    }

    pub fn lookback(&self) -> usize {
        self.sma_period.max(self.obv_lookback + 1)
    }

    pub fn snapshot(&self, data: &[Candle]) -> Result<VolumeSnapshot> {
        if self.sma_period == 0 || self.obv_lookback == 0 {
            return Err(EngineError::InvalidConfiguration(
                "Volume SMA period and OBV lookback must be greater than 0".to_string(),
            ));
        }
        let insufficient = || EngineError::insufficient("Volume", self.lookback(), data.len());
        if data.len() < self.lookback() {
            return Err(insufficient());
        }
        let last = data.last().ok_or_else(insufficient)?;

        let volume_sma = latest_value(&Sma::with_source(self.sma_period, PriceSource::Volume).calculate(data))
            .ok_or_else(insufficient)?;
        let volume_ratio = if volume_sma > 0.0 { last.volume / volume_sma } else { 0.0 };

        let obv = obv_series(data);
        let current_obv = obv[obv.len() - 1];
        let reference_obv = obv[obv.len() - 1 - self.obv_lookback];
        let obv_trend = if current_obv > reference_obv {
            ObvTrend::Up
        } else if current_obv < reference_obv {
            ObvTrend::Down
        } else {
            ObvTrend::Flat
        };

        let vwap = vwap(data).ok_or_else(insufficient)?;
        let price_vs_vwap = if last.close > vwap {
            VwapPosition::Above
        } else if last.close < vwap {
            VwapPosition::Below
        } else {
            VwapPosition::At
        };

        Ok(VolumeSnapshot {
            volume: last.volume,
            volume_sma,
            volume_ratio,
            is_high_volume: volume_ratio >= self.threshold_multiplier,
            obv: current_obv,
            obv_trend,
            vwap,
            price_vs_vwap,
        })
    }
}
