// Simple Moving Average (SMA) indicator implementation
use super::{IndicatorCalculator, PriceSource};
use shared::models::Candle;

pub struct Sma {
    name: String,
    period: usize,
    source: PriceSource,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self::with_source(period, PriceSource::Close)
    }

    pub fn with_source(period: usize, source: PriceSource) -> Self {
        let name = match source {
            PriceSource::Close => format!("SMA({})", period),
            PriceSource::Volume => format!("VolumeSMA({})", period),
        };
        Self { name, period, source }
    }
}

impl IndicatorCalculator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn calculate(&self, data: &[Candle]) -> Vec<Option<f64>> {
        if self.period == 0 || data.len() < self.period {
            return vec![None; data.len()];
        }

        let mut results = vec![None; self.period - 1]; // No SMA for initial period

        // Calculate sum for the first window
        let mut sum: f64 = data.iter().take(self.period).map(|c| self.source.value(c)).sum();
        results.push(Some(sum / self.period as f64));

        // Slide the window
        for i in self.period..data.len() {
            sum = sum - self.source.value(&data[i - self.period]) + self.source.value(&data[i]);
            results.push(Some(sum / self.period as f64));
        }
        results
    }
}
