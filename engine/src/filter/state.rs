// Filter state kept per scope key
use crate::config::FilterConfig;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::models::{SignalStrength, TimeFrame};
use std::fmt;

/// Identifies one independent unit of filter state.
/// `user_id = None` is the global detection scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeKey {
    pub user_id: Option<i64>,
    pub symbol: String,
    pub timeframe: TimeFrame,
}

impl ScopeKey {
    pub fn global(symbol: &str, timeframe: TimeFrame) -> Self {
        Self {
            user_id: None,
            symbol: symbol.to_uppercase(),
            timeframe,
        }
    }

    pub fn user(user_id: i64, symbol: &str, timeframe: TimeFrame) -> Self {
        Self {
            user_id: Some(user_id),
            symbol: symbol.to_uppercase(),
            timeframe,
        }
    }

    pub fn is_global(&self) -> bool {
        self.user_id.is_none()
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.user_id {
            Some(id) => write!(f, "user:{}:{}:{}", id, self.symbol, self.timeframe),
            None => write!(f, "global:{}:{}", self.symbol, self.timeframe),
        }
    }
}

/// Missing fields deserialize to their cold-start values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub last_signal_time: Option<DateTime<Utc>>,
    pub last_signal_strength: Option<SignalStrength>,
    pub last_rsi_value: Option<f64>,
    pub signals_today: u32,
    pub strong_signals_today: u32,
    pub day_boundary: Option<NaiveDate>,
}

impl FilterState {
    /// `(signals_today, strong_signals_today)` as they stand on `today`.
    pub fn counters_on(&self, today: NaiveDate) -> (u32, u32) {
        if self.day_boundary == Some(today) {
            (self.signals_today, self.strong_signals_today)
        } else {
            (0, 0)
        }
    }

    pub fn roll_over(&mut self, today: NaiveDate) {
        if self.day_boundary != Some(today) {
            self.signals_today = 0;
            self.strong_signals_today = 0;
            self.day_boundary = Some(today);
        }
    }

    pub fn stats(&self, config: &FilterConfig, now: DateTime<Utc>) -> FilterStats {
        let (signals_today, strong_signals_today) = self.counters_on(now.date_naive());
        FilterStats {
            signals_today,
            strong_signals_today,
            remaining_today: config.daily_cap().saturating_sub(signals_today),
            remaining_strong_today: config.strong_cap().saturating_sub(strong_signals_today),
            last_signal_time: self.last_signal_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterStats {
    pub signals_today: u32,
    pub strong_signals_today: u32,
    pub remaining_today: u32,
    pub remaining_strong_today: u32,
    pub last_signal_time: Option<DateTime<Utc>>,
}
