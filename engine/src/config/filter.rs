// Anti-spam filter configuration: cooldown windows, daily caps and RSI intensity delta
use chrono::Duration;
use serde::{Deserialize, Serialize};
use shared::models::{SignalStrength, TimeFrame};
use std::collections::BTreeMap;

pub const DEFAULT_MAX_SIGNALS_PER_DAY: u32 = 3;
pub const DEFAULT_MAX_STRONG_SIGNALS_PER_DAY: u32 = 2;
pub const DEFAULT_MIN_RSI_DIFFERENCE: f64 = 2.0;

/// Cooldown in minutes for each signal strength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrengthCooldowns {
    pub strong: f64,
    pub moderate: f64,
    pub weak: f64,
}

impl StrengthCooldowns {
    pub const fn new(strong: f64, moderate: f64, weak: f64) -> Self {
        Self { strong, moderate, weak }
    }

    pub fn minutes(&self, strength: SignalStrength) -> f64 {
        match strength {
            SignalStrength::Strong => self.strong,
            SignalStrength::Moderate => self.moderate,
            SignalStrength::Weak => self.weak,
            SignalStrength::None => 0.0,
        }
    }

    fn scaled(&self, ratio: f64) -> Self {
        Self::new(self.strong * ratio, self.moderate * ratio, self.weak * ratio)
    }

    fn min(&self, other: &Self) -> Self {
        Self::new(
            self.strong.min(other.strong),
            self.moderate.min(other.moderate),
            self.weak.min(other.weak),
        )
    }

    /// Built-in table; timeframes outside it scale the 4h row by their length.
    pub fn default_for(timeframe: TimeFrame) -> Self {
        const REFERENCE: StrengthCooldowns = StrengthCooldowns::new(120.0, 240.0, 360.0);
        match timeframe {
            TimeFrame::Minute15 => Self::new(15.0, 30.0, 60.0),
            TimeFrame::Hour1 => Self::new(60.0, 120.0, 240.0),
            TimeFrame::Hour4 => REFERENCE,
            TimeFrame::Day1 => Self::new(360.0, 720.0, 1440.0),
            other => REFERENCE.scaled(f64::from(other.minutes()) / f64::from(TimeFrame::Hour4.minutes())),
        }
    }
}

/// Either one value for every timeframe and strength, or a nested table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CooldownMinutes {
    Flat(f64),
    PerTimeframe(BTreeMap<TimeFrame, StrengthCooldowns>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub cooldown_minutes: Option<CooldownMinutes>,
    pub max_signals_per_day: Option<u32>,
    pub max_strong_signals_per_day: Option<u32>,
    pub min_rsi_difference: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            cooldown_minutes: None,
            max_signals_per_day: None,
            max_strong_signals_per_day: None,
            min_rsi_difference: DEFAULT_MIN_RSI_DIFFERENCE,
        }
    }
}

impl FilterConfig {
    pub fn cooldown_row(&self, timeframe: TimeFrame) -> StrengthCooldowns {
        match &self.cooldown_minutes {
            Some(CooldownMinutes::Flat(minutes)) => StrengthCooldowns::new(*minutes, *minutes, *minutes),
            Some(CooldownMinutes::PerTimeframe(table)) => table
                .get(&timeframe)
                .copied()
                .unwrap_or_else(|| StrengthCooldowns::default_for(timeframe)),
            None => StrengthCooldowns::default_for(timeframe),
        }
    }

    pub fn cooldown_for(&self, timeframe: TimeFrame, strength: SignalStrength) -> Duration {
        let minutes = self.cooldown_row(timeframe).minutes(strength).max(0.0);
        Duration::milliseconds((minutes * 60_000.0).round() as i64)
    }

    pub fn daily_cap(&self) -> u32 {
        self.max_signals_per_day.unwrap_or(DEFAULT_MAX_SIGNALS_PER_DAY)
    }

    /// Explicit strong cap, else half of an explicit daily cap (at least 1), else the default.
    pub fn strong_cap(&self) -> u32 {
        match (self.max_strong_signals_per_day, self.max_signals_per_day) {
            (Some(strong), _) => strong,
            (None, Some(max)) => (max / 2).max(1),
            (None, None) => DEFAULT_MAX_STRONG_SIGNALS_PER_DAY,
        }
    }

    /// Most permissive combination of several users' configs: shortest cooldowns, largest caps.
    pub fn aggregate<'a>(configs: impl IntoIterator<Item = &'a FilterConfig>) -> FilterConfig {
        let configs: Vec<&FilterConfig> = configs.into_iter().collect();
        if configs.is_empty() {
            return FilterConfig::default();
        }

        let table = TimeFrame::ALL
            .iter()
            .map(|&tf| {
                let row = configs
                    .iter()
                    .map(|c| c.cooldown_row(tf))
                    .reduce(|a, b| a.min(&b))
                    .unwrap_or_else(|| StrengthCooldowns::default_for(tf));
                (tf, row)
            })
            .collect();

        FilterConfig {
            cooldown_minutes: Some(CooldownMinutes::PerTimeframe(table)),
            max_signals_per_day: configs.iter().map(|c| c.daily_cap()).max(),
            max_strong_signals_per_day: configs.iter().map(|c| c.strong_cap()).max(),
            min_rsi_difference: configs
                .iter()
                .map(|c| c.min_rsi_difference)
                .fold(f64::INFINITY, f64::min),
        }
    }
}
