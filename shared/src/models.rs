use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// (high + low + close) / 3, the price VWAP weights by volume.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Candle interval. Serialized in its exchange string form ("15m", "4h", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeFrame {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Hour4,
    Day1,
}

impl TimeFrame {
    pub const ALL: [TimeFrame; 7] = [
        TimeFrame::Minute1,
        TimeFrame::Minute5,
        TimeFrame::Minute15,
        TimeFrame::Minute30,
        TimeFrame::Hour1,
        TimeFrame::Hour4,
        TimeFrame::Day1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFrame::Minute1 => "1m",
            TimeFrame::Minute5 => "5m",
            TimeFrame::Minute15 => "15m",
            TimeFrame::Minute30 => "30m",
            TimeFrame::Hour1 => "1h",
            TimeFrame::Hour4 => "4h",
            TimeFrame::Day1 => "1d",
        }
    }

    pub fn minutes(&self) -> u32 {
        match self {
            TimeFrame::Minute1 => 1,
            TimeFrame::Minute5 => 5,
            TimeFrame::Minute15 => 15,
            TimeFrame::Minute30 => 30,
            TimeFrame::Hour1 => 60,
            TimeFrame::Hour4 => 240,
            TimeFrame::Day1 => 1440,
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimeFrameError(pub String);

impl fmt::Display for ParseTimeFrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown timeframe '{}'", self.0)
    }
}

impl std::error::Error for ParseTimeFrameError {}

impl FromStr for TimeFrame {
    type Err = ParseTimeFrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        TimeFrame::ALL
            .iter()
            .copied()
            .find(|tf| tf.as_str() == normalized)
            .ok_or_else(|| ParseTimeFrameError(s.to_string()))
    }
}

impl TryFrom<String> for TimeFrame {
    type Error = ParseTimeFrameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeFrame> for String {
    fn from(tf: TimeFrame) -> Self {
        tf.as_str().to_string()
    }
}

/// Direction the confluence breakdown was scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
    None,
}

impl SignalType {
    pub fn is_directional(&self) -> bool {
        !matches!(self, SignalType::None)
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
            SignalType::None => "NONE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalStrength {
    Weak,
    Moderate,
    Strong,
    None,
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalStrength::Weak => "WEAK",
            SignalStrength::Moderate => "MODERATE",
            SignalStrength::Strong => "STRONG",
            SignalStrength::None => "NONE",
        };
        f.write_str(s)
    }
}

/// One indicator's contribution to a confluence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub name: String,
    pub score: u32,
    pub max_score: u32,
    /// Numeric inputs the score was derived from.
    pub raw_values: BTreeMap<String, serde_json::Value>,
    pub is_contributing: bool,
    pub reason: String,
}

impl IndicatorResult {
    /// Result for an indicator that could not be computed: contributes 0 out of 0.
    pub fn unavailable(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            score: 0,
            max_score: 0,
            raw_values: BTreeMap::new(),
            is_contributing: false,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceScore {
    pub total_score: u32,
    pub max_possible_score: u32,
    pub direction: Direction,
    pub breakdown: Vec<IndicatorResult>,
    pub score_percentage: f64,
}

impl ConfluenceScore {
    /// Totals are always derived from the breakdown.
    pub fn from_breakdown(direction: Direction, breakdown: Vec<IndicatorResult>) -> Self {
        let total_score = breakdown.iter().map(|r| r.score).sum();
        let max_possible_score = breakdown.iter().map(|r| r.max_score).sum();
        let score_percentage = if max_possible_score == 0 {
            0.0
        } else {
            f64::from(total_score) / f64::from(max_possible_score) * 100.0
        };
        Self {
            total_score,
            max_possible_score,
            direction,
            breakdown,
            score_percentage,
        }
    }

    pub fn indicator(&self, name: &str) -> Option<&IndicatorResult> {
        self.breakdown.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub signal_type: SignalType,
    pub strength: SignalStrength,
    pub rsi_value: f64,
    pub price: f64,
    pub confluence: ConfluenceScore,
    pub timestamp: DateTime<Utc>,
}

/// Suggested entry and exit levels attached to an emitted signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLevels {
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward_ratio: Option<f64>,
    /// Suggested position as a percentage of capital.
    pub position_size_pct: f64,
    pub signal_quality: SignalQuality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Persisted form of an accepted signal. Delivery consumers claim it once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub id: Uuid,
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub signal_type: SignalType,
    pub strength: SignalStrength,
    pub rsi_value: f64,
    pub price: f64,
    pub confluence: ConfluenceScore,
    pub message: String,
    pub risk_level: RiskLevel,
    pub trade_levels: Option<TradeLevels>,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlreadyProcessed {
    pub id: Uuid,
    pub processed_by: Option<String>,
}

impl fmt::Display for AlreadyProcessed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.processed_by {
            Some(by) => write!(f, "signal {} already processed by {}", self.id, by),
            None => write!(f, "signal {} already processed", self.id),
        }
    }
}

impl std::error::Error for AlreadyProcessed {}

impl SignalRecord {
    /// Marks the record processed. Only the first claim succeeds.
    pub fn claim(&mut self, processor: &str, at: DateTime<Utc>) -> Result<(), AlreadyProcessed> {
        if self.processed {
            return Err(AlreadyProcessed {
                id: self.id,
                processed_by: self.processed_by.clone(),
            });
        }
        self.processed = true;
        self.processed_at = Some(at);
        self.processed_by = Some(processor.to_string());
        Ok(())
    }
}
