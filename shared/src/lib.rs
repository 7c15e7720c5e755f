// Data model shared by the signal engine and anything consuming its records.
pub mod models;

pub use models::{
    Candle, ConfluenceScore, Direction, IndicatorResult, RiskLevel, Signal, SignalRecord,
    SignalQuality, SignalStrength, SignalType, TimeFrame, TradeLevels,
};
