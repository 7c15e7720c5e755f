// engine/src/services/signal_service/helpers.rs
// Building signals and records out of an analysis, and the per-pair configuration
// derived from the users subscribed to it.

use crate::analysis::recommendation;
use crate::analysis::{Classification, ConfluenceAnalysis};
use crate::config::{EngineSettings, FilterConfig, UserMonitoringConfig};
use chrono::{DateTime, Utc};
use shared::models::{Candle, Signal, SignalRecord, TimeFrame};
use uuid::Uuid;

/// The signal for a classified analysis, stamped with the open time of the latest candle.
/// `None` for a non-directional classification or when there is no RSI reading.
pub fn build_signal(
    symbol: &str,
    timeframe: TimeFrame,
    analysis: &ConfluenceAnalysis,
    classification: Classification,
    timestamp: DateTime<Utc>,
) -> Option<Signal> {
    if !classification.is_signal() {
        return None;
    }
    let rsi = analysis.rsi?;
    Some(Signal {
        symbol: symbol.to_uppercase(),
        timeframe,
        signal_type: classification.signal_type,
        strength: classification.strength,
        rsi_value: rsi.value,
        price: analysis.price,
        confluence: analysis.score.clone(),
        timestamp,
    })
}

/// Unprocessed record for an accepted signal.
pub fn build_record(signal: &Signal, analysis: &ConfluenceAnalysis, candles: &[Candle], now: DateTime<Utc>) -> SignalRecord {
    let medium_ema = analysis.ema.as_ref().map(|e| e.medium);
    let slow_ema = analysis.ema.as_ref().map(|e| e.slow);
    let trade_levels =
        recommendation::trade_levels(signal, medium_ema, slow_ema, recommendation::volatility_pct(candles));

    SignalRecord {
        id: Uuid::new_v4(),
        symbol: signal.symbol.clone(),
        timeframe: signal.timeframe,
        signal_type: signal.signal_type,
        strength: signal.strength,
        rsi_value: signal.rsi_value,
        price: signal.price,
        confluence: signal.confluence.clone(),
        message: recommendation::message(signal),
        risk_level: recommendation::risk_level(signal.confluence.score_percentage),
        trade_levels,
        timestamp: signal.timestamp,
        created_at: now,
        processed: false,
        processed_at: None,
        processed_by: None,
    }
}

/// Filter used for the global scope of a pair: the most permissive combination of the
/// subscribers' configs. Subscribers without one count with the engine default, as does
/// a pair nobody subscribes to.
pub fn global_filter_config(settings: &EngineSettings, subscribers: &[UserMonitoringConfig]) -> FilterConfig {
    if subscribers.is_empty() {
        return settings.filter.clone();
    }
    FilterConfig::aggregate(subscribers.iter().map(|u| u.filter_config.as_ref().unwrap_or(&settings.filter)))
}

/// Candles to request so both global detection and every subscriber's indicators can be scored.
pub fn candles_needed(settings: &EngineSettings, subscribers: &[UserMonitoringConfig]) -> usize {
    subscribers
        .iter()
        .filter_map(|u| u.indicators_config.as_ref())
        .map(|c| c.lookback())
        .fold(settings.candles_needed(), usize::max)
}
