// engine/src/services/signal_service/deliver.rs
// Per-user delivery of a globally accepted signal. Each subscriber re-scores the candles
// with their own indicators and passes their own anti-spam scope.

use super::helpers::build_signal;
use crate::analysis::{ConfluenceAnalyzer, SignalClassifier};
use crate::config::{FilterConfig, IndicatorsConfig, UserMonitoringConfig};
use crate::filter::{FilterDecision, ScopeKey, SignalGate};
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::models::{Candle, Signal};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivery {
    pub user_id: i64,
    pub record_id: Uuid,
    pub signal: Signal,
}

/// Subscribers without a filter config of their own are gated with `fallback_filter`.
pub async fn deliver_to_subscribers(
    gate: &SignalGate,
    subscribers: &[UserMonitoringConfig],
    fallback_filter: &FilterConfig,
    global: &Signal,
    record_id: Uuid,
    candles: &[Candle],
    now: DateTime<Utc>,
) -> Vec<Delivery> {
    let mut deliveries = Vec::new();
    for user in subscribers {
        if let Some(delivery) = deliver_to_user(gate, user, fallback_filter, global, record_id, candles, now).await {
            deliveries.push(delivery);
        }
    }
    deliveries
}

async fn deliver_to_user(
    gate: &SignalGate,
    user: &UserMonitoringConfig,
    fallback_filter: &FilterConfig,
    global: &Signal,
    record_id: Uuid,
    candles: &[Candle],
    now: DateTime<Utc>,
) -> Option<Delivery> {
    let default_indicators;
    let indicators = match &user.indicators_config {
        Some(config) => config,
        None => {
            default_indicators = IndicatorsConfig::default();
            &default_indicators
        }
    };
    if let Err(e) = indicators.validate() {
        warn!(user_id = user.user_id, config = %user.config_name, error = %e, "ignoring user with invalid indicators");
        return None;
    }

    let analysis = ConfluenceAnalyzer::new(indicators).analyze(candles);
    let classification =
        SignalClassifier::classify(&analysis.score, analysis.rsi_zone(), global.timeframe, &indicators.min_score);
    if classification.signal_type != global.signal_type {
        debug!(
            user_id = user.user_id,
            symbol = %global.symbol,
            timeframe = %global.timeframe,
            user_signal = %classification.signal_type,
            "user indicators disagree with global signal"
        );
        return None;
    }
    let signal = build_signal(&global.symbol, global.timeframe, &analysis, classification, global.timestamp)?;

    let key = ScopeKey::user(user.user_id, &global.symbol, global.timeframe);
    let filter = user.filter_config.as_ref().unwrap_or(fallback_filter);
    match gate.admit(&key, &signal, filter, now).await {
        Ok(FilterDecision::Accept) => {
            info!(user_id = user.user_id, scope = %key, strength = %signal.strength, "signal delivered");
            Some(Delivery {
                user_id: user.user_id,
                record_id,
                signal,
            })
        }
        Ok(FilterDecision::Suppress(reason)) => {
            debug!(user_id = user.user_id, scope = %key, %reason, "delivery suppressed");
            None
        }
        Err(e) => {
            error!(user_id = user.user_id, scope = %key, error = %e, "filter state store failed, delivery skipped");
            None
        }
    }
}
