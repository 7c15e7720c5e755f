// engine/src/services/signal_service/evaluate_pair.rs
// One (symbol, timeframe) pass: fetch, score, classify, gate globally, then deliver.

use super::deliver::deliver_to_subscribers;
use super::helpers::{build_record, build_signal, candles_needed, global_filter_config};
use super::{PairOutcome, SignalEngine};
use crate::analysis::{ConfluenceAnalyzer, SignalClassifier};
use crate::config::subscribers;
use crate::filter::{FilterDecision, ScopeKey};
use chrono::{DateTime, Utc};
use shared::models::TimeFrame;
use tracing::{debug, error, warn};

pub async fn handle_evaluate_pair(
    engine: &SignalEngine,
    symbol: &str,
    timeframe: TimeFrame,
    now: DateTime<Utc>,
) -> PairOutcome {
    let subscribed: Vec<_> = subscribers(&engine.users, symbol, timeframe).into_iter().cloned().collect();

    let min_count = candles_needed(&engine.settings, &subscribed);
    let candles = match engine.source.fetch_candles(symbol, timeframe, min_count).await {
        Ok(candles) => candles,
        Err(e) => {
            if e.is_transient() {
                warn!(%symbol, %timeframe, error = %e, "candles unavailable, skipping pair this cycle");
            } else {
                error!(%symbol, %timeframe, error = %e, "candle fetch failed, skipping pair this cycle");
            }
            return PairOutcome::Skipped(e.to_string());
        }
    };
    let Some(latest) = candles.last() else {
        return PairOutcome::Skipped("candle source returned no candles".to_string());
    };
    let timestamp = latest.open_time;

    let indicators = &engine.settings.indicators;
    let analysis = ConfluenceAnalyzer::new(indicators).analyze(&candles);
    let classification =
        SignalClassifier::classify(&analysis.score, analysis.rsi_zone(), timeframe, &indicators.min_score);
    debug!(
        %symbol,
        %timeframe,
        score = analysis.score.total_score,
        max = analysis.score.max_possible_score,
        signal_type = %classification.signal_type,
        "pair scored"
    );

    let Some(signal) = build_signal(symbol, timeframe, &analysis, classification, timestamp) else {
        return PairOutcome::NoSignal;
    };

    let key = ScopeKey::global(symbol, timeframe);
    let filter = global_filter_config(&engine.settings, &subscribed);
    match engine.gate.admit(&key, &signal, &filter, now).await {
        Ok(FilterDecision::Accept) => {
            let record = build_record(&signal, &analysis, &candles, now);
            let deliveries = deliver_to_subscribers(
                &engine.gate,
                &subscribed,
                &engine.settings.filter,
                &signal,
                record.id,
                &candles,
                now,
            )
            .await;
            PairOutcome::Emitted { record, deliveries }
        }
        Ok(FilterDecision::Suppress(reason)) => PairOutcome::Suppressed(reason),
        Err(e) => {
            error!(scope = %key, error = %e, "filter state store failed, signal not emitted");
            PairOutcome::Skipped(e.to_string())
        }
    }
}
