// engine/src/services/signal_service/mod.rs
// The signal engine: runs the evaluation pipeline over every monitored pair and hands
// back records for emission plus the per-user deliveries derived from them.

use crate::config::{monitoring_universe, EngineSettings, UserMonitoringConfig};
use crate::data::CandleSource;
use crate::filter::{SignalGate, SuppressReason};
use chrono::{DateTime, Utc};
use shared::models::{SignalRecord, TimeFrame};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, info};

pub mod deliver;
pub mod evaluate_pair;
pub mod helpers;

pub use deliver::Delivery;

#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    Emitted {
        record: SignalRecord,
        deliveries: Vec<Delivery>,
    },
    Suppressed(SuppressReason),
    NoSignal,
    /// Not evaluated this cycle: candle source or state store trouble.
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairReport {
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub outcome: PairOutcome,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub pairs: Vec<PairReport>,
}

impl CycleReport {
    pub fn records(&self) -> impl Iterator<Item = &SignalRecord> {
        self.pairs.iter().filter_map(|p| match &p.outcome {
            PairOutcome::Emitted { record, .. } => Some(record),
            _ => None,
        })
    }

    pub fn deliveries(&self) -> impl Iterator<Item = &Delivery> {
        self.pairs.iter().flat_map(|p| match &p.outcome {
            PairOutcome::Emitted { deliveries, .. } => deliveries.as_slice(),
            _ => &[],
        })
    }

    fn count(&self, pred: impl Fn(&PairOutcome) -> bool) -> usize {
        self.pairs.iter().filter(|p| pred(&p.outcome)).count()
    }
}

#[derive(Clone)]
pub struct SignalEngine {
    settings: Arc<EngineSettings>,
    users: Arc<Vec<UserMonitoringConfig>>,
    source: Arc<dyn CandleSource>,
    gate: Arc<SignalGate>,
}

impl SignalEngine {
    pub fn new(
        settings: EngineSettings,
        users: Vec<UserMonitoringConfig>,
        source: Arc<dyn CandleSource>,
        gate: Arc<SignalGate>,
    ) -> Self {
        SignalEngine {
            settings: Arc::new(settings),
            users: Arc::new(users),
            source,
            gate,
        }
    }

    pub fn universe(&self) -> BTreeSet<(String, TimeFrame)> {
        monitoring_universe(&self.users)
    }

    pub async fn evaluate_pair(&self, symbol: &str, timeframe: TimeFrame, now: DateTime<Utc>) -> PairOutcome {
        evaluate_pair::handle_evaluate_pair(self, symbol, timeframe, now).await
    }

    /// Evaluates every pair of the universe concurrently, at most `max_concurrent_pairs`
    /// at a time. Reports arrive in completion order.
    pub fn run_cycle(&self, now: DateTime<Utc>) -> ReceiverStream<PairReport> {
        let universe = self.universe();
        let (tx, rx) = mpsc::channel(universe.len().max(1));
        let permits = Arc::new(Semaphore::new(self.settings.max_concurrent_pairs.max(1)));
        info!(pairs = universe.len(), %now, "starting evaluation cycle");

        for (symbol, timeframe) in universe {
            let engine = self.clone();
            let tx = tx.clone();
            let permits = permits.clone();
            tokio::spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                let outcome = engine.evaluate_pair(&symbol, timeframe, now).await;
                if tx.send(PairReport { symbol, timeframe, outcome }).await.is_err() {
                    debug!("cycle receiver dropped");
                }
            });
        }
        ReceiverStream::new(rx)
    }

    /// Runs a whole cycle and collects its reports ordered by pair.
    pub async fn run_cycle_report(&self, now: DateTime<Utc>) -> CycleReport {
        let mut pairs: Vec<PairReport> = self.run_cycle(now).collect().await;
        pairs.sort_by(|a, b| (&a.symbol, a.timeframe).cmp(&(&b.symbol, b.timeframe)));
        let report = CycleReport { pairs };

        info!(
            pairs = report.pairs.len(),
            emitted = report.count(|o| matches!(o, PairOutcome::Emitted { .. })),
            suppressed = report.count(|o| matches!(o, PairOutcome::Suppressed(_))),
            skipped = report.count(|o| matches!(o, PairOutcome::Skipped(_))),
            deliveries = report.deliveries().count(),
            "evaluation cycle finished"
        );
        report
    }
}
