// Serialized read-modify-write of filter state per scope key
use super::anti_spam::{AntiSpamFilter, FilterDecision};
use super::state::{FilterState, FilterStats, ScopeKey};
use super::store::FilterStateStore;
use crate::config::FilterConfig;
use crate::error::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use shared::models::Signal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Anti-spam filter bound to a state store. Evaluations for the same key run one at a time;
/// different keys never wait on each other.
pub struct SignalGate {
    store: Arc<dyn FilterStateStore>,
    locks: DashMap<ScopeKey, Arc<Mutex<()>>>,
}

impl SignalGate {
    pub fn new(store: Arc<dyn FilterStateStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, key: &ScopeKey) -> Arc<Mutex<()>> {
        self.locks.entry(key.clone()).or_default().clone()
    }

    fn load_or_cold(&self, key: &ScopeKey) -> FilterState {
        match self.store.load(key) {
            Ok(Some(state)) => state,
            Ok(None) => {
                debug!(scope = %key, "no filter state, starting cold");
                FilterState::default()
            }
            Err(e) => {
                warn!(scope = %key, error = %e, "filter state unavailable, starting cold");
                FilterState::default()
            }
        }
    }

    /// Evaluates `signal` for `key` and records it when accepted.
    pub async fn admit(
        &self,
        key: &ScopeKey,
        signal: &Signal,
        config: &FilterConfig,
        now: DateTime<Utc>,
    ) -> Result<FilterDecision> {
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;

        let mut state = self.load_or_cold(key);
        let decision = AntiSpamFilter::apply(&mut state, signal, config, now);
        match &decision {
            FilterDecision::Accept => {
                self.store.save(key, &state)?;
                // User scopes are reported by delivery
                if key.is_global() {
                    info!(
                        scope = %key,
                        signal_type = %signal.signal_type,
                        strength = %signal.strength,
                        rsi = signal.rsi_value,
                        signals_today = state.signals_today,
                        "signal accepted"
                    );
                } else {
                    debug!(scope = %key, signals_today = state.signals_today, "user scope accepted");
                }
            }
            FilterDecision::Suppress(reason) => {
                debug!(scope = %key, %reason, "signal suppressed");
            }
        }
        Ok(decision)
    }

    pub async fn stats(&self, key: &ScopeKey, config: &FilterConfig, now: DateTime<Utc>) -> Result<FilterStats> {
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;
        Ok(self.load_or_cold(key).stats(config, now))
    }
}
