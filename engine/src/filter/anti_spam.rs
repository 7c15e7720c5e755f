// Anti-spam filter: cooldown, RSI intensity and daily caps per scope key
use super::state::FilterState;
use crate::config::FilterConfig;
use chrono::{DateTime, Duration, Utc};
use shared::models::{Signal, SignalStrength};
use std::fmt;

/// How long the last accepted RSI value is remembered for the intensity check.
pub const RSI_MEMORY_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq)]
pub enum SuppressReason {
    NoSignal,
    Cooldown { remaining: Duration },
    RsiTooClose { difference: f64, required: f64 },
    DailyCap { limit: u32 },
    StrongDailyCap { limit: u32 },
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuppressReason::NoSignal => write!(f, "no signal"),
            SuppressReason::Cooldown { remaining } => {
                write!(f, "cooldown active, {}s remaining", remaining.num_seconds())
            }
            SuppressReason::RsiTooClose { difference, required } => {
                write!(f, "RSI moved {:.2}, need at least {:.2}", difference, required)
            }
            SuppressReason::DailyCap { limit } => write!(f, "daily limit of {} signals reached", limit),
            SuppressReason::StrongDailyCap { limit } => {
                write!(f, "daily limit of {} strong signals reached", limit)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterDecision {
    Accept,
    Suppress(SuppressReason),
}

impl FilterDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, FilterDecision::Accept)
    }
}

pub struct AntiSpamFilter;

impl AntiSpamFilter {
    /// Decides whether `signal` may be emitted. Never mutates `state`.
    pub fn evaluate(state: &FilterState, signal: &Signal, config: &FilterConfig, now: DateTime<Utc>) -> FilterDecision {
        if !signal.signal_type.is_directional() || signal.strength == SignalStrength::None {
            return FilterDecision::Suppress(SuppressReason::NoSignal);
        }

        if let Some(last) = state.last_signal_time {
            let required = config.cooldown_for(signal.timeframe, signal.strength);
            let elapsed = now - last;
            if elapsed < required {
                return FilterDecision::Suppress(SuppressReason::Cooldown {
                    remaining: required - elapsed,
                });
            }
        }

        let remembered_rsi = match (state.last_rsi_value, state.last_signal_time) {
            (Some(rsi), Some(at)) if now - at < Duration::hours(RSI_MEMORY_HOURS) => Some(rsi),
            _ => None,
        };
        if let Some(last_rsi) = remembered_rsi {
            let difference = (signal.rsi_value - last_rsi).abs();
            if difference < config.min_rsi_difference {
                return FilterDecision::Suppress(SuppressReason::RsiTooClose {
                    difference,
                    required: config.min_rsi_difference,
                });
            }
        }

        let (signals_today, strong_today) = state.counters_on(now.date_naive());
        if signals_today >= config.daily_cap() {
            return FilterDecision::Suppress(SuppressReason::DailyCap {
                limit: config.daily_cap(),
            });
        }
        if signal.strength == SignalStrength::Strong && strong_today >= config.strong_cap() {
            return FilterDecision::Suppress(SuppressReason::StrongDailyCap {
                limit: config.strong_cap(),
            });
        }

        FilterDecision::Accept
    }

    /// Records an accepted signal. Call at most once per genuinely new signal.
    pub fn accept(state: &mut FilterState, signal: &Signal, now: DateTime<Utc>) {
        state.roll_over(now.date_naive());
        state.last_signal_time = Some(now);
        state.last_signal_strength = Some(signal.strength);
        state.last_rsi_value = Some(signal.rsi_value);
        state.signals_today += 1;
        if signal.strength == SignalStrength::Strong {
            state.strong_signals_today += 1;
        }
    }

    /// `evaluate` then `accept` on success.
    pub fn apply(state: &mut FilterState, signal: &Signal, config: &FilterConfig, now: DateTime<Utc>) -> FilterDecision {
        let decision = Self::evaluate(state, signal, config, now);
        if decision.is_accept() {
            Self::accept(state, signal, now);
        }
        decision
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::CooldownMinutes;
    use chrono::TimeZone;
    use shared::models::{ConfluenceScore, Direction, SignalType, TimeFrame};

    pub(crate) fn signal(strength: SignalStrength, rsi_value: f64) -> Signal {
        Signal {
            symbol: "BTCUSDT".to_string(),
            timeframe: TimeFrame::Minute15,
            signal_type: SignalType::Buy,
            strength,
            rsi_value,
            price: 100.0,
            confluence: ConfluenceScore::from_breakdown(Direction::Bullish, Vec::new()),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 6, 9, 45, 0).unwrap(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap()
    }

    fn no_cooldown() -> FilterConfig {
        FilterConfig {
            cooldown_minutes: Some(CooldownMinutes::Flat(0.0)),
            ..FilterConfig::default()
        }
    }

    #[test]
    fn no_signal_is_never_emitted() {
        let mut s = signal(SignalStrength::None, 18.0);
        s.signal_type = SignalType::None;
        assert_eq!(
            AntiSpamFilter::evaluate(&FilterState::default(), &s, &FilterConfig::default(), t0()),
            FilterDecision::Suppress(SuppressReason::NoSignal)
        );
    }

    #[test]
    fn cold_state_accepts() {
        let decision =
            AntiSpamFilter::evaluate(&FilterState::default(), &signal(SignalStrength::Strong, 18.4), &FilterConfig::default(), t0());
        assert_eq!(decision, FilterDecision::Accept);
    }

    #[test]
    fn evaluate_is_read_only() {
        let state = FilterState::default();
        let s = signal(SignalStrength::Strong, 18.4);
        let config = FilterConfig::default();
        let first = AntiSpamFilter::evaluate(&state, &s, &config, t0());
        let second = AntiSpamFilter::evaluate(&state, &s, &config, t0());
        assert_eq!(first, second);
        assert_eq!(state, FilterState::default());
    }

    #[test]
    fn cooldown_boundaries() {
        // 15m STRONG cooldown is 15 minutes
        let config = FilterConfig::default();
        let mut state = FilterState::default();
        AntiSpamFilter::accept(&mut state, &signal(SignalStrength::Strong, 18.0), t0());

        let next = signal(SignalStrength::Strong, 10.0);
        let epsilon = Duration::seconds(1);
        match AntiSpamFilter::evaluate(&state, &next, &config, t0() + Duration::minutes(15) - epsilon) {
            FilterDecision::Suppress(SuppressReason::Cooldown { remaining }) => assert_eq!(remaining, epsilon),
            other => panic!("expected cooldown, got {:?}", other),
        }
        assert_eq!(
            AntiSpamFilter::evaluate(&state, &next, &config, t0() + Duration::minutes(15) + epsilon),
            FilterDecision::Accept
        );
    }

    #[test]
    fn cooldown_depends_on_strength() {
        let config = FilterConfig::default();
        let mut state = FilterState::default();
        AntiSpamFilter::accept(&mut state, &signal(SignalStrength::Strong, 18.0), t0());

        // WEAK waits 60 minutes on 15m
        let weak = signal(SignalStrength::Weak, 10.0);
        assert!(!AntiSpamFilter::evaluate(&state, &weak, &config, t0() + Duration::minutes(30)).is_accept());
        assert!(AntiSpamFilter::evaluate(&state, &weak, &config, t0() + Duration::minutes(61)).is_accept());
    }

    #[test]
    fn rsi_must_move_enough() {
        let config = no_cooldown();
        let mut state = FilterState::default();
        AntiSpamFilter::accept(&mut state, &signal(SignalStrength::Moderate, 18.0), t0());

        let later = t0() + Duration::minutes(1);
        assert!(matches!(
            AntiSpamFilter::evaluate(&state, &signal(SignalStrength::Moderate, 19.5), &config, later),
            FilterDecision::Suppress(SuppressReason::RsiTooClose { .. })
        ));
        assert!(AntiSpamFilter::evaluate(&state, &signal(SignalStrength::Moderate, 16.0), &config, later).is_accept());
    }

    #[test]
    fn rsi_memory_expires_after_a_day() {
        let config = no_cooldown();
        let mut state = FilterState::default();
        AntiSpamFilter::accept(&mut state, &signal(SignalStrength::Moderate, 18.0), t0());

        let close_rsi = signal(SignalStrength::Moderate, 18.5);
        assert!(matches!(
            AntiSpamFilter::evaluate(&state, &close_rsi, &config, t0() + Duration::hours(23)),
            FilterDecision::Suppress(SuppressReason::RsiTooClose { .. })
        ));
        assert!(AntiSpamFilter::evaluate(&state, &close_rsi, &config, t0() + Duration::hours(24)).is_accept());
        assert!(AntiSpamFilter::evaluate(&state, &close_rsi, &config, t0() + Duration::days(7)).is_accept());
    }

    #[test]
    fn cooldown_is_reported_before_rsi() {
        let mut state = FilterState::default();
        AntiSpamFilter::accept(&mut state, &signal(SignalStrength::Strong, 18.0), t0());
        assert!(matches!(
            AntiSpamFilter::evaluate(&state, &signal(SignalStrength::Strong, 18.0), &FilterConfig::default(), t0()),
            FilterDecision::Suppress(SuppressReason::Cooldown { .. })
        ));
    }

    #[test]
    fn daily_cap_and_rollover() {
        let config = no_cooldown();
        let mut state = FilterState::default();
        let mut now = t0();
        for i in 0..3 {
            let s = signal(SignalStrength::Moderate, 10.0 + 5.0 * i as f64);
            assert_eq!(AntiSpamFilter::apply(&mut state, &s, &config, now), FilterDecision::Accept);
            now += Duration::minutes(1);
        }
        assert_eq!(state.signals_today, 3);

        let fourth = signal(SignalStrength::Moderate, 40.0);
        assert_eq!(
            AntiSpamFilter::apply(&mut state, &fourth, &config, now),
            FilterDecision::Suppress(SuppressReason::DailyCap { limit: 3 })
        );
        assert_eq!(state.signals_today, 3);

        let tomorrow = Utc.with_ymd_and_hms(2024, 5, 7, 0, 5, 0).unwrap();
        assert_eq!(AntiSpamFilter::apply(&mut state, &fourth, &config, tomorrow), FilterDecision::Accept);
        assert_eq!(state.signals_today, 1);
        assert_eq!(state.day_boundary, Some(tomorrow.date_naive()));
    }

    #[test]
    fn strong_cap_is_separate() {
        let config = no_cooldown();
        let mut state = FilterState::default();
        AntiSpamFilter::apply(&mut state, &signal(SignalStrength::Strong, 10.0), &config, t0());
        AntiSpamFilter::apply(&mut state, &signal(SignalStrength::Strong, 15.0), &config, t0());
        assert_eq!(state.strong_signals_today, 2);

        assert_eq!(
            AntiSpamFilter::evaluate(&state, &signal(SignalStrength::Strong, 20.0), &config, t0()),
            FilterDecision::Suppress(SuppressReason::StrongDailyCap { limit: 2 })
        );
        // A moderate signal still fits under the overall cap of 3
        assert!(AntiSpamFilter::evaluate(&state, &signal(SignalStrength::Moderate, 20.0), &config, t0()).is_accept());
    }
}
