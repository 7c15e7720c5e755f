// Signal classifier: confluence score + RSI zone -> signal type and strength
use super::confluence::RsiZone;
use crate::config::ConfluenceThresholds;
use serde::Serialize;
use shared::models::{ConfluenceScore, SignalStrength, SignalType, TimeFrame};
use tracing::debug;

pub const STRONG_PERCENTAGE: f64 = 75.0;
pub const MODERATE_PERCENTAGE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub signal_type: SignalType,
    pub strength: SignalStrength,
}

impl Classification {
    pub const NO_SIGNAL: Classification = Classification {
        signal_type: SignalType::None,
        strength: SignalStrength::None,
    };

    pub fn is_signal(&self) -> bool {
        self.signal_type.is_directional()
    }
}

pub struct SignalClassifier;

impl SignalClassifier {
    /// Pure function of its inputs. Anything that is not an RSI zone hit with enough
    /// confluence is `NO_SIGNAL`.
    pub fn classify(
        score: &ConfluenceScore,
        zone: RsiZone,
        timeframe: TimeFrame,
        thresholds: &ConfluenceThresholds,
    ) -> Classification {
        if score.max_possible_score == 0 {
            debug!(%timeframe, "no indicators could be scored");
            return Classification::NO_SIGNAL;
        }
        let min_score = thresholds.min_score(timeframe);
        if min_score == 0 {
            debug!(%timeframe, "min_score of 0 is not a valid threshold");
            return Classification::NO_SIGNAL;
        }

        let signal_type = match zone {
            RsiZone::Oversold if score.total_score >= min_score => SignalType::Buy,
            RsiZone::Overbought if score.total_score >= min_score => SignalType::Sell,
            _ => return Classification::NO_SIGNAL,
        };

        Classification {
            signal_type,
            strength: Self::strength_for(score.score_percentage),
        }
    }

    pub fn strength_for(percentage: f64) -> SignalStrength {
        if percentage >= STRONG_PERCENTAGE {
            SignalStrength::Strong
        } else if percentage >= MODERATE_PERCENTAGE {
            SignalStrength::Moderate
        } else {
            SignalStrength::Weak
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{Direction, IndicatorResult};
    use std::collections::BTreeMap;

    fn score(total: u32, max: u32) -> ConfluenceScore {
        // Split into single-point results so totals stay derived from the breakdown
        let breakdown = (0..max)
            .map(|i| IndicatorResult {
                name: format!("I{}", i),
                score: u32::from(i < total),
                max_score: 1,
                raw_values: BTreeMap::new(),
                is_contributing: i < total,
                reason: String::new(),
            })
            .collect();
        ConfluenceScore::from_breakdown(Direction::Bullish, breakdown)
    }

    #[test]
    fn oversold_with_enough_score_is_buy() {
        let thresholds = ConfluenceThresholds::default();
        let c = SignalClassifier::classify(&score(7, 8), RsiZone::Oversold, TimeFrame::Minute15, &thresholds);
        assert_eq!(c.signal_type, SignalType::Buy);
        assert_eq!(c.strength, SignalStrength::Strong);
    }

    #[test]
    fn overbought_with_enough_score_is_sell() {
        let thresholds = ConfluenceThresholds::default();
        let c = SignalClassifier::classify(&score(5, 8), RsiZone::Overbought, TimeFrame::Hour4, &thresholds);
        assert_eq!(c.signal_type, SignalType::Sell);
        assert_eq!(c.strength, SignalStrength::Moderate);
    }

    #[test]
    fn below_min_score_is_no_signal() {
        let thresholds = ConfluenceThresholds::default();
        // 4 is enough on 15m but not on 4h
        let s = score(4, 8);
        assert!(SignalClassifier::classify(&s, RsiZone::Oversold, TimeFrame::Minute15, &thresholds).is_signal());
        assert_eq!(
            SignalClassifier::classify(&s, RsiZone::Oversold, TimeFrame::Hour4, &thresholds),
            Classification::NO_SIGNAL
        );
    }

    #[test]
    fn neutral_zone_never_signals() {
        let thresholds = ConfluenceThresholds::default();
        assert_eq!(
            SignalClassifier::classify(&score(8, 8), RsiZone::Neutral, TimeFrame::Minute15, &thresholds),
            Classification::NO_SIGNAL
        );
    }

    #[test]
    fn strength_buckets() {
        assert_eq!(SignalClassifier::strength_for(87.5), SignalStrength::Strong);
        assert_eq!(SignalClassifier::strength_for(75.0), SignalStrength::Strong);
        assert_eq!(SignalClassifier::strength_for(74.9), SignalStrength::Moderate);
        assert_eq!(SignalClassifier::strength_for(50.0), SignalStrength::Moderate);
        assert_eq!(SignalClassifier::strength_for(49.9), SignalStrength::Weak);

        let thresholds = ConfluenceThresholds {
            default_min_score: 2,
            timeframes: BTreeMap::new(),
        };
        let c = SignalClassifier::classify(&score(2, 8), RsiZone::Oversold, TimeFrame::Hour1, &thresholds);
        assert_eq!(c.strength, SignalStrength::Weak);
    }

    #[test]
    fn invalid_inputs_short_circuit() {
        let thresholds = ConfluenceThresholds::default();
        assert_eq!(
            SignalClassifier::classify(&score(0, 0), RsiZone::Oversold, TimeFrame::Minute15, &thresholds),
            Classification::NO_SIGNAL
        );

        let zero = ConfluenceThresholds {
            default_min_score: 0,
            timeframes: BTreeMap::new(),
        };
        assert_eq!(
            SignalClassifier::classify(&score(8, 8), RsiZone::Oversold, TimeFrame::Minute15, &zero),
            Classification::NO_SIGNAL
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let thresholds = ConfluenceThresholds::default();
        let s = score(6, 8);
        let first = SignalClassifier::classify(&s, RsiZone::Overbought, TimeFrame::Hour1, &thresholds);
        for _ in 0..10 {
            assert_eq!(SignalClassifier::classify(&s, RsiZone::Overbought, TimeFrame::Hour1, &thresholds), first);
        }
    }
}
