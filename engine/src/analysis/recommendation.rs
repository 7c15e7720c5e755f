// Presentation helpers attached to accepted signals: risk level, summary message and trade levels
use shared::models::{
    Candle, ConfluenceScore, RiskLevel, Signal, SignalQuality, SignalStrength, SignalType, TimeFrame, TradeLevels,
};

const DEFAULT_VOLATILITY_PCT: f64 = 3.0;
const VOLATILITY_WINDOW: usize = 20;

pub fn risk_level(score_percentage: f64) -> RiskLevel {
    if score_percentage >= 80.0 {
        RiskLevel::Low
    } else if score_percentage >= 60.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// e.g. "BUY STRONG - score 7/8"
pub fn message(signal: &Signal) -> String {
    format!(
        "{} {} - score {}/{}",
        signal.signal_type, signal.strength, signal.confluence.total_score, signal.confluence.max_possible_score
    )
}

/// Standard deviation of close-to-close returns over the last candles, in percent.
pub fn volatility_pct(candles: &[Candle]) -> f64 {
    let start = candles.len().saturating_sub(VOLATILITY_WINDOW + 1);
    let returns: Vec<f64> = candles[start..]
        .windows(2)
        .filter(|w| w[0].close > 0.0)
        .map(|w| (w[1].close - w[0].close) / w[0].close * 100.0)
        .collect();
    if returns.len() < 2 {
        return DEFAULT_VOLATILITY_PCT;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
    variance.sqrt()
}

fn base_target_pct(timeframe: TimeFrame) -> f64 {
    match timeframe {
        TimeFrame::Minute15 => 2.0,
        TimeFrame::Hour1 => 4.0,
        TimeFrame::Hour4 => 6.0,
        TimeFrame::Day1 => 10.0,
        _ => 3.0,
    }
}

fn strength_multiplier(strength: SignalStrength) -> f64 {
    match strength {
        SignalStrength::Strong => 2.0,
        SignalStrength::Moderate => 1.5,
        SignalStrength::Weak | SignalStrength::None => 1.0,
    }
}

/// Percent of capital to commit: by strength, nudged by risk/reward and volatility, kept in 0.5..=5.
pub fn position_size_pct(strength: SignalStrength, risk_reward_ratio: Option<f64>, volatility_pct: f64) -> f64 {
    let mut size: f64 = match strength {
        SignalStrength::Strong => 3.0,
        SignalStrength::Moderate => 2.0,
        SignalStrength::Weak | SignalStrength::None => 1.0,
    };
    match risk_reward_ratio {
        Some(rr) if rr >= 3.0 => size *= 1.2,
        Some(rr) if rr < 1.5 => size *= 0.7,
        _ => {}
    }
    if volatility_pct > 8.0 {
        size *= 0.5;
    } else if volatility_pct < 2.0 {
        size *= 1.2;
    }
    (size.clamp(0.5, 5.0) * 10.0).round() / 10.0
}

pub fn signal_quality(
    strength: SignalStrength,
    risk_reward_ratio: Option<f64>,
    confluence: &ConfluenceScore,
) -> SignalQuality {
    let mut points: i32 = match strength {
        SignalStrength::Strong => 3,
        SignalStrength::Moderate => 2,
        SignalStrength::Weak | SignalStrength::None => 1,
    };
    points += match risk_reward_ratio {
        Some(rr) if rr >= 3.0 => 3,
        Some(rr) if rr >= 2.0 => 2,
        Some(rr) if rr >= 1.5 => 1,
        _ => 0,
    };
    let confirming = confluence.breakdown.iter().filter(|r| r.score > 0).count() as i32;
    points += (confirming - 1).min(2);

    match points {
        p if p >= 7 => SignalQuality::Excellent,
        p if p >= 5 => SignalQuality::Good,
        p if p >= 3 => SignalQuality::Fair,
        _ => SignalQuality::Poor,
    }
}

/// Entry, stop and target for a directional signal. The stop sits beyond the medium EMA,
/// then the slow EMA, then a plain percentage of price when no EMA is known.
pub fn trade_levels(
    signal: &Signal,
    medium_ema: Option<f64>,
    slow_ema: Option<f64>,
    volatility_pct: f64,
) -> Option<TradeLevels> {
    let side = match signal.signal_type {
        SignalType::Buy => -1.0,
        SignalType::Sell => 1.0,
        SignalType::None => return None,
    };
    let price = signal.price;
    if price <= 0.0 {
        return None;
    }

    let stop_loss = match (medium_ema, slow_ema) {
        (Some(ema), _) => ema * (1.0 + side * (volatility_pct * 0.6).clamp(1.0, 3.0) / 100.0),
        (None, Some(ema)) => ema * (1.0 + side * (volatility_pct * 0.8).clamp(2.0, 4.0) / 100.0),
        (None, None) => price * (1.0 + side * volatility_pct.clamp(2.0, 5.0) / 100.0),
    };

    let target_pct = base_target_pct(signal.timeframe)
        * strength_multiplier(signal.strength)
        * (volatility_pct / DEFAULT_VOLATILITY_PCT).clamp(0.5, 2.0);
    let take_profit = price * (1.0 - side * target_pct / 100.0);

    let risk = (price - stop_loss) * -side;
    let reward = (take_profit - price) * -side;
    let risk_reward_ratio = if risk > 0.0 { Some(reward / risk) } else { None };

    Some(TradeLevels {
        entry_price: price,
        stop_loss,
        take_profit,
        risk_reward_ratio,
        position_size_pct: position_size_pct(signal.strength, risk_reward_ratio, volatility_pct),
        signal_quality: signal_quality(signal.strength, risk_reward_ratio, &signal.confluence),
    })
}
