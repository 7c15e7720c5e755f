// Per-user monitoring configuration and the system-wide universe derived from it
use super::{FilterConfig, IndicatorsConfig};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use shared::models::TimeFrame;
use std::collections::BTreeSet;
use std::path::Path;

fn default_config_name() -> String {
    "default".to_string()
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMonitoringConfig {
    pub user_id: i64,
    #[serde(default = "default_config_name")]
    pub config_name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub symbols: BTreeSet<String>,
    #[serde(default)]
    pub timeframes: BTreeSet<TimeFrame>,
    #[serde(default)]
    pub indicators_config: Option<IndicatorsConfig>,
    #[serde(default)]
    pub filter_config: Option<FilterConfig>,
}

impl UserMonitoringConfig {
    /// Upper-cased symbols.
    pub fn normalized_symbols(&self) -> BTreeSet<String> {
        self.symbols.iter().map(|s| s.trim().to_uppercase()).filter(|s| !s.is_empty()).collect()
    }

    /// Configured timeframes, `15m` when none are set.
    pub fn effective_timeframes(&self) -> BTreeSet<TimeFrame> {
        if self.timeframes.is_empty() {
            BTreeSet::from([TimeFrame::Minute15])
        } else {
            self.timeframes.clone()
        }
    }

    pub fn monitors(&self, symbol: &str, timeframe: TimeFrame) -> bool {
        self.active
            && self.effective_timeframes().contains(&timeframe)
            && self.normalized_symbols().contains(&symbol.to_uppercase())
    }
}

pub fn load_user_configs(path: impl AsRef<Path>) -> Result<Vec<UserMonitoringConfig>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Every (symbol, timeframe) pair some active user monitors, ordered and de-duplicated.
pub fn monitoring_universe(configs: &[UserMonitoringConfig]) -> BTreeSet<(String, TimeFrame)> {
    configs
        .iter()
        .filter(|c| c.active)
        .flat_map(|c| {
            let timeframes = c.effective_timeframes();
            c.normalized_symbols()
                .into_iter()
                .flat_map(move |symbol| timeframes.clone().into_iter().map(move |tf| (symbol.clone(), tf)))
        })
        .collect()
}

/// Active users monitoring one pair.
pub fn subscribers<'a>(
    configs: &'a [UserMonitoringConfig],
    symbol: &str,
    timeframe: TimeFrame,
) -> Vec<&'a UserMonitoringConfig> {
    configs.iter().filter(|c| c.monitors(symbol, timeframe)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn user(user_id: i64, symbols: &[&str], timeframes: &[TimeFrame]) -> UserMonitoringConfig {
        UserMonitoringConfig {
            user_id,
            config_name: default_config_name(),
            active: true,
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            timeframes: timeframes.iter().copied().collect(),
            indicators_config: None,
            filter_config: None,
        }
    }

    #[test]
    fn universe_is_union_of_active_users() {
        let mut inactive = user(3, &["DOGEUSDT"], &[TimeFrame::Hour1]);
        inactive.active = false;
        let configs = vec![
            user(1, &["btcusdt", "ETHUSDT"], &[TimeFrame::Minute15, TimeFrame::Hour1]),
            user(2, &["BTCUSDT"], &[]),
            inactive,
        ];

        let universe: Vec<_> = monitoring_universe(&configs).into_iter().collect();
        assert_eq!(
            universe,
            vec![
                ("BTCUSDT".to_string(), TimeFrame::Minute15),
                ("BTCUSDT".to_string(), TimeFrame::Hour1),
                ("ETHUSDT".to_string(), TimeFrame::Minute15),
                ("ETHUSDT".to_string(), TimeFrame::Hour1),
            ]
        );
    }

    #[test]
    fn subscribers_filter_by_pair() {
        let configs = vec![
            user(1, &["BTCUSDT"], &[TimeFrame::Hour1]),
            user(2, &["BTCUSDT"], &[]),
            user(3, &["ETHUSDT"], &[TimeFrame::Minute15]),
        ];
        let ids: Vec<i64> = subscribers(&configs, "BTCUSDT", TimeFrame::Minute15)
            .iter()
            .map(|c| c.user_id)
            .collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn loads_users_from_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"[
                {{"user_id": 42, "symbols": ["BTCUSDT"], "timeframes": ["15m", "4h"],
                  "filter_config": {{"cooldown_minutes": 30, "max_signals_per_day": 5}}}},
                {{"user_id": 7, "active": false}}
            ]"#
        )
        .unwrap();

        let configs = load_user_configs(file.path()).unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].config_name, "default");
        assert!(configs[0].monitors("btcusdt", TimeFrame::Hour4));
        assert_eq!(configs[0].filter_config.as_ref().unwrap().strong_cap(), 2);
        assert!(!configs[1].active);
        assert!(configs[1].symbols.is_empty());
    }
}
