// Configuration module
pub mod filter;
pub mod indicators;
pub mod settings;
pub mod user;

pub use filter::{CooldownMinutes, FilterConfig, StrengthCooldowns};
pub use indicators::{
    ConfluenceThresholds, EmaParams, IndicatorParams, IndicatorSpec, IndicatorsConfig, MacdParams, RsiParams,
    VolumeParams,
};
pub use settings::EngineSettings;
pub use user::{load_user_configs, monitoring_universe, subscribers, UserMonitoringConfig};
