use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Insufficient data for {indicator}: need {required} candles, have {available}")]
    InsufficientData {
        indicator: String,
        required: usize,
        available: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Rate limited while fetching {0}")]
    RateLimited(String),

    #[error("Candle source unavailable: {0}")]
    Unavailable(String),

    #[error("CSV parsing system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("CSV data format error: {0}")]
    CsvDataFormatError(String),

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON error: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Filter state store error: {0}")]
    StateStoreError(String),
}

impl EngineError {
    pub fn insufficient(indicator: impl Into<String>, required: usize, available: usize) -> Self {
        EngineError::InsufficientData {
            indicator: indicator.into(),
            required,
            available,
        }
    }

    /// Errors that mean "no evaluation this cycle" for a pair rather than a defect.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::RateLimited(_) | EngineError::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message_names_the_indicator() {
        let err = EngineError::insufficient("RSI(14)", 15, 3);
        assert_eq!(err.to_string(), "Insufficient data for RSI(14): need 15 candles, have 3");
        assert!(!err.is_transient());
    }

    #[test]
    fn fetch_failures_are_transient() {
        assert!(EngineError::RateLimited("BTCUSDT 15m".into()).is_transient());
        assert!(EngineError::Unavailable("gate.io".into()).is_transient());
        assert!(!EngineError::InvalidConfiguration("x".into()).is_transient());
    }
}
