// Confluence scoring and signal classification
pub mod classifier;
pub mod confluence;
pub mod recommendation;

pub use classifier::{Classification, SignalClassifier};
pub use confluence::{
    ConfluenceAnalysis, ConfluenceAnalyzer, IndicatorReadings, Reading, RsiReading, RsiZone,
};
