// Engine services built on top of the indicator, analysis and filter layers
pub mod signal_service;

pub use signal_service::{CycleReport, Delivery, PairOutcome, PairReport, SignalEngine};
