// Engine library root

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod indicators;
pub mod services;

pub use error::{EngineError, Result};
