#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;

// --- re-exports ---

pub use config::{DatabaseSection, GeneralConfig, LogTriageConfig, SourceSection};
pub use error::{ConfigError, LogTriageError};
