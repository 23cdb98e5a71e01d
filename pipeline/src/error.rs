use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

/// A normalized value fell outside its sanity band.
///
/// Carries enough context to debug heuristic drift against the live pages.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{source_name}/{concept}: {reason} (raw={raw:?})")]
pub struct ValidationError {
    pub source_name: String,
    pub concept: String,
    pub raw: String,
    pub reason: String,
}

impl ValidationError {
    pub fn out_of_band(
        source_name: &str,
        concept: impl ToString,
        raw: &str,
        value: Decimal,
        band: (Decimal, Decimal),
    ) -> Self {
        Self {
            source_name: source_name.to_string(),
            concept: concept.to_string(),
            raw: raw.to_string(),
            reason: format!("{value} outside ({}, {})", band.0, band.1),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed json in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A cycle did not finish before its deadline; its fetches were abandoned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("ingestion cycle exceeded its {0:?} deadline")]
pub struct CycleTimeout(pub Duration);
