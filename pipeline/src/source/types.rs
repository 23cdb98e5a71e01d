use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resolve::Concept;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Live metal quote board.
    MetalQuotes,
    /// Bank FX rate board.
    FxRates,
    /// Previous-day metal reference close.
    ReferenceClose,
}

/// One configured source. Loaded once at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    pub url: String,

    /// Concepts the source is expected to carry; missing ones are logged.
    #[serde(default)]
    pub expected_concepts: Vec<Concept>,

    /// Text right before the published date, e.g. `掛牌日期`.
    #[serde(default)]
    pub as_of_marker: Option<String>,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, kind: SourceKind, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            url: url.into(),
            expected_concepts: Vec::new(),
            as_of_marker: None,
        }
    }

    pub fn expecting(mut self, concepts: &[Concept]) -> Self {
        self.expected_concepts = concepts.to_vec();
        self
    }

    pub fn with_as_of_marker(mut self, marker: impl Into<String>) -> Self {
        self.as_of_marker = Some(marker.into());
        self
    }
}

/// Response body of one successful fetch.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDocument {
    pub source_name: String,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

impl RawDocument {
    pub fn new(source_name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            body: body.into(),
            fetched_at: crate::time::now(),
        }
    }
}
