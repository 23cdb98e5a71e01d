use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::history::UpsertSummary;
use crate::market::{FxQuote, MetalQuote, MetalSource};
use crate::pricing::CompositeOutcome;
use crate::source::SourceKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Every source was fetched and parsed.
    Complete,
    /// At least one source failed, at least one succeeded.
    Partial,
    /// Nothing usable this cycle.
    AllSourcesFailed,
}

impl CycleStatus {
    pub fn from_counts(ok: usize, total: usize) -> Self {
        if ok == 0 {
            CycleStatus::AllSourcesFailed
        } else if ok == total {
            CycleStatus::Complete
        } else {
            CycleStatus::Partial
        }
    }
}

/// Outcome of one source this cycle. `ok` means fetched and parsed; a
/// source can be `ok` and still yield no quotes when its columns could not
/// be resolved (`detail` says so).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub kind: SourceKind,
    pub ok: bool,
    pub error: Option<String>,
    pub detail: Option<String>,
    pub quotes: usize,
    pub as_of: Option<NaiveDate>,
}

impl SourceStatus {
    pub fn failed(name: &str, kind: SourceKind, error: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            kind,
            ok: false,
            error: Some(error.to_string()),
            detail: None,
            quotes: 0,
            as_of: None,
        }
    }
}

/// Everything one cycle produced. A plain value; nothing is cached between
/// cycles.
#[derive(Clone, Debug, Serialize)]
pub struct CycleSnapshot {
    pub trace_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceStatus>,
    pub metal_quotes: Vec<MetalQuote>,
    pub fx_quotes: Vec<FxQuote>,
    /// Mid rate of the pricing currency, when it was resolved.
    pub mid_rate: Option<Decimal>,
    pub composites: Vec<CompositeOutcome>,
    pub status: CycleStatus,
    pub recorded: Option<UpsertSummary>,
    pub history_error: Option<String>,
}

impl CycleSnapshot {
    pub fn source(&self, name: &str) -> Option<&SourceStatus> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn fx(&self, currency_code: &str) -> Option<&FxQuote> {
        self.fx_quotes.iter().find(|q| q.currency_code == currency_code)
    }

    pub fn composite(&self, alloy: &str, basis: MetalSource) -> Option<&CompositeOutcome> {
        self.composites
            .iter()
            .find(|c| c.alloy() == alloy && c.basis_source() == basis)
    }

    pub fn available_composites(&self) -> usize {
        self.composites.iter().filter(|c| c.available().is_some()).count()
    }
}
