//! One source, start to finish: fetch → tables → quotes.
//!
//! Every failure ends here as a `SourceStatus`; nothing propagates to the
//! cycle.

use chrono::NaiveDate;
use common::annotate_source;
use tracing::{debug, info, warn};

use super::CycleSettings;
use super::snapshot::SourceStatus;
use crate::market::{
    FxContext, FxQuote, MetalContext, MetalQuote, MetalSource, ParsedTable, parse_fx_quotes,
    parse_metal_quotes,
};
use crate::normalize::extract_date;
use crate::resolve::ColumnResolver;
use crate::source::{Fetcher, RawDocument, SourceConfig, SourceKind};
use crate::table::{self, RawTable, html};

#[derive(Debug)]
pub(crate) struct SourceOutcome {
    pub status: SourceStatus,
    pub metal_quotes: Vec<MetalQuote>,
    pub fx_quotes: Vec<FxQuote>,
    pub rejected: usize,
    pub parse_failed: bool,
}

impl SourceOutcome {
    fn failed(status: SourceStatus, parse_failed: bool) -> Self {
        Self {
            status,
            metal_quotes: Vec::new(),
            fx_quotes: Vec::new(),
            rejected: 0,
            parse_failed,
        }
    }
}

impl SourceKind {
    pub fn metal_source(&self) -> Option<MetalSource> {
        match self {
            SourceKind::MetalQuotes => Some(MetalSource::Lme),
            SourceKind::ReferenceClose => Some(MetalSource::Westmetall),
            SourceKind::FxRates => None,
        }
    }
}

pub(crate) async fn ingest_source(
    fetcher: &dyn Fetcher,
    source: &SourceConfig,
    resolver: &ColumnResolver,
    settings: &CycleSettings,
) -> SourceOutcome {
    annotate_source(&source.name);

    let doc = match fetcher.fetch(source).await {
        Ok(doc) => doc,
        Err(e) => {
            warn!(source = %source.name, cause = %e.cause, "source fetch failed");
            return SourceOutcome::failed(SourceStatus::failed(&source.name, source.kind, &e), false);
        }
    };

    let tables = match table::extract_all(&doc) {
        Ok(t) => t,
        Err(e) => {
            warn!(source = %source.name, reason = e.reason(), bytes = doc.body.len(), "source parse failed");
            return SourceOutcome::failed(SourceStatus::failed(&source.name, source.kind, e.reason()), true);
        }
    };
    debug!(tables = tables.len(), "tables extracted");

    report_missing_concepts(source, &tables, resolver);

    let marker_date = marker_date(&doc, source);
    let mut status = SourceStatus {
        name: source.name.clone(),
        kind: source.kind,
        ok: true,
        error: None,
        detail: None,
        quotes: 0,
        as_of: marker_date,
    };
    let mut outcome = SourceOutcome::failed(status.clone(), false);

    match source.kind.metal_source() {
        Some(metal_source) => {
            let picked = first_usable(&tables, |t| {
                let ctx = MetalContext {
                    source_name: &source.name,
                    source: metal_source,
                    as_of: marker_date.or_else(|| extract_date(&t.header_text())),
                    captured_at: doc.fetched_at,
                    price_band: settings.metal_price_band,
                };
                parse_metal_quotes(t, resolver, &ctx)
            });
            if let Some(parsed) = picked {
                status.as_of = parsed.quotes.first().and_then(|q| q.as_of);
                outcome.rejected = parsed.rejected;
                outcome.metal_quotes = parsed.quotes;
            }
        }
        None => {
            let picked = first_usable(&tables, |t| {
                let ctx = FxContext {
                    source_name: &source.name,
                    as_of: marker_date,
                    captured_at: doc.fetched_at,
                    mid_band: settings.mid_rate_band,
                };
                parse_fx_quotes(t, resolver, &ctx)
            });
            if let Some(parsed) = picked {
                outcome.rejected = parsed.rejected;
                outcome.fx_quotes = parsed.quotes;
            }
        }
    }

    status.quotes = outcome.metal_quotes.len() + outcome.fx_quotes.len();
    if status.quotes == 0 {
        status.detail = Some("no table with the required columns".to_string());
        warn!(source = %source.name, "no usable quotes on page");
    } else {
        info!(source = %source.name, quotes = status.quotes, as_of = ?status.as_of, "source ingested");
    }
    outcome.status = status;
    outcome
}

/// First table that yields quotes; failing that, the first one whose
/// columns resolved at all.
fn first_usable<T, F>(tables: &[RawTable], mut parse: F) -> Option<ParsedTable<T>>
where
    F: FnMut(&RawTable) -> Option<ParsedTable<T>>,
{
    let mut fallback = None;
    for t in tables {
        match parse(t) {
            Some(p) if !p.quotes.is_empty() => return Some(p),
            Some(p) if fallback.is_none() => fallback = Some(p),
            _ => {}
        }
    }
    fallback
}

/// Date printed after the configured marker, e.g. `掛牌日期 2025/06/26 16:02`.
fn marker_date(doc: &RawDocument, source: &SourceConfig) -> Option<NaiveDate> {
    let marker = source.as_of_marker.as_deref()?;
    let text = html::document_text(&doc.body);
    let start = text.find(marker)? + marker.len();
    // The date sits right after the marker; don't wander into the table.
    let window: String = text[start..].chars().take(40).collect();
    extract_date(&window)
}

fn report_missing_concepts(source: &SourceConfig, tables: &[RawTable], resolver: &ColumnResolver) {
    for concept in &source.expected_concepts {
        if !tables.iter().any(|t| resolver.column(t, *concept).is_some()) {
            warn!(source = %source.name, %concept, "expected concept not found on page");
        }
    }
}
