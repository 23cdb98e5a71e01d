//! Metal quote tables (live board and reference close) → `MetalQuote`s.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

use super::ParsedTable;
use super::types::{MetalQuote, MetalSource};
use crate::normalize::{SanityBand, to_decimal};
use crate::resolve::{ColumnResolver, Concept};
use crate::table::RawTable;

/// USD/ton. Anything at or outside this is a misread column.
pub const METAL_PRICE_BAND: SanityBand = SanityBand::new(dec!(0), dec!(1_000_000));

/// Per-table context shared by every row.
#[derive(Clone, Debug)]
pub struct MetalContext<'a> {
    pub source_name: &'a str,
    pub source: MetalSource,
    pub as_of: Option<NaiveDate>,
    pub captured_at: DateTime<Utc>,
    pub price_band: SanityBand,
}

impl MetalSource {
    /// Column holding the price that feeds composites.
    pub fn price_concept(&self) -> Concept {
        match self {
            MetalSource::Lme => Concept::LastPrice,
            MetalSource::Westmetall => Concept::CashSettlement,
        }
    }
}

#[derive(Debug, Default)]
struct Columns {
    label: usize,
    price: usize,
    change: Option<usize>,
    change_percent: Option<usize>,
    three_month: Option<usize>,
}

fn locate(table: &RawTable, resolver: &ColumnResolver, source: MetalSource) -> Option<Columns> {
    let price = resolver.column(table, source.price_concept())?;
    // Unlabelled first column is the usual row header.
    let label = resolver
        .column(table, Concept::MetalName)
        .filter(|&c| c != price)
        .unwrap_or(0);
    if label == price {
        return None;
    }

    let other = |concept| {
        resolver
            .column(table, concept)
            .filter(|&c| c != price && c != label)
    };
    let change_percent = other(Concept::ChangePercent);
    let change = other(Concept::Change).filter(|&c| Some(c) != change_percent);
    let three_month = other(Concept::ThreeMonth);

    Some(Columns {
        label,
        price,
        change,
        change_percent,
        three_month,
    })
}

/// Builds quotes from one table.
///
/// Returns `None` when the price column cannot be located, so the caller can
/// try the next table on the page. Rows with no parsable price are skipped;
/// rows whose price fails the sanity band are logged and skipped.
pub fn parse_metal_quotes(
    table: &RawTable,
    resolver: &ColumnResolver,
    ctx: &MetalContext<'_>,
) -> Option<ParsedTable<MetalQuote>> {
    let cols = locate(table, resolver, ctx.source)?;
    let concept = ctx.source.price_concept();
    let vocab = resolver.vocabulary();
    let optional = |row: &[String], col: Option<usize>| {
        col.and_then(|c| row.get(c)).and_then(|s| to_decimal(s))
    };

    let mut out = Vec::new();
    let mut rejected = 0;
    for row in &table.rows {
        let name = row.get(cols.label).map(|s| s.trim()).unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        let raw = row.get(cols.price).map(String::as_str).unwrap_or_default();
        let Some(value) = to_decimal(raw) else {
            debug!(source = ctx.source_name, row = name, raw, "no price in row");
            continue;
        };
        let last_price = match ctx.price_band.check(ctx.source_name, concept, raw, value) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    source = %e.source_name,
                    concept = %e.concept,
                    raw = %e.raw,
                    reason = %e.reason,
                    "validation rejected metal price"
                );
                rejected += 1;
                continue;
            }
        };

        let three_month_price = optional(row, cols.three_month)
            .filter(|v: &Decimal| ctx.price_band.contains(*v));

        out.push(MetalQuote {
            name: name.to_string(),
            metal: vocab.metal_for(name),
            last_price,
            change: optional(row, cols.change),
            change_percent: optional(row, cols.change_percent),
            three_month_price,
            as_of: ctx.as_of,
            captured_at: ctx.captured_at,
            source: ctx.source,
        });
    }

    debug!(source = ctx.source_name, quotes = out.len(), rejected, "metal table parsed");
    Some(ParsedTable {
        quotes: out,
        rejected,
    })
}
