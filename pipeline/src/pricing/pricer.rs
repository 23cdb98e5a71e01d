use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::debug;

use super::formula::{AlloyFormula, PriceField, QuoteUnit};
use crate::market::{Metal, MetalQuote, MetalSource};

const KG_PER_TON: Decimal = dec!(1000);

/// Inputs a composite was computed from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PriceBasis {
    pub source: MetalSource,
    /// USD/ton of every metal the formula uses.
    pub metals: BTreeMap<Metal, Decimal>,
    pub mid_rate: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompositePrice {
    pub alloy_name: String,
    pub history_item: String,
    pub price_usd_per_ton: Decimal,
    pub price_local_per_kg: Decimal,
    /// `price_local_per_kg` or `price_usd_per_ton`, per `quote_unit`.
    pub quoted_price: Decimal,
    pub quote_unit: QuoteUnit,
    pub basis: PriceBasis,
    pub computed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompositeOutcome {
    Available(CompositePrice),
    Unavailable {
        alloy: String,
        basis_source: MetalSource,
        reason: String,
    },
}

impl CompositeOutcome {
    pub fn alloy(&self) -> &str {
        match self {
            CompositeOutcome::Available(p) => &p.alloy_name,
            CompositeOutcome::Unavailable { alloy, .. } => alloy,
        }
    }

    pub fn basis_source(&self) -> MetalSource {
        match self {
            CompositeOutcome::Available(p) => p.basis.source,
            CompositeOutcome::Unavailable { basis_source, .. } => *basis_source,
        }
    }

    pub fn available(&self) -> Option<&CompositePrice> {
        match self {
            CompositeOutcome::Available(p) => Some(p),
            CompositeOutcome::Unavailable { .. } => None,
        }
    }
}

/// Weighted blends of metal quotes, converted through the mid rate.
///
/// A missing metal or mid rate makes the affected alloy unavailable; there
/// is never a zero or stale stand-in.
#[derive(Clone, Debug)]
pub struct CompositePricer {
    formulas: Vec<AlloyFormula>,
}

impl Default for CompositePricer {
    fn default() -> Self {
        Self::new(AlloyFormula::defaults())
    }
}

impl CompositePricer {
    pub fn new(formulas: Vec<AlloyFormula>) -> Self {
        Self { formulas }
    }

    pub fn formulas(&self) -> &[AlloyFormula] {
        &self.formulas
    }

    /// One outcome per formula, in formula order. Only quotes from `source`
    /// are used; the first quote per metal wins.
    pub fn price(
        &self,
        quotes: &[MetalQuote],
        source: MetalSource,
        mid_rate: Option<Decimal>,
        computed_at: DateTime<Utc>,
    ) -> Vec<CompositeOutcome> {
        let mut first: BTreeMap<Metal, &MetalQuote> = BTreeMap::new();
        for q in quotes.iter().filter(|q| q.source == source) {
            if let Some(metal) = q.metal {
                first.entry(metal).or_insert(q);
            }
        }

        self.formulas
            .iter()
            .map(|f| price_one(f, &first, source, mid_rate, computed_at))
            .collect()
    }
}

fn price_one(
    formula: &AlloyFormula,
    quotes: &BTreeMap<Metal, &MetalQuote>,
    source: MetalSource,
    mid_rate: Option<Decimal>,
    computed_at: DateTime<Utc>,
) -> CompositeOutcome {
    let unavailable = |reason: String| {
        debug!(alloy = %formula.name, %source, %reason, "composite unavailable");
        CompositeOutcome::Unavailable {
            alloy: formula.name.clone(),
            basis_source: source,
            reason,
        }
    };

    let Some(mid_rate) = mid_rate else {
        return unavailable("mid rate unavailable".to_string());
    };
    if formula.weights.is_empty() {
        return unavailable("formula has no constituents".to_string());
    }

    let field = formula.price_field(source);
    let mut used = BTreeMap::new();
    let mut usd_per_ton = Decimal::ZERO;
    for (metal, weight) in &formula.weights {
        let Some(quote) = quotes.get(metal) else {
            return unavailable(format!("no {metal} quote from {source}"));
        };
        let Some(price) = field.read(quote) else {
            return unavailable(format!("no {metal} 3-month quote from {source}"));
        };
        used.insert(*metal, price);
        usd_per_ton += price * *weight;
    }

    let local_per_kg = usd_per_ton / KG_PER_TON * mid_rate;
    let quoted_price = match formula.quote_unit {
        QuoteUnit::LocalPerKg => local_per_kg,
        QuoteUnit::UsdPerTon => usd_per_ton,
    };

    CompositeOutcome::Available(CompositePrice {
        alloy_name: formula.name.clone(),
        history_item: formula.history_item.clone(),
        price_usd_per_ton: usd_per_ton,
        price_local_per_kg: local_per_kg,
        quoted_price,
        quote_unit: formula.quote_unit,
        basis: PriceBasis {
            source,
            metals: used,
            mid_rate,
        },
        computed_at,
    })
}
