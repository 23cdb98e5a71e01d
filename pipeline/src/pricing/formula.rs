use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::market::{Metal, MetalQuote, MetalSource};

/// Which derived value is quoted and written to history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteUnit {
    /// Local currency per kg.
    LocalPerKg,
    /// USD per ton, unconverted.
    UsdPerTon,
}

/// Which price of a quote feeds a formula.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    /// Last trade on the live board, cash settlement on the reference close.
    #[default]
    Last,
    ThreeMonth,
}

impl PriceField {
    pub fn read(&self, quote: &MetalQuote) -> Option<Decimal> {
        match self {
            PriceField::Last => Some(quote.last_price),
            PriceField::ThreeMonth => quote.three_month_price,
        }
    }
}

/// A named blend: metal → weight. Weights are data, not code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlloyFormula {
    pub name: String,
    pub history_item: String,
    pub weights: BTreeMap<Metal, Decimal>,
    pub quote_unit: QuoteUnit,
    /// Per-basis overrides; any basis not listed reads [`PriceField::Last`].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub price_fields: BTreeMap<MetalSource, PriceField>,
}

impl AlloyFormula {
    pub fn new(
        name: impl Into<String>,
        history_item: impl Into<String>,
        weights: &[(Metal, Decimal)],
        quote_unit: QuoteUnit,
    ) -> Self {
        Self {
            name: name.into(),
            history_item: history_item.into(),
            weights: weights.iter().copied().collect(),
            quote_unit,
            price_fields: BTreeMap::new(),
        }
    }

    pub fn with_price_field(mut self, source: MetalSource, field: PriceField) -> Self {
        self.price_fields.insert(source, field);
        self
    }

    pub fn price_field(&self, source: MetalSource) -> PriceField {
        self.price_fields.get(&source).copied().unwrap_or_default()
    }

    pub fn defaults() -> Vec<Self> {
        use Metal::*;
        vec![
            Self::new(
                "phosphorBronze",
                "CSP磷",
                &[(Copper, dec!(0.94)), (Tin, dec!(0.06))],
                QuoteUnit::LocalPerKg,
            ),
            Self::new(
                "bronze",
                "CSP青",
                &[(Copper, dec!(0.65)), (Zinc, dec!(0.35))],
                QuoteUnit::LocalPerKg,
            ),
            Self::new("redCopper", "CSP紅", &[(Copper, dec!(1))], QuoteUnit::LocalPerKg),
            // The reference close passes tin and zinc through at 3 months.
            Self::new("tin", "CSP錫", &[(Tin, dec!(1))], QuoteUnit::UsdPerTon)
                .with_price_field(MetalSource::Westmetall, PriceField::ThreeMonth),
            Self::new("zinc", "CSP鋅", &[(Zinc, dec!(1))], QuoteUnit::UsdPerTon)
                .with_price_field(MetalSource::Westmetall, PriceField::ThreeMonth),
        ]
    }
}
