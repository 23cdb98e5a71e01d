use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metal {
    Copper,
    Tin,
    Zinc,
    Aluminium,
    Nickel,
    Lead,
}

impl fmt::Display for Metal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Metal::Copper => "copper",
            Metal::Tin => "tin",
            Metal::Zinc => "zinc",
            Metal::Aluminium => "aluminium",
            Metal::Nickel => "nickel",
            Metal::Lead => "lead",
        };
        f.write_str(s)
    }
}

/// Where a metal quote came from. Also the pricing basis it feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetalSource {
    /// Live exchange quote board.
    Lme,
    /// Previous-day reference close.
    Westmetall,
}

impl MetalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetalSource::Lme => "LME",
            MetalSource::Westmetall => "Westmetall",
        }
    }
}

impl fmt::Display for MetalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One metal row, immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetalQuote {
    /// Row label as published (`LME銅`, `Copper`, …).
    pub name: String,
    /// `None` when the label matched no alias; still reported to consumers.
    pub metal: Option<Metal>,
    /// USD/ton. For the reference close this is the cash settlement.
    pub last_price: Decimal,
    pub change: Option<Decimal>,
    pub change_percent: Option<Decimal>,
    pub three_month_price: Option<Decimal>,
    /// Trading day the source says the price belongs to.
    pub as_of: Option<NaiveDate>,
    pub captured_at: DateTime<Utc>,
    pub source: MetalSource,
}

/// Spot quote for one currency against the local currency.
///
/// `mid_rate` is always `(spot_bid + spot_ask) / 2` as computed by
/// [`FxQuote::new`]; a mid published by the source is never used.
/// Construction fails only when the sum overflows `Decimal`.
/// `spot_bid <= spot_ask` is expected but not enforced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FxQuote {
    pub currency_code: String,
    pub spot_bid: Decimal,
    pub spot_ask: Decimal,
    pub mid_rate: Decimal,
    pub as_of: Option<NaiveDate>,
    pub captured_at: DateTime<Utc>,
    pub source: String,
}

impl FxQuote {
    pub fn new(
        currency_code: impl Into<String>,
        spot_bid: Decimal,
        spot_ask: Decimal,
        source: impl Into<String>,
        captured_at: DateTime<Utc>,
    ) -> Option<Self> {
        let mid_rate = spot_bid.checked_add(spot_ask)? / Decimal::TWO;
        Some(Self {
            currency_code: currency_code.into(),
            spot_bid,
            spot_ask,
            mid_rate,
            as_of: None,
            captured_at,
            source: source.into(),
        })
    }

    pub fn with_as_of(mut self, as_of: Option<NaiveDate>) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn is_crossed(&self) -> bool {
        self.spot_bid > self.spot_ask
    }
}
