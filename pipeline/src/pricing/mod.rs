//! Composite alloy pricing. Pure functions over one cycle's quotes.

pub mod formula;
pub mod pricer;

pub use formula::{AlloyFormula, PriceField, QuoteUnit};
pub use pricer::{CompositeOutcome, CompositePrice, CompositePricer, PriceBasis};
