pub mod fx;
pub mod metals;
pub mod types;

pub use fx::{FxContext, MID_RATE_BAND, parse_fx_quotes};
pub use metals::{METAL_PRICE_BAND, MetalContext, parse_metal_quotes};
pub use types::{FxQuote, Metal, MetalQuote, MetalSource};

/// Quotes built from one table, plus how many rows failed validation.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedTable<T> {
    pub quotes: Vec<T>,
    pub rejected: usize,
}
