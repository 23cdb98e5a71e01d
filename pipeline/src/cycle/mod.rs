mod ingest;
pub mod pipeline;
pub mod snapshot;

use crate::config::AppConfig;
use crate::market::{METAL_PRICE_BAND, MID_RATE_BAND};
use crate::normalize::SanityBand;

pub use pipeline::Pipeline;
pub use snapshot::{CycleSnapshot, CycleStatus, SourceStatus};

/// Per-cycle knobs shared by every source task.
#[derive(Clone, Debug)]
pub struct CycleSettings {
    pub pricing_currency: String,
    pub local_currency: String,
    pub mid_rate_band: SanityBand,
    pub metal_price_band: SanityBand,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            pricing_currency: "USD".to_string(),
            local_currency: "TWD".to_string(),
            mid_rate_band: MID_RATE_BAND,
            metal_price_band: METAL_PRICE_BAND,
        }
    }
}

impl From<&AppConfig> for CycleSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            pricing_currency: cfg.pricing_currency.clone(),
            local_currency: cfg.local_currency.clone(),
            mid_rate_band: cfg.mid_rate_band,
            metal_price_band: cfg.metal_price_band,
        }
    }
}
