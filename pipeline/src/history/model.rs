use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of the price ledger. `(date, item)` is unique; a later write for
/// the same key replaces the earlier one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub date: NaiveDate,
    pub item: String,
    pub price: Decimal,
    pub currency: String,
    pub source: String,
}

impl HistoryRecord {
    pub fn key(&self) -> (NaiveDate, &str) {
        (self.date, self.item.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub replaced: usize,
}

impl UpsertSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.replaced
    }
}

impl std::ops::AddAssign for UpsertSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.inserted += rhs.inserted;
        self.replaced += rhs.replaced;
    }
}
