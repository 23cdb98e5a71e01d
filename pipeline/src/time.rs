use chrono::{DateTime, Local, NaiveDate, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Calendar day used for history keys when a source publishes no date.
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}
