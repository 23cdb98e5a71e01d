//! Cell text → typed values.
//!
//! Every function here returns `None` for cells that carry no value
//! (empty, `-`, `N/A`, …). Callers treat `None` as "unavailable", never as
//! a pipeline failure.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::ValidationError;

/// Longest first: `NT$` must be removed before the bare `$`.
const CURRENCY_SYMBOLS: [&str; 7] = ["NT$", "US$", "HK$", "RMB", "¥", "€", "$"];

const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d. %B %Y",
    "%d %B %Y",
    "%B %d, %Y",
];

/// Parses a numeric cell, stripping currency symbols, thousands separators,
/// percent signs and surrounding whitespace.
pub fn to_decimal(cell: &str) -> Option<Decimal> {
    let mut s = cell.trim().to_string();
    for sym in CURRENCY_SYMBOLS {
        if s.contains(sym) {
            s = s.replace(sym, "");
        }
    }

    let s: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '，' | '%') && !c.is_whitespace())
        .map(|c| if c == '−' { '-' } else { c })
        .collect();

    let s = s.strip_prefix('+').unwrap_or(&s);
    if s.is_empty() || s.chars().all(|c| c == '-') {
        return None;
    }

    Decimal::from_str(s).ok()
}

/// Parses a date cell. A trailing time-of-day (`2025/06/26 16:02`) is allowed
/// and ignored.
pub fn to_date(cell: &str) -> Option<NaiveDate> {
    let s = cell.trim();
    if s.is_empty() {
        return None;
    }

    DATE_FORMATS.iter().find_map(|fmt| {
        let (date, rest) = NaiveDate::parse_and_remainder(s, fmt).ok()?;
        (rest.is_empty() || rest.starts_with([' ', 'T'])).then_some(date)
    })
}

/// Finds the first date embedded anywhere in free text, e.g.
/// `掛牌日期：2025/06/26 16:02` or `LME closing 25. June 2025`.
///
/// Only positions that start a digit run are tried, so the cost is linear in
/// the number of digit runs times the number of formats.
pub fn extract_date(text: &str) -> Option<NaiveDate> {
    let mut prev_digit = false;
    for (idx, ch) in text.char_indices() {
        let digit = ch.is_ascii_digit();
        if digit && !prev_digit {
            let tail = &text[idx..];
            let hit = DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_and_remainder(tail, fmt).ok());
            if let Some((date, _)) = hit {
                return Some(date);
            }
        }
        prev_digit = digit;
    }
    None
}

/// First three letters of the first run of at least three uppercase ASCII
/// letters: `美金 (USD)` → `USD`, `USDT` → `USD`.
pub fn currency_code(cell: &str) -> Option<String> {
    let bytes = cell.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_uppercase() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_uppercase() {
                i += 1;
            }
            if i - start >= 3 {
                return Some(cell[start..start + 3].to_string());
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Open interval `(min, max)` a normalized value must fall inside.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SanityBand {
    pub min: Decimal,
    pub max: Decimal,
}

impl SanityBand {
    pub const fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, v: Decimal) -> bool {
        v > self.min && v < self.max
    }

    pub fn check(
        &self,
        source: &str,
        concept: impl ToString,
        raw: &str,
        value: Decimal,
    ) -> Result<Decimal, ValidationError> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(ValidationError::out_of_band(
                source,
                concept,
                raw,
                value,
                (self.min, self.max),
            ))
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]
        #[test]
        fn thousands_grouping_never_changes_the_value(
            int_part in 0u64..10_000_000_000,
            cents in 0u32..100,
            prefix in prop::sample::select(vec!["", "$", "NT$", "US$"]),
        ) {
            let mut grouped = String::new();
            let digits = int_part.to_string();
            for (i, ch) in digits.chars().enumerate() {
                if i > 0 && (digits.len() - i) % 3 == 0 {
                    grouped.push(',');
                }
                grouped.push(ch);
            }
            let cell = format!("{prefix}{grouped}.{cents:02}");
            let plain = Decimal::from_str(&format!("{int_part}.{cents:02}")).unwrap();
            prop_assert_eq!(to_decimal(&cell), Some(plain));
        }
    }
}
