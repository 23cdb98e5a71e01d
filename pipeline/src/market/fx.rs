use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

use super::ParsedTable;
use super::types::FxQuote;
use crate::error::ValidationError;
use crate::normalize::{SanityBand, currency_code, to_decimal};
use crate::resolve::{ColumnResolver, Concept};
use crate::table::RawTable;

/// Local currency per unit of foreign currency.
pub const MID_RATE_BAND: SanityBand = SanityBand::new(dec!(0), dec!(1000));

#[derive(Clone, Debug)]
pub struct FxContext<'a> {
    pub source_name: &'a str,
    pub as_of: Option<NaiveDate>,
    pub captured_at: DateTime<Utc>,
    pub mid_band: SanityBand,
}

fn log_rejection(e: &ValidationError) {
    warn!(
        source = %e.source_name,
        concept = %e.concept,
        raw = %e.raw,
        reason = %e.reason,
        "validation rejected fx rate"
    );
}

/// Spot quotes for every currency row in one table.
///
/// `None` when currency, spot-buy or spot-sell cannot be located. Rows that
/// carry no spot quote (cash-only currencies) are skipped silently.
pub fn parse_fx_quotes(
    table: &RawTable,
    resolver: &ColumnResolver,
    ctx: &FxContext<'_>,
) -> Option<ParsedTable<FxQuote>> {
    let currency = resolver.column(table, Concept::Currency)?;
    let buy = resolver.column(table, Concept::SpotBuy)?;
    let sell = resolver.column(table, Concept::SpotSell)?;
    if buy == sell {
        debug!(source = ctx.source_name, column = buy, "spot buy and sell resolved to one column");
        return None;
    }

    let mut out = Vec::new();
    let mut rejected = 0;
    for row in &table.rows {
        let Some(code) = row.get(currency).and_then(|c| currency_code(c)) else {
            continue;
        };
        let cell = |col: usize| row.get(col).map(String::as_str).unwrap_or_default();
        let (bid_raw, ask_raw) = (cell(buy), cell(sell));
        let (Some(bid), Some(ask)) = (to_decimal(bid_raw), to_decimal(ask_raw)) else {
            debug!(source = ctx.source_name, currency = %code, "no spot quote");
            continue;
        };

        if let Err(e) = positive(ctx.source_name, Concept::SpotBuy, bid_raw, bid)
            .and_then(|_| positive(ctx.source_name, Concept::SpotSell, ask_raw, ask))
        {
            log_rejection(&e);
            rejected += 1;
            continue;
        }

        let raw = format!("{bid_raw} / {ask_raw}");
        let Some(quote) = FxQuote::new(code, bid, ask, ctx.source_name, ctx.captured_at) else {
            log_rejection(&ValidationError {
                source_name: ctx.source_name.to_string(),
                concept: "mid_rate".to_string(),
                raw,
                reason: "bid + ask overflows".to_string(),
            });
            rejected += 1;
            continue;
        };
        let quote = quote.with_as_of(ctx.as_of);
        if let Err(e) = ctx.mid_band.check(ctx.source_name, "mid_rate", &raw, quote.mid_rate) {
            log_rejection(&e);
            rejected += 1;
            continue;
        }
        if quote.is_crossed() {
            warn!(
                source = ctx.source_name,
                currency = %quote.currency_code,
                bid = %quote.spot_bid,
                ask = %quote.spot_ask,
                "spot bid above ask"
            );
        }
        out.push(quote);
    }

    debug!(source = ctx.source_name, quotes = out.len(), rejected, "fx table parsed");
    Some(ParsedTable {
        quotes: out,
        rejected,
    })
}

fn positive(source: &str, concept: Concept, raw: &str, v: Decimal) -> Result<Decimal, ValidationError> {
    if v > Decimal::ZERO {
        Ok(v)
    } else {
        Err(ValidationError {
            source_name: source.to_string(),
            concept: concept.to_string(),
            raw: raw.to_string(),
            reason: "rate must be positive".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::resolve::Vocabulary;
    use crate::table::HeaderCell;

    fn ctx() -> FxContext<'static> {
        FxContext {
            source_name: "bot",
            as_of: NaiveDate::from_ymd_opt(2025, 6, 26),
            captured_at: Utc::now(),
            mid_band: MID_RATE_BAND,
        }
    }

    fn bot_table(rows: &[[&str; 5]]) -> RawTable {
        RawTable {
            headers: vec![
                HeaderCell::new("幣別"),
                HeaderCell::grouped("現金匯率", "本行買入"),
                HeaderCell::grouped("現金匯率", "本行賣出"),
                HeaderCell::grouped("即期匯率", "本行買入"),
                HeaderCell::grouped("即期匯率", "本行賣出"),
            ],
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    fn resolver() -> ColumnResolver {
        ColumnResolver::new(Arc::new(Vocabulary::default()))
    }

    #[test]
    fn spot_quotes_for_every_currency() {
        let t = bot_table(&[
            ["美金 (USD)", "31.35", "32.02", "31.70", "31.80"],
            ["日圓 (JPY)", "0.2085", "0.2213", "0.2160", "0.2200"],
            ["印尼幣 (IDR)", "0.00169", "0.00239", "-", "-"],
        ]);
        let quotes = parse_fx_quotes(&t, &resolver(), &ctx()).unwrap().quotes;
        assert_eq!(quotes.len(), 2);

        let usd = &quotes[0];
        assert_eq!(usd.currency_code, "USD");
        assert_eq!(usd.spot_bid, dec!(31.70));
        assert_eq!(usd.spot_ask, dec!(31.80));
        assert_eq!(usd.mid_rate, dec!(31.75));
        assert_eq!(usd.as_of, NaiveDate::from_ymd_opt(2025, 6, 26));
        assert_eq!(usd.source, "bot");

        assert_eq!(quotes[1].currency_code, "JPY");
    }

    #[test]
    fn missing_spot_block_is_unresolved() {
        let t = RawTable {
            headers: vec![HeaderCell::new("幣別"), HeaderCell::new("現金買入")],
            rows: vec![vec!["美金 (USD)".into(), "31.35".into()]],
        };
        assert!(parse_fx_quotes(&t, &resolver(), &ctx()).is_none());
    }

    #[tracing_test::traced_test]
    #[test]
    fn crossed_quote_is_kept_with_a_warning() {
        let t = bot_table(&[
            ["美金 (USD)", "31.35", "32.02", "31.90", "31.80"],
            ["印尼幣 (IDR)", "0.00169", "0.00239", "-", "-"],
        ]);
        let quotes = parse_fx_quotes(&t, &resolver(), &ctx()).unwrap().quotes;
        assert_eq!(quotes.len(), 1);
        assert!(quotes[0].is_crossed());
        assert!(logs_contain("spot bid above ask"));
    }

    #[tracing_test::traced_test]
    #[test]
    fn non_positive_rate_is_rejected_with_context() {
        let t = RawTable {
            headers: vec![
                HeaderCell::new("幣別"),
                HeaderCell::new("即期買入"),
                HeaderCell::new("即期賣出"),
            ],
            rows: vec![
                vec!["美金 (USD)".into(), "31.70".into(), "31.80".into()],
                vec!["歐元 (EUR)".into(), "0".into(), "34.10".into()],
            ],
        };
        let quotes = parse_fx_quotes(&t, &resolver(), &ctx()).unwrap().quotes;
        assert_eq!(quotes.len(), 1);
        assert!(logs_contain("validation rejected fx rate"));
        assert!(logs_contain("concept=spot_buy"));
    }

    #[tracing_test::traced_test]
    #[test]
    fn overflowing_rates_are_rejected_not_fatal() {
        let huge = "79228162514264337593543950335";
        let t = RawTable {
            headers: vec![
                HeaderCell::new("幣別"),
                HeaderCell::new("即期買入"),
                HeaderCell::new("即期賣出"),
            ],
            rows: vec![
                vec!["美金 (USD)".into(), "31.70".into(), "31.80".into()],
                vec!["日圓 (JPY)".into(), huge.into(), huge.into()],
            ],
        };
        let parsed = parse_fx_quotes(&t, &resolver(), &ctx()).unwrap();
        assert_eq!(parsed.quotes.len(), 1);
        assert_eq!(parsed.quotes[0].currency_code, "USD");
        assert_eq!(parsed.rejected, 1);
        assert!(logs_contain("concept=mid_rate"));
        assert!(logs_contain("bid + ask overflows"));
    }
}
