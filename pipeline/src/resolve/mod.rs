//! Locates the column that carries a concept, via an ordered chain of
//! matchers (exact label → substring label → numeric plausibility).
//!
//! A `None` result is a resolution failure: the concept is unavailable for
//! this cycle, nothing more.

pub mod strategy;
pub mod vocab;

use std::sync::Arc;

use tracing::debug;

use crate::table::RawTable;
pub use strategy::{DEFAULT_CHAIN, Strategy, StrategyTag};
pub use vocab::{Concept, ConceptTerms, Vocabulary};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub column: usize,
    pub strategy: StrategyTag,
}

#[derive(Clone)]
pub struct ColumnResolver {
    vocabulary: Arc<Vocabulary>,
    chain: Vec<Strategy>,
}

impl ColumnResolver {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self {
            vocabulary,
            chain: DEFAULT_CHAIN.to_vec(),
        }
    }

    /// Replace the matcher chain, e.g. to drop numeric plausibility for a
    /// source whose headers are unambiguous.
    pub fn with_chain(mut self, chain: Vec<Strategy>) -> Self {
        self.chain = chain;
        self
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn resolve(&self, table: &RawTable, concept: Concept) -> Option<Resolution> {
        let Some(terms) = self.vocabulary.terms(concept) else {
            debug!(%concept, "concept has no vocabulary entry");
            return None;
        };

        let rivals = self.vocabulary.rival_keys(concept);
        let hit = self.chain.iter().find_map(|s| {
            (s.run)(table, terms, &rivals).map(|column| Resolution {
                column,
                strategy: s.tag,
            })
        });

        match hit {
            Some(r) => debug!(%concept, column = r.column, strategy = ?r.strategy, "column resolved"),
            None => debug!(%concept, "no strategy matched"),
        }
        hit
    }

    pub fn column(&self, table: &RawTable, concept: Concept) -> Option<usize> {
        self.resolve(table, concept).map(|r| r.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::HeaderCell;

    fn resolver() -> ColumnResolver {
        ColumnResolver::new(Arc::new(Vocabulary::default()))
    }

    fn table(headers: Vec<HeaderCell>, rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers,
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    /// Cash block and spot block share sub-labels; the cash block holds
    /// sub-0.1 rates for IDR, the spot block has no IDR quote.
    fn fx_table(spot_first: bool) -> (RawTable, usize, usize) {
        let cash = [("現金匯率", "本行買入"), ("現金匯率", "本行賣出")];
        let spot = [("即期匯率", "本行買入"), ("即期匯率", "本行賣出")];
        let (first, second) = if spot_first { (spot, cash) } else { (cash, spot) };

        let mut headers = vec![HeaderCell::new("幣別")];
        headers.extend(first.iter().chain(second.iter()).map(|(g, l)| HeaderCell::grouped(*g, *l)));

        let usd = ["31.35", "32.02"];
        let usd_spot = ["31.70", "31.80"];
        let idr = ["0.00169", "0.00239"];
        let idr_spot = ["-", "-"];
        let row = |cur: &str, c: [&str; 2], s: [&str; 2]| -> Vec<String> {
            let (a, b) = if spot_first { (s, c) } else { (c, s) };
            std::iter::once(cur)
                .chain(a)
                .chain(b)
                .map(str::to_string)
                .collect()
        };

        let t = RawTable {
            headers,
            rows: vec![row("美金 (USD)", usd, usd_spot), row("印尼幣 (IDR)", idr, idr_spot)],
        };
        let spot_buy = if spot_first { 1 } else { 3 };
        (t, spot_buy, spot_buy + 1)
    }

    #[test]
    fn exact_label_wins_first() {
        let t = table(
            vec![HeaderCell::new("名稱"), HeaderCell::new("最新價"), HeaderCell::new("漲跌"), HeaderCell::new("漲跌幅")],
            &[&["LME銅", "8,500", "+20", "+0.24%"]],
        );
        let r = resolver();
        assert_eq!(
            r.resolve(&t, Concept::LastPrice),
            Some(Resolution { column: 1, strategy: StrategyTag::ExactLabel })
        );
        assert_eq!(r.column(&t, Concept::Change), Some(2));
        assert_eq!(r.column(&t, Concept::ChangePercent), Some(3));
        assert_eq!(r.column(&t, Concept::MetalName), Some(0));
    }

    #[test]
    fn substring_handles_decorated_headers() {
        let t = table(
            vec![HeaderCell::new("幣別"), HeaderCell::new("美金 (USD) 即期買入"), HeaderCell::new("美金 (USD) 即期賣出")],
            &[&["USD", "31.70", "31.80"]],
        );
        let r = resolver();
        assert_eq!(
            r.resolve(&t, Concept::SpotBuy),
            Some(Resolution { column: 1, strategy: StrategyTag::SubstringLabel })
        );
        assert_eq!(r.column(&t, Concept::SpotSell), Some(2));
    }

    #[test]
    fn substring_prefers_the_longest_term() {
        let t = table(
            vec![HeaderCell::new("品種"), HeaderCell::new("今日漲跌幅(%)"), HeaderCell::new("今日漲跌")],
            &[],
        );
        let r = resolver();
        assert_eq!(r.column(&t, Concept::ChangePercent), Some(1));
        assert_eq!(
            r.resolve(&t, Concept::Change),
            Some(Resolution { column: 2, strategy: StrategyTag::SubstringLabel })
        );

        let english = table(
            vec![HeaderCell::new("Metal"), HeaderCell::new("Change %"), HeaderCell::new("Net Change")],
            &[],
        );
        assert_eq!(r.column(&english, Concept::ChangePercent), Some(1));
        assert_eq!(r.column(&english, Concept::Change), Some(2));
    }

    #[test]
    fn numeric_plausibility_picks_spot_block_regardless_of_order() {
        for spot_first in [true, false] {
            let (t, spot_buy, spot_sell) = fx_table(spot_first);
            let r = resolver();
            assert_eq!(
                r.resolve(&t, Concept::SpotBuy),
                Some(Resolution { column: spot_buy, strategy: StrategyTag::NumericPlausibility }),
                "spot_first={spot_first}"
            );
            assert_eq!(r.column(&t, Concept::SpotSell), Some(spot_sell));
            assert_eq!(r.column(&t, Concept::Currency), Some(0));
        }
    }

    #[test]
    fn column_of_placeholders_is_not_plausible() {
        let t = table(
            vec![HeaderCell::grouped("即期匯率", "本行買入")],
            &[&["-"], &[""], &["暫停"]],
        );
        assert_eq!(resolver().column(&t, Concept::SpotBuy), None);
    }

    #[test]
    fn unknown_concept_wording_resolves_to_none() {
        let t = table(vec![HeaderCell::new("foo"), HeaderCell::new("bar")], &[&["1", "2"]]);
        let r = resolver();
        assert_eq!(r.resolve(&t, Concept::SpotBuy), None);
        assert_eq!(r.resolve(&t, Concept::ThreeMonth), None);
    }

    #[test]
    fn custom_chain_skips_heuristics() {
        let (t, _, _) = fx_table(true);
        let r = resolver().with_chain(vec![DEFAULT_CHAIN[0], DEFAULT_CHAIN[1]]);
        assert_eq!(r.column(&t, Concept::SpotBuy), None);
    }
}

#[cfg(test)]
mod proptests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::{ColumnResolver, Concept, Vocabulary};
    use crate::table::{HeaderCell, RawTable};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]
        /// Shuffling whole columns (header and values together) never changes
        /// which column is chosen, only its index.
        #[test]
        fn resolution_follows_the_values_not_the_position(
            order in Just((0..5usize).collect::<Vec<_>>()).prop_shuffle(),
            usd_spot in 28.0f64..35.0,
            idr_cash in 0.0001f64..0.08,
        ) {
            let headers = [
                HeaderCell::new("幣別"),
                HeaderCell::grouped("現金匯率", "本行買入"),
                HeaderCell::grouped("現金匯率", "本行賣出"),
                HeaderCell::grouped("即期匯率", "本行買入"),
                HeaderCell::grouped("即期匯率", "本行賣出"),
            ];
            let usd = [
                "美金 (USD)".to_string(),
                format!("{:.2}", usd_spot - 0.3),
                format!("{:.2}", usd_spot + 0.3),
                format!("{:.2}", usd_spot),
                format!("{:.2}", usd_spot + 0.1),
            ];
            let idr = [
                "印尼幣 (IDR)".to_string(),
                format!("{:.5}", idr_cash),
                format!("{:.5}", idr_cash * 1.2),
                "-".to_string(),
                "-".to_string(),
            ];

            let t = RawTable {
                headers: order.iter().map(|&i| headers[i].clone()).collect(),
                rows: vec![
                    order.iter().map(|&i| usd[i].clone()).collect(),
                    order.iter().map(|&i| idr[i].clone()).collect(),
                ],
            };

            let r = ColumnResolver::new(Arc::new(Vocabulary::default()));
            let buy = r.column(&t, Concept::SpotBuy).unwrap();
            let sell = r.column(&t, Concept::SpotSell).unwrap();
            prop_assert_eq!(order[buy], 3);
            prop_assert_eq!(order[sell], 4);
        }
    }
}
