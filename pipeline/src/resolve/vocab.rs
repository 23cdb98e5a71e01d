//! Vocabulary tables: the only place source-specific header wording lives.
//!
//! A site renaming a column is a vocabulary update, not a code change. The
//! whole table can be replaced at startup from JSON (`VOCABULARY_PATH`).

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::market::Metal;
use crate::normalize::SanityBand;

/// A logical field the resolver can locate in a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concept {
    Currency,
    SpotBuy,
    SpotSell,
    MetalName,
    LastPrice,
    Change,
    ChangePercent,
    CashSettlement,
    ThreeMonth,
}

impl Concept {
    pub fn as_str(&self) -> &'static str {
        match self {
            Concept::Currency => "currency",
            Concept::SpotBuy => "spot_buy",
            Concept::SpotSell => "spot_sell",
            Concept::MetalName => "metal_name",
            Concept::LastPrice => "last_price",
            Concept::Change => "change",
            Concept::ChangePercent => "change_percent",
            Concept::CashSettlement => "cash_settlement",
            Concept::ThreeMonth => "three_month",
        }
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one concept is recognised.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptTerms {
    /// Header wording that names the concept outright.
    pub terms: Vec<String>,

    /// Sub-header labels shared by several blocks (`本行買入` under both cash
    /// and spot). Only used together with `plausible_range`.
    #[serde(default)]
    pub sub_labels: Vec<String>,

    /// Values of the right column all fall inside this open interval.
    #[serde(default)]
    pub plausible_range: Option<SanityBand>,
}

impl ConceptTerms {
    fn of(terms: &[&str]) -> Self {
        Self {
            terms: terms.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn with_plausible(mut self, sub_labels: &[&str], min: Decimal, max: Decimal) -> Self {
        self.sub_labels = sub_labels.iter().map(|s| s.to_string()).collect();
        self.plausible_range = Some(SanityBand::new(min, max));
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub concepts: HashMap<Concept, ConceptTerms>,

    /// Row-label aliases per metal, matched whitespace-insensitively.
    pub metals: Vec<(Metal, Vec<String>)>,
}

impl Vocabulary {
    pub fn terms(&self, concept: Concept) -> Option<&ConceptTerms> {
        self.concepts.get(&concept)
    }

    /// Match keys of every term that names some other concept.
    pub fn rival_keys(&self, concept: Concept) -> Vec<String> {
        self.concepts
            .iter()
            .filter(|(c, _)| **c != concept)
            .flat_map(|(_, t)| t.terms.iter().map(|s| match_key(s)))
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// Which metal a quote row label refers to. First alias hit wins.
    ///
    /// ASCII aliases must match a whole word (`tin` must not hit `Platinum`);
    /// CJK aliases match anywhere in the whitespace-stripped label.
    pub fn metal_for(&self, label: &str) -> Option<Metal> {
        let key = match_key(label);
        if key.is_empty() {
            return None;
        }
        let lower = label.to_lowercase();
        let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).collect();

        self.metals.iter().find_map(|(metal, aliases)| {
            aliases
                .iter()
                .any(|alias| {
                    if alias.is_ascii() {
                        let alias = alias.to_ascii_lowercase();
                        words.iter().any(|w| *w == alias)
                    } else {
                        let alias = match_key(alias);
                        !alias.is_empty() && key.contains(&alias)
                    }
                })
                .then_some(*metal)
        })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        let concepts = HashMap::from([
            (Concept::Currency, ConceptTerms::of(&["幣別", "币别", "currency"])),
            (
                Concept::SpotBuy,
                ConceptTerms::of(&["即期買入", "即期买入", "spot buy", "spot buying"])
                    .with_plausible(&["本行買入", "本行买入", "bank buy", "buying"], dec!(0.1), dec!(100)),
            ),
            (
                Concept::SpotSell,
                ConceptTerms::of(&["即期賣出", "即期卖出", "spot sell", "spot selling"])
                    .with_plausible(&["本行賣出", "本行卖出", "bank sell", "selling"], dec!(0.1), dec!(100)),
            ),
            (
                Concept::MetalName,
                ConceptTerms::of(&["名稱", "名称", "品種", "品种", "金屬", "金属", "metal", "name"]),
            ),
            (
                Concept::LastPrice,
                ConceptTerms::of(&["最新價", "最新价", "last", "last price"]),
            ),
            (Concept::Change, ConceptTerms::of(&["漲跌", "涨跌", "change", "chg"])),
            (
                Concept::ChangePercent,
                ConceptTerms::of(&["漲跌幅", "涨跌幅", "change %", "% change", "chg%"]),
            ),
            (
                Concept::CashSettlement,
                ConceptTerms::of(&["settlement kasse", "cash settlement", "settlement", "現貨結算"]),
            ),
            (
                Concept::ThreeMonth,
                ConceptTerms::of(&["3 months", "3-month", "three months", "三個月", "三个月"]),
            ),
        ]);

        let metal = |m: Metal, aliases: &[&str]| (m, aliases.iter().map(|s| s.to_string()).collect());
        let metals = vec![
            metal(Metal::Copper, &["LME銅", "LME铜", "copper", "銅", "铜"]),
            metal(Metal::Tin, &["LME錫", "LME锡", "tin", "錫", "锡"]),
            metal(Metal::Zinc, &["LME鋅", "LME锌", "zinc", "鋅", "锌"]),
            metal(Metal::Aluminium, &["LME鋁", "LME铝", "aluminium", "aluminum", "鋁", "铝"]),
            metal(Metal::Nickel, &["LME鎳", "LME镍", "nickel", "鎳", "镍"]),
            metal(Metal::Lead, &["LME鉛", "LME铅", "lead", "鉛", "铅"]),
        ];

        Self { concepts, metals }
    }
}

/// Comparison key: lowercase with all whitespace removed, so `Spot Buy`,
/// `spot  buy` and `spotbuy` compare equal.
pub fn match_key(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metals_match_bilingual_row_labels() {
        let v = Vocabulary::default();
        assert_eq!(v.metal_for("LME 銅"), Some(Metal::Copper));
        assert_eq!(v.metal_for("LME铜"), Some(Metal::Copper));
        assert_eq!(v.metal_for("Copper"), Some(Metal::Copper));
        assert_eq!(v.metal_for("LME锡"), Some(Metal::Tin));
        assert_eq!(v.metal_for("Zinc"), Some(Metal::Zinc));
        assert_eq!(v.metal_for("Aluminium Alloy"), Some(Metal::Aluminium));
        assert_eq!(v.metal_for("COMEX Gold"), None);
        assert_eq!(v.metal_for("Platinum"), None);
        assert_eq!(v.metal_for("   "), None);
    }

    #[test]
    fn vocabulary_round_trips_through_json() {
        let v = Vocabulary::default();
        let json = serde_json::to_string(&v).unwrap();
        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn partial_json_defaults_optional_fields() {
        let json = r#"{
            "concepts": { "last_price": { "terms": ["Kurs"] } },
            "metals": [["copper", ["Kupfer"]]]
        }"#;
        let v: Vocabulary = serde_json::from_str(json).unwrap();
        let t = v.terms(Concept::LastPrice).unwrap();
        assert_eq!(t.terms, vec!["Kurs"]);
        assert!(t.sub_labels.is_empty());
        assert!(t.plausible_range.is_none());
        assert_eq!(v.metal_for("Kupfer"), Some(Metal::Copper));
    }
}
