//! Column matchers. Each one is a pure function with the same signature so
//! they can be chained, reordered and tested in isolation.

use serde::Serialize;

use super::vocab::{ConceptTerms, match_key};
use crate::normalize::to_decimal;
use crate::table::RawTable;

/// `rivals` holds the match keys of every other concept's terms.
pub type Matcher = fn(&RawTable, &ConceptTerms, &[String]) -> Option<usize>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyTag {
    ExactLabel,
    SubstringLabel,
    NumericPlausibility,
}

#[derive(Clone, Copy)]
pub struct Strategy {
    pub tag: StrategyTag,
    pub run: Matcher,
}

/// Tried in order; the first hit wins.
pub const DEFAULT_CHAIN: [Strategy; 3] = [
    Strategy {
        tag: StrategyTag::ExactLabel,
        run: exact_label,
    },
    Strategy {
        tag: StrategyTag::SubstringLabel,
        run: substring_label,
    },
    Strategy {
        tag: StrategyTag::NumericPlausibility,
        run: numeric_plausibility,
    },
];

/// Header label (or `group label`) equals a vocabulary term.
pub fn exact_label(table: &RawTable, terms: &ConceptTerms, _rivals: &[String]) -> Option<usize> {
    let keys: Vec<String> = terms.terms.iter().map(|t| match_key(t)).collect();
    table.headers.iter().position(|h| {
        let label = match_key(&h.label);
        let full = match_key(&h.text());
        keys.iter()
            .any(|k| !k.is_empty() && (*k == label || *k == full))
    })
}

/// Header text contains a vocabulary term (`美金 (USD) 即期買入`).
///
/// Longer terms are tried first. A header that holds a longer rival term
/// built around ours (`今日漲跌幅(%)` for `漲跌`) belongs to that rival.
pub fn substring_label(table: &RawTable, terms: &ConceptTerms, rivals: &[String]) -> Option<usize> {
    let mut keys: Vec<String> = terms
        .terms
        .iter()
        .map(|t| match_key(t))
        .filter(|k| !k.is_empty())
        .collect();
    keys.sort_by_key(|k| std::cmp::Reverse(k.chars().count()));

    let texts: Vec<String> = table.headers.iter().map(|h| match_key(&h.text())).collect();
    keys.iter().find_map(|k| {
        texts
            .iter()
            .position(|t| t.contains(k.as_str()) && !claimed_by_rival(t, k, rivals))
    })
}

fn claimed_by_rival(text: &str, key: &str, rivals: &[String]) -> bool {
    rivals
        .iter()
        .any(|r| r.len() > key.len() && r.contains(key) && text.contains(r.as_str()))
}

/// Among columns sharing an ambiguous sub-label, the first whose parsed
/// values all fall inside the concept's plausible range.
///
/// Cells that do not parse (`-`, blanks) are ignored, but at least one value
/// must parse.
pub fn numeric_plausibility(table: &RawTable, terms: &ConceptTerms, _rivals: &[String]) -> Option<usize> {
    let band = terms.plausible_range?;
    let labels: Vec<String> = terms
        .sub_labels
        .iter()
        .map(|t| match_key(t))
        .filter(|k| !k.is_empty())
        .collect();
    if labels.is_empty() {
        return None;
    }

    table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| labels.contains(&match_key(&h.label)))
        .map(|(idx, _)| idx)
        .find(|&idx| {
            let mut seen = 0usize;
            let all_inside = table.column(idx).filter_map(to_decimal).all(|v| {
                seen += 1;
                band.contains(v)
            });
            all_inside && seen > 0
        })
}
