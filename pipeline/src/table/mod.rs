//! Raw markup → ordered grid of header labels and string cells.
//!
//! The extractor establishes adjacency only; it never interprets what a
//! column means. Grouped headers (a category spanning several sub-columns)
//! are preserved per column as `HeaderCell { group, label }` so the
//! resolver can search both levels.

mod grid;
pub mod html;

use serde::Serialize;
use thiserror::Error;

use crate::source::RawDocument;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no-table")]
    NoTable,
}

impl ParseError {
    pub fn reason(&self) -> &'static str {
        match self {
            ParseError::NoTable => "no-table",
        }
    }
}

/// Header of one column. `group` is set for two-level headers,
/// e.g. `即期匯率` over `本行買入`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HeaderCell {
    pub group: Option<String>,
    pub label: String,
}

impl HeaderCell {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            group: None,
            label: label.into(),
        }
    }

    pub fn grouped(group: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            label: label.into(),
        }
    }

    /// Group and label joined, as a reader would see the column title.
    pub fn text(&self) -> String {
        match &self.group {
            Some(g) => format!("{g} {}", self.label),
            None => self.label.clone(),
        }
    }
}

/// Ephemeral grid; discarded once quotes are built from it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn is_grouped(&self) -> bool {
        self.headers.iter().any(|h| h.group.is_some())
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// All data cells of one column, top to bottom.
    pub fn column(&self, col: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .filter_map(move |r| r.get(col).map(String::as_str))
    }

    /// Every header string, for searching published dates and similar.
    pub fn header_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for h in &self.headers {
            let t = h.text();
            if !t.is_empty() && !parts.contains(&t) {
                parts.push(t);
            }
        }
        parts.join(" ")
    }
}

/// First table-like structure in the document.
pub fn extract(doc: &RawDocument) -> Result<RawTable, ParseError> {
    extract_all(doc)?.into_iter().next().ok_or(ParseError::NoTable)
}

/// Every non-empty table in document order.
pub fn extract_all(doc: &RawDocument) -> Result<Vec<RawTable>, ParseError> {
    let tokens = html::tokenize(&doc.body);
    let tables = grid::build_tables(&tokens);
    if tables.is_empty() {
        return Err(ParseError::NoTable);
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> RawDocument {
        RawDocument::new("test", body)
    }

    const BOT_LIKE: &str = r#"
<table title="牌告匯率">
  <thead>
    <tr>
      <th rowspan="2">幣別</th>
      <th colspan="2">現金匯率</th>
      <th colspan="2">即期匯率</th>
    </tr>
    <tr>
      <th>本行買入</th><th>本行賣出</th><th>本行買入</th><th>本行賣出</th>
    </tr>
  </thead>
  <tbody>
    <tr>
      <td><div class="hidden-phone">美金 (USD)</div></td>
      <td>31.35</td><td>32.02</td><td>31.70</td><td>31.80</td>
    </tr>
    <tr>
      <td>印尼幣 (IDR)</td>
      <td>0.00169</td><td>0.00239</td><td>-</td><td>-</td>
    </tr>
  </tbody>
</table>"#;

    #[test]
    fn grouped_header_keeps_both_levels() {
        let t = extract(&doc(BOT_LIKE)).unwrap();
        assert!(t.is_grouped());
        assert_eq!(t.width(), 5);
        assert_eq!(t.headers[0], HeaderCell::new("幣別"));
        assert_eq!(t.headers[1], HeaderCell::grouped("現金匯率", "本行買入"));
        assert_eq!(t.headers[4], HeaderCell::grouped("即期匯率", "本行賣出"));
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.cell(0, 0), Some("美金 (USD)"));
        assert_eq!(t.cell(0, 3), Some("31.70"));
        assert_eq!(t.cell(1, 4), Some("-"));
    }

    #[test]
    fn single_header_without_markup_uses_first_row() {
        let html = "<table><tr><td>名稱</td><td>最新價</td></tr><tr><td>LME銅</td><td>8,500</td></tr></table>";
        let t = extract(&doc(html)).unwrap();
        assert!(!t.is_grouped());
        assert_eq!(t.headers, vec![HeaderCell::new("名稱"), HeaderCell::new("最新價")]);
        assert_eq!(t.rows, vec![vec!["LME銅".to_string(), "8,500".to_string()]]);
    }

    #[test]
    fn ragged_rows_are_padded() {
        let html = "<table><tr><th>a</th><th>b</th><th>c</th></tr><tr><td>1</td></tr><tr><td>1</td><td>2</td><td>3</td><td>4</td></tr></table>";
        let t = extract(&doc(html)).unwrap();
        assert_eq!(t.width(), 4);
        assert_eq!(t.rows[0], vec!["1", "", "", ""]);
        assert_eq!(t.headers[3], HeaderCell::new(""));
    }

    #[test]
    fn unclosed_cells_and_rows_are_tolerated() {
        let html = "<table><tr><th>Metal<th>Price<tr><td>Copper<td>9,120.50</table>";
        let t = extract(&doc(html)).unwrap();
        assert_eq!(t.headers[1].label, "Price");
        assert_eq!(t.cell(0, 1), Some("9,120.50"));
    }

    #[test]
    fn nested_tables_are_separate_and_in_document_order() {
        let html = "<table><tr><th>outer</th></tr><tr><td><table><tr><th>inner</th></tr><tr><td>x</td></tr></table></td></tr></table>";
        let all = extract_all(&doc(html)).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].headers[0].label, "outer");
        assert_eq!(all[1].headers[0].label, "inner");
        assert_eq!(all[1].cell(0, 0), Some("x"));
    }

    #[test]
    fn no_table_is_a_parse_error() {
        let err = extract(&doc("<html><body><p>maintenance</p></body></html>")).unwrap_err();
        assert_eq!(err, ParseError::NoTable);
        assert_eq!(err.reason(), "no-table");
        assert_eq!(extract(&doc("")).unwrap_err(), ParseError::NoTable);
    }

    #[test]
    fn header_text_contains_published_date() {
        let html = "<table><tr><th>25. June 2025</th><th>Settlement Kasse</th><th>3 months</th></tr><tr><td>Copper</td><td>9,700.00</td><td>9,780.00</td></tr></table>";
        let t = extract(&doc(html)).unwrap();
        assert!(t.header_text().contains("25. June 2025"));
    }

    #[test]
    fn truncated_markup_inside_a_multibyte_attribute() {
        let html = "<table><tr><th>名稱</th><th>最新價</th></tr><tr><td>LME銅</td><td class=銅";
        let t = extract(&doc(html)).unwrap();
        assert_eq!(t.headers[0].label, "名稱");
        assert_eq!(t.cell(0, 0), Some("LME銅"));
    }
}
