//! Table assembly: token stream → row/column grid with spans expanded.

use super::html::{Token, attr_usize, decode_entities, normalize_ws};
use super::{HeaderCell, RawTable};

/// Upper bounds keep a hostile `colspan="100000"` from blowing up the grid.
const MAX_COLSPAN: usize = 64;
const MAX_ROWSPAN: usize = 512;

#[derive(Debug, Default)]
struct DraftCell {
    text: String,
    header: bool,
    colspan: usize,
    rowspan: usize,
}

#[derive(Debug, Default)]
struct DraftRow {
    cells: Vec<DraftCell>,
    in_thead: bool,
}

#[derive(Debug, Default)]
struct Draft {
    /// Document order of the opening `<table>` tag.
    order: usize,
    rows: Vec<DraftRow>,
    row: Option<DraftRow>,
    cell: Option<DraftCell>,
    in_thead: bool,
}

impl Draft {
    fn close_cell(&mut self) {
        if let Some(mut cell) = self.cell.take() {
            cell.text = normalize_ws(&cell.text);
            // <td> outside any <tr> opens an implicit row.
            let in_thead = self.in_thead;
            let row = self.row.get_or_insert_with(|| DraftRow {
                cells: Vec::new(),
                in_thead,
            });
            row.cells.push(cell);
        }
    }

    fn close_row(&mut self) {
        self.close_cell();
        if let Some(row) = self.row.take() {
            if !row.cells.is_empty() {
                self.rows.push(row);
            }
        }
    }
}

/// Builds every `<table>` in the token stream, nested ones included, in the
/// order their opening tags appear.
pub(super) fn build_tables(tokens: &[Token<'_>]) -> Vec<RawTable> {
    let mut stack: Vec<Draft> = Vec::new();
    let mut done: Vec<Draft> = Vec::new();
    let mut opened = 0usize;

    for tok in tokens {
        match tok {
            Token::Open { name, attrs } => match name.as_str() {
                "table" => {
                    stack.push(Draft {
                        order: opened,
                        ..Default::default()
                    });
                    opened += 1;
                }
                "thead" => {
                    if let Some(t) = stack.last_mut() {
                        t.close_row();
                        t.in_thead = true;
                    }
                }
                "tbody" | "tfoot" => {
                    if let Some(t) = stack.last_mut() {
                        t.close_row();
                        t.in_thead = false;
                    }
                }
                "tr" => {
                    if let Some(t) = stack.last_mut() {
                        t.close_row();
                        t.row = Some(DraftRow {
                            cells: Vec::new(),
                            in_thead: t.in_thead,
                        });
                    }
                }
                "td" | "th" => {
                    if let Some(t) = stack.last_mut() {
                        t.close_cell();
                        t.cell = Some(DraftCell {
                            text: String::new(),
                            header: name == "th",
                            colspan: attr_usize(attrs, "colspan").unwrap_or(1).clamp(1, MAX_COLSPAN),
                            rowspan: attr_usize(attrs, "rowspan").unwrap_or(1).clamp(1, MAX_ROWSPAN),
                        });
                    }
                }
                "br" | "div" | "p" | "span" => push_text(&mut stack, " "),
                _ => {}
            },
            Token::Close { name } => match name.as_str() {
                "table" => {
                    if let Some(mut t) = stack.pop() {
                        t.close_row();
                        done.push(t);
                    }
                }
                "thead" => {
                    if let Some(t) = stack.last_mut() {
                        t.close_row();
                        t.in_thead = false;
                    }
                }
                "tr" => {
                    if let Some(t) = stack.last_mut() {
                        t.close_row();
                    }
                }
                "td" | "th" => {
                    if let Some(t) = stack.last_mut() {
                        t.close_cell();
                    }
                }
                "div" | "p" | "span" => push_text(&mut stack, " "),
                _ => {}
            },
            Token::Text(text) => push_text(&mut stack, &decode_entities(text)),
        }
    }

    // Unterminated tables still count.
    while let Some(mut t) = stack.pop() {
        t.close_row();
        done.push(t);
    }

    done.sort_by_key(|d| d.order);
    done.into_iter()
        .filter(|d| !d.rows.is_empty())
        .map(layout)
        .collect()
}

fn push_text(stack: &mut [Draft], text: &str) {
    if let Some(cell) = stack.last_mut().and_then(|t| t.cell.as_mut()) {
        cell.text.push_str(text);
    }
}

#[derive(Clone, Debug, Default)]
struct Slot {
    text: String,
    header: bool,
    filled: bool,
}

/// Expands row/col spans into a rectangular grid, then splits header rows
/// from data rows.
fn layout(draft: Draft) -> RawTable {
    let n_rows = draft.rows.len();
    let mut grid: Vec<Vec<Slot>> = vec![Vec::new(); n_rows];

    for (r, row) in draft.rows.iter().enumerate() {
        let mut c = 0usize;
        for cell in &row.cells {
            while grid[r].get(c).is_some_and(|s| s.filled) {
                c += 1;
            }
            let last_row = (r + cell.rowspan).min(n_rows);
            for target in grid.iter_mut().take(last_row).skip(r) {
                if target.len() < c + cell.colspan {
                    target.resize(c + cell.colspan, Slot::default());
                }
                for slot in &mut target[c..c + cell.colspan] {
                    *slot = Slot {
                        text: cell.text.clone(),
                        header: cell.header,
                        filled: true,
                    };
                }
            }
            c += cell.colspan;
        }
    }

    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut grid {
        row.resize(width, Slot::default());
    }

    let header_rows = count_header_rows(&draft.rows, &grid);
    let headers = (0..width)
        .map(|col| header_for_column(&grid[..header_rows], col))
        .collect();

    let rows = grid
        .into_iter()
        .skip(header_rows)
        .map(|row| row.into_iter().map(|s| s.text).collect())
        .collect();

    RawTable { headers, rows }
}

/// Leading rows that are in `<thead>` or made only of `<th>` cells. With no
/// marked header, the first row is the header.
fn count_header_rows(rows: &[DraftRow], grid: &[Vec<Slot>]) -> usize {
    let marked = rows
        .iter()
        .zip(grid)
        .take_while(|(draft, slots)| {
            draft.in_thead
                || (slots.iter().any(|s| s.header)
                    && slots.iter().all(|s| s.header || s.text.is_empty()))
        })
        .count();

    if marked == 0 { 1.min(rows.len()) } else { marked }
}

/// The last header row is the label. Earlier rows form the group, unless they
/// only repeat the label through a rowspan.
fn header_for_column(header_rows: &[Vec<Slot>], col: usize) -> HeaderCell {
    let Some((last, upper)) = header_rows.split_last() else {
        return HeaderCell::default();
    };
    let label = last[col].text.clone();

    let mut parts: Vec<&str> = Vec::new();
    for row in upper {
        let text = row[col].text.as_str();
        if !text.is_empty() && text != label && !parts.contains(&text) {
            parts.push(text);
        }
    }

    HeaderCell {
        group: (!parts.is_empty()).then(|| parts.join(" ")),
        label,
    }
}
