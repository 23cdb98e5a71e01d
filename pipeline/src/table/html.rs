//! Minimal HTML tokenizer.
//!
//! Only what table extraction needs: element open/close tags with their raw
//! attribute text, and text runs. Comments, doctypes and the bodies of
//! `<script>`/`<style>` are skipped. Single pass, no backtracking.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Open { name: String, attrs: &'a str },
    Close { name: String },
    Text(&'a str),
}

const RAW_TEXT: [&str; 2] = ["script", "style"];

pub fn tokenize(src: &str) -> Vec<Token<'_>> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let Some(lt) = src[pos..].find('<').map(|i| i + pos) else {
            out.push(Token::Text(&src[pos..]));
            break;
        };
        if lt > pos {
            out.push(Token::Text(&src[pos..lt]));
        }

        let rest = &src[lt..];
        if rest.starts_with("<!--") {
            pos = match rest.find("-->") {
                Some(end) => lt + end + 3,
                None => bytes.len(),
            };
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            pos = skip_past_gt(src, lt);
            continue;
        }

        let closing = rest.starts_with("</");
        let name_start = lt + if closing { 2 } else { 1 };
        let name_end = src[name_start..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .map(|i| i + name_start)
            .unwrap_or(bytes.len());

        if !src[name_start..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            // A stray '<' in text.
            out.push(Token::Text(&src[lt..lt + 1]));
            pos = lt + 1;
            continue;
        }

        let name = src[name_start..name_end].to_ascii_lowercase();
        // An unterminated tag runs to the end of input.
        let (attrs_end, tag_end) = match find_gt(src, name_end) {
            Some(gt) => (gt, gt + 1),
            None => (bytes.len(), bytes.len()),
        };
        let attrs = src[name_end..attrs_end].trim_end_matches('/');

        if closing {
            out.push(Token::Close { name });
            pos = tag_end;
            continue;
        }

        let raw_text = RAW_TEXT.contains(&name.as_str());
        out.push(Token::Open { name: name.clone(), attrs });
        pos = tag_end;

        if raw_text {
            let close = format!("</{name}");
            let lower_rest = src[pos..].to_ascii_lowercase();
            pos = match lower_rest.find(&close) {
                Some(i) => {
                    out.push(Token::Close { name });
                    skip_past_gt(src, pos + i)
                }
                None => bytes.len(),
            };
        }
    }

    out
}

/// Index just past the next `>` at or after `from`, or the end of input.
fn skip_past_gt(src: &str, from: usize) -> usize {
    find_gt(src, from).map_or(src.len(), |gt| gt + 1)
}

/// Index of the next `>` at or after `from`, honouring quoted attribute
/// values.
fn find_gt(src: &str, from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in src.as_bytes()[from..].iter().enumerate() {
        match (quote, b) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(b),
            (None, b'>') => return Some(from + i),
            _ => {}
        }
    }
    None
}

/// Reads a small positive integer attribute (`colspan="2"`, `rowspan=3`).
pub fn attr_usize(attrs: &str, key: &str) -> Option<usize> {
    let lower = attrs.to_ascii_lowercase();
    let mut search = 0usize;
    while let Some(i) = lower[search..].find(key).map(|i| i + search) {
        let before_ok = i == 0 || {
            let b = lower.as_bytes()[i - 1];
            !(b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        };
        let after = lower[i + key.len()..].trim_start();
        if before_ok {
            if let Some(val) = after.strip_prefix('=') {
                let val = val.trim_start().trim_start_matches(['"', '\'']);
                let digits: String = val.chars().take_while(|c| c.is_ascii_digit()).collect();
                return digits.parse().ok();
            }
        }
        search = i + key.len();
    }
    None
}

/// Decodes the handful of entities these pages use, plus numeric references.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let semi = tail.bytes().take(12).position(|b| b == b';');
        let decoded = semi.and_then(|semi| decode_one(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_one(entity: &str) -> Option<char> {
    match entity {
        "nbsp" => Some(' '),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Collapses whitespace runs to a single space and trims.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

/// Visible text of a whole document (tags dropped, entities decoded).
pub fn document_text(src: &str) -> String {
    let mut out = String::new();
    for tok in tokenize(src) {
        match tok {
            Token::Text(t) => out.push_str(&decode_entities(t)),
            _ => out.push(' '),
        }
    }
    normalize_ws(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_tags_and_text() {
        let toks = tokenize(r#"<TD class="x" colspan=2>31.5</td>"#);
        assert_eq!(
            toks,
            vec![
                Token::Open { name: "td".into(), attrs: r#" class="x" colspan=2"# },
                Token::Text("31.5"),
                Token::Close { name: "td".into() },
            ]
        );
    }

    #[test]
    fn unterminated_tag_keeps_its_attrs_to_end_of_input() {
        let toks = tokenize("<table><tr><td class=銅");
        assert_eq!(toks.last(), Some(&Token::Open { name: "td".into(), attrs: " class=銅" }));

        let toks = tokenize("<td title=\"銅鋅");
        assert_eq!(toks, vec![Token::Open { name: "td".into(), attrs: " title=\"銅鋅" }]);
    }

    #[test]
    fn skips_comments_scripts_and_doctype() {
        let src = "<!DOCTYPE html><!-- <table> --><script>var t = '<table>';</script><p>ok</p>";
        let names: Vec<_> = tokenize(src)
            .into_iter()
            .filter_map(|t| match t {
                Token::Open { name, .. } => Some(name),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["script", "p"]);
    }

    #[test]
    fn quoted_gt_does_not_end_tag() {
        let toks = tokenize(r#"<td title="a>b">x</td>"#);
        assert_eq!(toks[1], Token::Text("x"));
    }

    #[test]
    fn reads_span_attributes() {
        assert_eq!(attr_usize(r#" colspan="2" class="a""#, "colspan"), Some(2));
        assert_eq!(attr_usize(" ROWSPAN = 3", "rowspan"), Some(3));
        assert_eq!(attr_usize(r#" data-colspan="9""#, "colspan"), None);
        assert_eq!(attr_usize(" class=x", "colspan"), None);
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(decode_entities("A&nbsp;&amp;&#36;1&#x41;"), "A &$1A");
        assert_eq!(decode_entities("R&D"), "R&D");
    }
}
