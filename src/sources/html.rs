// src/sources/html.rs
//! Minimal table reader for bank rate pages.
//!
//! Supports selectors that are a descendant chain of tag names ("table tr",
//! "table tbody tr"). Each selected row is returned as its `td` cell texts, in
//! document order. Same-name nesting (a table inside a table) is not resolved.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::sources::types::RawRateRow;

fn block_regex(tag: &str) -> Option<Regex> {
    let tag = regex::escape(&tag.to_ascii_lowercase());
    Regex::new(&format!(r"(?is)<{tag}\b[^>]*>(.*?)</{tag}\s*>")).ok()
}

/// Inner markup of every `<tag>...</tag>` block in `s`.
fn inner_blocks<'a>(s: &'a str, re: &Regex) -> Vec<&'a str> {
    re.captures_iter(s)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Roughly what a browser's `innerText` gives for a cell.
pub fn cell_text(markup: &str) -> String {
    static RE_BR: OnceCell<Regex> = OnceCell::new();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_br = RE_BR.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("br regex"));
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)<[^>]*>").expect("tag regex"));
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("ws regex"));

    let out = re_br.replace_all(markup, " ");
    let out = re_tags.replace_all(&out, "");
    let out = html_escape::decode_html_entities(&out);
    // &nbsp; decodes to U+00A0, which `\s` covers in Unicode mode
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Rows matched by `selector`, each reduced to its `td` texts.
pub fn select_rows(markup: &str, selector: &str) -> Vec<RawRateRow> {
    static RE_TD: OnceCell<Regex> = OnceCell::new();
    let re_td = RE_TD.get_or_init(|| block_regex("td").expect("td regex"));

    let chain: Vec<&str> = selector.split_whitespace().collect();
    let Some((row_tag, scopes)) = chain.split_last() else {
        return Vec::new();
    };

    let mut regions: Vec<&str> = vec![markup];
    for tag in scopes {
        let Some(re) = block_regex(tag) else {
            return Vec::new();
        };
        regions = regions
            .into_iter()
            .flat_map(|r| inner_blocks(r, &re))
            .collect();
    }

    let Some(re_row) = block_regex(row_tag) else {
        return Vec::new();
    };
    regions
        .into_iter()
        .flat_map(|r| inner_blocks(r, &re_row))
        .map(|row| RawRateRow {
            cells: inner_blocks(row, re_td).into_iter().map(cell_text).collect(),
        })
        .collect()
}
