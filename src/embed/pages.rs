//! Page selection
//!
//! A block can ask for pages in several overlapping ways: a bare `page`
//! number, a `page` list whose items are numbers or inclusive `[from, to]`
//! pairs, or the older `range` field. All of them collapse into one ordered
//! list of 1-based page numbers. A `0` anywhere means the whole document.

use log::warn;
use serde_json::Value;

use super::parser::RawParameterBlock;

/// Upper bound on the number of pages a single block can expand to.
pub const MAX_EXPANDED_PAGES: usize = 10_000;

/// One item of a `page` list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageEntry {
    Single(i64),
    /// Inclusive on both ends
    Range(i64, i64),
}

impl PageEntry {
    /// Whether the entry asks for page 0, the whole-document sentinel.
    fn covers_zero(&self) -> bool {
        match *self {
            Self::Single(n) => n == 0,
            Self::Range(from, to) => from <= 0 && 0 <= to,
        }
    }
}

/// What the block asked for, before expansion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageSelector {
    /// Neither `page` nor `range` given
    Unspecified,
    Single(i64),
    List(Vec<PageEntry>),
    /// Legacy `range: [from, to]`
    Range(i64, i64),
}

impl PageSelector {
    /// Read the selector from a parsed block.
    ///
    /// A well-formed `range` wins over `page`. Malformed values are treated as
    /// absent rather than rejected.
    #[must_use]
    pub fn from_block(block: &RawParameterBlock) -> Self {
        if let Some(range) = block.get("range") {
            match as_pair(range) {
                Some((from, to)) => return Self::Range(from, to),
                None => warn!("Ignoring malformed range {range}"),
            }
        }

        match block.get("page") {
            None => Self::Unspecified,
            Some(value) => {
                if let Some(n) = as_page_number(value) {
                    return Self::Single(n);
                }
                match value {
                    Value::Array(items) => Self::List(items.iter().filter_map(as_entry).collect()),
                    other => {
                        warn!("Ignoring malformed page {other}");
                        Self::Unspecified
                    }
                }
            }
        }
    }

    /// Flatten into the ordered list of pages to render.
    ///
    /// `page_count` is only called when the whole document was requested;
    /// its error is handed back untouched.
    pub fn expand<E>(&self, page_count: impl FnOnce() -> Result<usize, E>) -> Result<Vec<usize>, E> {
        let entries = match self {
            Self::Unspecified => vec![PageEntry::Single(1)],
            Self::Single(n) => vec![PageEntry::Single(*n)],
            Self::Range(from, to) => vec![PageEntry::Range(*from, *to)],
            Self::List(entries) => entries.clone(),
        };

        if entries.iter().any(PageEntry::covers_zero) {
            let count = page_count()?;
            return Ok((1..=count.min(MAX_EXPANDED_PAGES)).collect());
        }

        let mut pages: Vec<i64> = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                PageEntry::Single(n) => pages.push(n),
                PageEntry::Range(from, to) => {
                    let room = MAX_EXPANDED_PAGES.saturating_sub(pages.len()) as i64;
                    let to = to.min(from.saturating_add(room));
                    pages.extend(from..=to);
                }
            }
            if pages.len() > MAX_EXPANDED_PAGES {
                warn!("Page selection truncated to {MAX_EXPANDED_PAGES} pages");
                pages.truncate(MAX_EXPANDED_PAGES);
                break;
            }
        }

        Ok(pages
            .into_iter()
            .filter_map(|n| match usize::try_from(n) {
                Ok(page) => Some(page),
                Err(_) => {
                    warn!("Dropping negative page number {n}");
                    None
                }
            })
            .collect())
    }
}

/// Convenience for selectors that never ask for the page count.
pub fn expand_pages<E>(
    block: &RawParameterBlock,
    page_count: impl FnOnce() -> Result<usize, E>,
) -> Result<Vec<usize>, E> {
    PageSelector::from_block(block).expand(page_count)
}

fn as_entry(value: &Value) -> Option<PageEntry> {
    if let Some(n) = as_page_number(value) {
        return Some(PageEntry::Single(n));
    }
    match as_pair(value) {
        Some((from, to)) => Some(PageEntry::Range(from, to)),
        None => {
            warn!("Dropping malformed page entry {value}");
            None
        }
    }
}

fn as_pair(value: &Value) -> Option<(i64, i64)> {
    match value.as_array()?.as_slice() {
        [from, to] => Some((as_page_number(from)?, as_page_number(to)?)),
        _ => None,
    }
}

/// Integral JSON numbers only; `2.0` counts, `2.5` does not.
fn as_page_number(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::parser::parse;
    use std::convert::Infallible;

    fn expand(text: &str) -> Vec<usize> {
        let block = parse(text).unwrap();
        expand_pages(&block, || -> Result<usize, Infallible> {
            panic!("page count not expected")
        })
        .unwrap()
    }

    fn expand_with_count(text: &str, count: usize) -> Vec<usize> {
        let block = parse(text).unwrap();
        expand_pages(&block, || Ok::<_, Infallible>(count)).unwrap()
    }

    #[test]
    fn defaults_to_first_page() {
        assert_eq!(expand(r#"{"url": "a.pdf"}"#), vec![1]);
    }

    #[test]
    fn bare_number_becomes_list() {
        assert_eq!(expand(r#"{"url": "a.pdf", "page": 4}"#), vec![4]);
    }

    #[test]
    fn nested_ranges_expand_in_place() {
        assert_eq!(
            expand(r#"{"url": "a.pdf", "page": [1, [3, 5], 8]}"#),
            vec![1, 3, 4, 5, 8]
        );
    }

    #[test]
    fn duplicates_and_order_are_kept() {
        assert_eq!(
            expand(r#"{"url": "a.pdf", "page": [5, 2, [1, 2], 5]}"#),
            vec![5, 2, 1, 2, 5]
        );
    }

    #[test]
    fn legacy_range_expands() {
        assert_eq!(expand(r#"{"url": "a.pdf", "range": [2, 4]}"#), vec![2, 3, 4]);
    }

    #[test]
    fn legacy_range_overrides_page() {
        assert_eq!(
            expand(r#"{"url": "a.pdf", "page": [9, 10], "range": [2, 4]}"#),
            vec![2, 3, 4]
        );
    }

    #[test]
    fn malformed_range_falls_back_to_page() {
        assert_eq!(
            expand(r#"{"url": "a.pdf", "page": 7, "range": [2]}"#),
            vec![7]
        );
    }

    #[test]
    fn zero_anywhere_means_every_page() {
        assert_eq!(
            expand_with_count(r#"{"url": "a.pdf", "page": [1, 0, 5]}"#, 7),
            vec![1, 2, 3, 4, 5, 6, 7]
        );
        assert_eq!(
            expand_with_count(r#"{"url": "a.pdf", "page": 0}"#, 3),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn zero_inside_nested_range_means_every_page() {
        assert_eq!(
            expand_with_count(r#"{"url": "a.pdf", "page": [9, [0, 2]]}"#, 4),
            vec![1, 2, 3, 4]
        );
        assert_eq!(
            expand_with_count(r#"{"url": "a.pdf", "range": [-2, 3]}"#, 2),
            vec![1, 2]
        );
    }

    #[test]
    fn zero_after_a_truncated_range_still_means_every_page() {
        assert_eq!(
            expand_with_count(r#"{"url": "a.pdf", "page": [5, [1, 20000], 0]}"#, 3),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn leading_nested_list_is_read_as_a_link() {
        // `[[` opens the bracket quoting, which turns the list into a string
        let block = parse(r#"{"url": "a.pdf", "page": [[3, 5]]}"#).unwrap();
        assert_eq!(block.get("page"), Some(&Value::from("[[3, 5]]")));
        assert_eq!(expand(r#"{"url": "a.pdf", "page": [[3, 5]]}"#), vec![1]);
    }

    #[test]
    fn page_count_failure_propagates() {
        let block = parse(r#"{"url": "a.pdf", "page": 0}"#).unwrap();
        let result = expand_pages(&block, || Err("corrupt xref"));
        assert_eq!(result, Err("corrupt xref"));
    }

    #[test]
    fn pages_past_the_end_are_kept() {
        assert_eq!(expand(r#"{"url": "a.pdf", "page": [2, 999]}"#), vec![2, 999]);
    }

    #[test]
    fn malformed_entries_are_dropped() {
        assert_eq!(
            expand(r#"{"url": "a.pdf", "page": [1, "two", [3], 2.5, 4.0, -3]}"#),
            vec![1, 4]
        );
    }

    #[test]
    fn wrong_page_type_uses_default() {
        assert_eq!(expand(r#"{"url": "a.pdf", "page": "3"}"#), vec![1]);
    }

    #[test]
    fn descending_range_is_empty() {
        assert!(expand(r#"{"url": "a.pdf", "range": [5, 3]}"#).is_empty());
    }

    #[test]
    fn huge_ranges_are_truncated() {
        let pages = expand(r#"{"url": "a.pdf", "page": [1, [2, 1000000000]]}"#);
        assert_eq!(pages.len(), MAX_EXPANDED_PAGES);
        assert_eq!(pages.last(), Some(&MAX_EXPANDED_PAGES));
    }
}
