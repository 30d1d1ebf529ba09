// ── Paged response envelope ──
//
// Mirrors the Spring Data `Page<T>` serialization returned by every
// `/page/{n}` and `/search/page/{n}` endpoint. Numeric fields are optional:
// some endpoints omit them, and callers must tell "absent" from zero.

use serde::{Deserialize, Serialize};

/// One page of a resource listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    /// Zero-based page index.
    #[serde(default)]
    pub number: Option<u64>,
    /// Requested page size.
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub total_elements: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u64>,
    #[serde(default)]
    pub first: bool,
    #[serde(default)]
    pub last: bool,
    #[serde(default)]
    pub empty: bool,
    #[serde(default)]
    pub number_of_elements: Option<u64>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            content: Vec::new(),
            number: None,
            size: None,
            total_elements: None,
            total_pages: None,
            first: false,
            last: false,
            empty: true,
            number_of_elements: None,
        }
    }
}

impl<T> Page<T> {
    /// Build a self-consistent page from a slice of an in-memory dataset.
    ///
    /// `total_pages` is at least 1 whenever `page_size` is positive, so a
    /// request for page 0 of an empty dataset is still a valid page.
    pub fn from_slice(content: Vec<T>, index: u64, page_size: u64, total_elements: u64) -> Self {
        let total_pages = if page_size == 0 {
            u64::from(total_elements > 0)
        } else {
            total_elements.div_ceil(page_size).max(1)
        };
        let count = u64::try_from(content.len()).unwrap_or(u64::MAX);

        Self {
            content,
            number: Some(index),
            size: Some(page_size),
            total_elements: Some(total_elements),
            total_pages: Some(total_pages),
            first: index == 0,
            last: index.saturating_add(1) >= total_pages,
            empty: count == 0,
            number_of_elements: Some(count),
        }
    }

    /// Whether the page carries anything worth reasoning about: items, or at
    /// least an explicit element count.
    pub fn is_populated(&self) -> bool {
        !self.content.is_empty() || self.number_of_elements.is_some()
    }
}
