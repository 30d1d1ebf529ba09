// ── Count reconciliation ──
//
// Pure functions deciding which active/inactive/total figures to show for a
// page, and whether those figures are trustworthy enough to skip the
// full-dataset fallback.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use sgivu_api::Page;

use crate::model::Toggleable;

/// Page size used when neither the pager nor the dataset says otherwise.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Active / inactive tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub active: u64,
    pub inactive: u64,
}

impl Counts {
    pub fn new(active: u64, inactive: u64) -> Self {
        Self { active, inactive }
    }

    pub fn sum(self) -> u64 {
        self.active.saturating_add(self.inactive)
    }
}

/// Alias lists probed, in order, when reading a `/count` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountKeys {
    pub active: Vec<String>,
    pub inactive: Vec<String>,
}

impl CountKeys {
    pub fn new<A, I>(active: A, inactive: I) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            active: active.into_iter().map(Into::into).collect(),
            inactive: inactive.into_iter().map(Into::into).collect(),
        }
    }
}

/// Counts read from the server, and whether any alias was present at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractedCounts {
    pub counts: Counts,
    pub has_counts: bool,
}

// ── Extraction ───────────────────────────────────────────────────────

/// Read active/inactive counts from an aggregate payload.
///
/// The first alias present wins, even when its value is `null`. A payload
/// that is not an object has no counts.
pub fn extract_counts(payload: &Value, keys: &CountKeys) -> ExtractedCounts {
    let Value::Object(source) = payload else {
        return ExtractedCounts::default();
    };

    let active = pick_first(source, &keys.active);
    let inactive = pick_first(source, &keys.inactive);

    ExtractedCounts {
        counts: Counts {
            active: active.map_or(0, normalize_count),
            inactive: inactive.map_or(0, normalize_count),
        },
        has_counts: active.is_some() || inactive.is_some(),
    }
}

fn pick_first<'a>(source: &'a Map<String, Value>, keys: &[String]) -> Option<&'a Value> {
    keys.iter().find_map(|key| source.get(key))
}

/// Coerce a count value: numbers, numeric strings and booleans count;
/// everything else (and anything negative) is zero.
pub fn normalize_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .unwrap_or_else(|| n.as_f64().map_or(0, count_from_f64)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0
            } else {
                trimmed.parse::<f64>().map_or(0, count_from_f64)
            }
        }
        Value::Bool(b) => u64::from(*b),
        Value::Null | Value::Array(_) | Value::Object(_) => 0,
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
fn count_from_f64(n: f64) -> u64 {
    if n.is_finite() && n > 0.0 {
        n.trunc() as u64
    } else {
        0
    }
}

// ── Reconciliation ───────────────────────────────────────────────────

/// Counts to show when the server gave none: the page's own tally, with the
/// inactive side inferred from the reported total when it reads as zero.
pub fn infer_from_page<T>(page_counts: Counts, pager: &Page<T>) -> Counts {
    let mut counts = page_counts;
    if let Some(total) = pager.total_elements {
        if pager.is_populated() && counts.inactive == 0 && counts.active <= total {
            counts.inactive = total - counts.active;
        }
    }
    counts
}

/// Whether the committed counts should be replaced by a full-dataset tally.
pub fn should_fallback(
    has_counts: bool,
    expected: Counts,
    page_counts: Counts,
    reported_total: Option<u64>,
) -> bool {
    if !has_counts {
        return true;
    }

    let expected_total = expected.sum();
    if expected_total > 0 && reported_total.is_none_or(|total| total < expected_total) {
        return true;
    }

    expected.inactive > 0 && page_counts.inactive == 0
}

/// Total to show: the server's figure when it gave one, else the count sum.
pub fn resolve_total(reported_total: Option<u64>, counts: Counts) -> u64 {
    reported_total.unwrap_or_else(|| counts.sum())
}

/// Page size for re-slicing a full dataset.
pub fn resolve_page_size<T>(pager: &Page<T>, dataset_len: usize) -> u64 {
    if let Some(size) = pager.size.filter(|s| *s > 0) {
        return size;
    }
    if let Some(count) = pager.number_of_elements.filter(|n| *n > 0) {
        return count;
    }
    match u64::try_from(dataset_len) {
        Ok(len) if len > 0 => len,
        _ => DEFAULT_PAGE_SIZE,
    }
}

/// The `index`-th page of `items`, `page_size` wide.
pub fn slice_items<T: Clone>(items: &[T], index: u64, page_size: u64) -> Vec<T> {
    if page_size == 0 {
        return items.to_vec();
    }
    let start = usize::try_from(index.saturating_mul(page_size)).unwrap_or(usize::MAX);
    let width = usize::try_from(page_size).unwrap_or(usize::MAX);
    items.iter().skip(start).take(width).cloned().collect()
}

// ── Client-side tallies ──────────────────────────────────────────────

/// Count items matching `is_active`; the rest are inactive.
pub fn compute_counts_by<T>(items: &[T], is_active: impl Fn(&T) -> bool) -> Counts {
    let total = u64::try_from(items.len()).unwrap_or(u64::MAX);
    let active = u64::try_from(items.iter().filter(|item| is_active(*item)).count())
        .unwrap_or(u64::MAX);
    Counts::new(active, total - active)
}

/// Enabled / disabled tally.
pub fn compute_enabled_counts<T: Toggleable>(items: &[T]) -> Counts {
    compute_counts_by(items, <T as Toggleable>::is_enabled)
}
