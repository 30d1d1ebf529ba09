// ── Filter <-> query-parameter codec ──
//
// A list of `FilterFieldMapping`s is the whole contract between a typed
// filter object and the query string of a list URL. Both directions read
// the same table, so what `decode` accepts is exactly what `encode` emits.
//
// Typed filters cross the boundary through serde: the filter object is
// viewed as a JSON object keyed by `filter_key`.

mod price;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use sgivu_api::format_number;

use crate::error::CoreError;

pub use price::{PriceInput, format_price, normalize_price_input, parse_price};

/// Query parameters of a list URL. Ordered, so equality ignores insertion order.
pub type QueryParams = BTreeMap<String, String>;

/// How a filter field is parsed from and written to the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Free text; blank values are never emitted.
    String,
    /// Finite number.
    Number,
    /// Finite number that also feeds a formatted price input.
    Price,
    /// Enumerated value carried as a string.
    Enum,
    /// `"true"` / `"false"`.
    Boolean,
}

/// One filterable field: where it lives in the URL and in the filter object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterFieldMapping {
    pub query_key: String,
    pub filter_key: String,
    pub kind: FilterKind,
}

impl FilterFieldMapping {
    pub fn new(query_key: impl Into<String>, filter_key: impl Into<String>, kind: FilterKind) -> Self {
        Self {
            query_key: query_key.into(),
            filter_key: filter_key.into(),
            kind,
        }
    }
}

/// Result of reading filters out of a query string.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFilters<F> {
    /// Only the fields that carried a value, or `None` when no filter is active.
    pub filters: Option<F>,
    /// Full filter object for form binding, starting from the empty state.
    pub ui_state: F,
    /// Display text for every `price` field (`""` when absent or invalid).
    pub price_inputs: BTreeMap<String, String>,
    /// Canonical query for the active filters, or `None` when none are active.
    pub query_params: Option<QueryParams>,
}

// ── Decode ───────────────────────────────────────────────────────────

/// Read a filter object out of query parameters.
///
/// Keys not declared in `mappings` are ignored. Values that fail to parse
/// for their kind are dropped silently.
pub fn decode<F>(
    query: &QueryParams,
    mappings: &[FilterFieldMapping],
    empty_state: impl FnOnce() -> F,
) -> Result<DecodedFilters<F>, CoreError>
where
    F: Serialize + DeserializeOwned,
{
    let mut ui_state = to_object(&empty_state())?;
    let mut filters = Map::new();
    let mut price_inputs = BTreeMap::new();

    for mapping in mappings {
        let raw = query
            .get(&mapping.query_key)
            .map(String::as_str)
            .filter(|raw| !raw.is_empty());

        let Some(raw) = raw else {
            if mapping.kind == FilterKind::Price {
                price_inputs.insert(mapping.filter_key.clone(), String::new());
            }
            continue;
        };

        let value = match mapping.kind {
            FilterKind::String | FilterKind::Enum => Some(Value::String(raw.to_owned())),
            FilterKind::Number => parse_number(raw),
            FilterKind::Price => {
                let value = parse_number(raw);
                let display = value.as_ref().map_or_else(String::new, stringify);
                price_inputs.insert(mapping.filter_key.clone(), display);
                value
            }
            FilterKind::Boolean => Some(Value::Bool(raw == "true")),
        };

        if let Some(value) = value {
            filters.insert(mapping.filter_key.clone(), value.clone());
            ui_state.insert(mapping.filter_key.clone(), value);
        }
    }

    let active = !are_filters_empty(&filters);
    let query_params = if active {
        encode_map(&filters, mappings)
    } else {
        None
    };
    let filters = if active {
        Some(from_object(filters)?)
    } else {
        None
    };

    Ok(DecodedFilters {
        filters,
        ui_state: from_object(ui_state)?,
        price_inputs,
        query_params,
    })
}

// ── Encode ───────────────────────────────────────────────────────────

/// Write a filter object as query parameters; `None` when nothing is set.
pub fn encode<F: Serialize + ?Sized>(
    filters: &F,
    mappings: &[FilterFieldMapping],
) -> Result<Option<QueryParams>, CoreError> {
    Ok(encode_map(&to_object(filters)?, mappings))
}

fn encode_map(filters: &Map<String, Value>, mappings: &[FilterFieldMapping]) -> Option<QueryParams> {
    let mut params = QueryParams::new();

    for mapping in mappings {
        let Some(value) = filters.get(&mapping.filter_key) else {
            continue;
        };
        let text = match (mapping.kind, value) {
            (_, Value::Null) => None,
            (_, Value::String(s)) if s.is_empty() => None,
            (FilterKind::String, Value::String(s)) => {
                (!s.trim().is_empty()).then(|| s.clone())
            }
            (FilterKind::String, _) => None,
            (_, other) => Some(stringify(other)),
        };
        if let Some(text) = text {
            params.insert(mapping.query_key.clone(), text);
        }
    }

    (!params.is_empty()).then_some(params)
}

// ── Helpers ──────────────────────────────────────────────────────────

/// `true` when every entry is absent, `null`, or blank text.
pub fn are_filters_empty(filters: &Map<String, Value>) -> bool {
    filters.values().all(|value| match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    })
}

/// Trim a free-text filter; blank becomes `None`.
pub fn normalize_filter_value(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

/// Tri-state status select: unset, `"true"`, or anything else (`false`).
pub fn normalize_status(value: Option<&str>) -> Option<bool> {
    match value {
        None | Some("") => None,
        Some(v) => Some(v == "true"),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(n),
        other => other.to_string(),
    }
}

/// Parse a finite number; integral values stay integral.
#[allow(
    clippy::cast_possible_truncation,
    clippy::as_conversions,
    clippy::float_cmp
)]
fn parse_number(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(Value::from(n));
    }
    let parsed = trimmed.parse::<f64>().ok().filter(|n| n.is_finite())?;
    if parsed.fract() == 0.0 && parsed.abs() < 9_007_199_254_740_992.0 {
        return Some(Value::from(parsed as i64));
    }
    serde_json::Number::from_f64(parsed).map(Value::Number)
}

fn to_object<F: Serialize + ?Sized>(value: &F) -> Result<Map<String, Value>, CoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(CoreError::Filter {
            message: format!("filters must serialize to an object, got {other}"),
        }),
        Err(e) => Err(CoreError::Filter {
            message: e.to_string(),
        }),
    }
}

fn from_object<F: DeserializeOwned>(map: Map<String, Value>) -> Result<F, CoreError> {
    serde_json::from_value(Value::Object(map)).map_err(|e| CoreError::Filter {
        message: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct CarFilters {
        brand: Option<String>,
        status: Option<String>,
        min_year: Option<i64>,
        min_sale_price: Option<f64>,
        enabled: Option<bool>,
    }

    fn mappings() -> Vec<FilterFieldMapping> {
        vec![
            FilterFieldMapping::new("carBrand", "brand", FilterKind::String),
            FilterFieldMapping::new("carStatus", "status", FilterKind::Enum),
            FilterFieldMapping::new("carMinYear", "minYear", FilterKind::Number),
            FilterFieldMapping::new("minSalePrice", "minSalePrice", FilterKind::Price),
            FilterFieldMapping::new("carEnabled", "enabled", FilterKind::Boolean),
        ]
    }

    fn query(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn decode_then_encode_reproduces_the_query() {
        let q = query(&[
            ("carBrand", "Mazda"),
            ("carStatus", "AVAILABLE"),
            ("carMinYear", "2019"),
            ("minSalePrice", "25000"),
            ("carEnabled", "false"),
        ]);

        let decoded = decode(&q, &mappings(), CarFilters::default).unwrap();
        let filters = decoded.filters.unwrap();
        assert_eq!(encode(&filters, &mappings()).unwrap(), Some(q.clone()));
        assert_eq!(decoded.query_params, Some(q));
    }

    #[test]
    fn unrelated_keys_never_reappear() {
        let q = query(&[("carBrand", "Kia"), ("utm_source", "mail")]);
        let decoded = decode(&q, &mappings(), CarFilters::default).unwrap();
        assert_eq!(decoded.query_params, Some(query(&[("carBrand", "Kia")])));
    }

    #[test]
    fn price_field_feeds_price_inputs() {
        let decoded = decode(
            &query(&[("minSalePrice", "25000")]),
            &mappings(),
            CarFilters::default,
        )
        .unwrap();

        assert_eq!(decoded.price_inputs["minSalePrice"], "25000");
        assert_eq!(decoded.ui_state.min_sale_price, Some(25000.0));
        assert_eq!(decoded.filters.unwrap().min_sale_price, Some(25000.0));
    }

    #[test]
    fn invalid_price_resets_display_and_is_dropped() {
        let decoded = decode(
            &query(&[("minSalePrice", "not-a-number"), ("carBrand", "Kia")]),
            &mappings(),
            CarFilters::default,
        )
        .unwrap();

        assert_eq!(decoded.price_inputs["minSalePrice"], "");
        assert_eq!(decoded.filters.unwrap().min_sale_price, None);
    }

    #[test]
    fn absent_price_still_gets_an_empty_display() {
        let decoded = decode(&QueryParams::new(), &mappings(), CarFilters::default).unwrap();
        assert_eq!(decoded.price_inputs.get("minSalePrice").map(String::as_str), Some(""));
    }

    #[test]
    fn no_recognized_keys_collapses_to_none() {
        let decoded = decode(
            &query(&[("page", "3"), ("carMinYear", "soon")]),
            &mappings(),
            CarFilters::default,
        )
        .unwrap();

        assert_eq!(decoded.filters, None);
        assert_eq!(decoded.query_params, None);
        assert_eq!(decoded.ui_state, CarFilters::default());
    }

    #[test]
    fn blank_text_alone_is_not_an_active_filter() {
        let decoded = decode(&query(&[("carBrand", "   ")]), &mappings(), CarFilters::default)
            .unwrap();
        assert_eq!(decoded.filters, None);
        assert_eq!(decoded.ui_state.brand.as_deref(), Some("   "));
    }

    #[test]
    fn boolean_kind_reads_true_literal_only() {
        let decoded = decode(&query(&[("carEnabled", "yes")]), &mappings(), CarFilters::default)
            .unwrap();
        assert_eq!(decoded.filters.unwrap().enabled, Some(false));
    }

    #[test]
    fn ui_state_keeps_empty_state_defaults() {
        let decoded = decode(&query(&[("carMinYear", "2020")]), &mappings(), || CarFilters {
            status: Some(String::new()),
            ..CarFilters::default()
        })
        .unwrap();

        assert_eq!(decoded.ui_state.status.as_deref(), Some(""));
        assert_eq!(decoded.ui_state.min_year, Some(2020));
    }

    #[test]
    fn encode_skips_blank_strings_and_empty_objects() {
        let filters = CarFilters {
            brand: Some("  ".into()),
            ..CarFilters::default()
        };
        assert_eq!(encode(&filters, &mappings()).unwrap(), None);
    }

    #[test]
    fn encode_keeps_string_untrimmed() {
        let filters = CarFilters {
            brand: Some(" Kia ".into()),
            ..CarFilters::default()
        };
        assert_eq!(
            encode(&filters, &mappings()).unwrap(),
            Some(query(&[("carBrand", " Kia ")]))
        );
    }

    #[test]
    fn encode_rejects_non_object_filters() {
        assert!(matches!(
            encode(&vec![1, 2], &mappings()),
            Err(CoreError::Filter { .. })
        ));
    }

    #[test]
    fn fractional_numbers_round_trip() {
        let q = query(&[("carMinYear", "2019.5")]);
        let decoded: DecodedFilters<serde_json::Value> =
            decode(&q, &mappings(), || serde_json::json!({})).unwrap();
        assert_eq!(decoded.query_params, Some(q));
    }

    #[test]
    fn whole_float_fields_encode_without_fraction() {
        let filters = CarFilters {
            min_sale_price: Some(25000.0),
            ..CarFilters::default()
        };
        assert_eq!(
            encode(&filters, &mappings()).unwrap(),
            Some(query(&[("minSalePrice", "25000")]))
        );

        let filters = CarFilters {
            min_sale_price: Some(25000.75),
            ..CarFilters::default()
        };
        assert_eq!(
            encode(&filters, &mappings()).unwrap(),
            Some(query(&[("minSalePrice", "25000.75")]))
        );
    }

    #[test]
    fn normalize_helpers() {
        assert_eq!(normalize_filter_value(Some("  Mazda ")), Some("Mazda".into()));
        assert_eq!(normalize_filter_value(Some("   ")), None);
        assert_eq!(normalize_filter_value(None), None);

        assert_eq!(normalize_status(None), None);
        assert_eq!(normalize_status(Some("")), None);
        assert_eq!(normalize_status(Some("true")), Some(true));
        assert_eq!(normalize_status(Some("false")), Some(false));
    }

    #[test]
    fn mapping_kinds_deserialize_from_lowercase() {
        let mapping: FilterFieldMapping = serde_json::from_value(serde_json::json!({
            "query_key": "userEnabled",
            "filter_key": "enabled",
            "kind": "boolean"
        }))
        .unwrap();
        assert_eq!(mapping.kind, FilterKind::Boolean);
    }
}
