use super::types::{ContentKey, FactType};

const EMPTY_MARKER: &str = "<empty>";

/// Lower-case, trim and collapse internal whitespace.
pub fn normalize_value(raw: &str) -> String {
    raw.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stable content key for dedup and the storage upsert.
///
/// Values are normalized, sorted and de-duplicated so that the order the
/// extractor reported them in does not matter. Never fails: input with no
/// usable value falls back to its raw form.
pub fn content_key(fact_type: FactType, values: &[String]) -> ContentKey {
    let mut normalized: Vec<String> = values
        .iter()
        .map(|v| normalize_value(v))
        .filter(|v| !v.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();

    let normalized_value = if normalized.is_empty() {
        raw_fallback(values)
    } else {
        normalized.join(",")
    };

    ContentKey { fact_type, normalized_value }
}

fn raw_fallback(values: &[String]) -> String {
    let raw = values.join(",");
    let raw = raw.trim();
    if raw.is_empty() {
        EMPTY_MARKER.to_string()
    } else {
        raw.to_string()
    }
}
