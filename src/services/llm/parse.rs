//! Lenient decoding of extraction output.
//!
//! Completion models wrap JSON in prose and code fences, mix strings and
//! arrays, and report confidence as words. None of that is an error here:
//! anything unusable is dropped and the rest is kept.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::facts::{CandidateFact, FactType};

/// First balanced `[...]` region of `text` that parses as a JSON array of
/// objects (or an empty array). Brackets inside string literals do not count,
/// and bracketed prose like `[1]` is skipped.
pub fn extract_json_array(text: &str) -> Option<Vec<Value>> {
    let mut from = 0;
    while let Some(offset) = text[from..].find('[') {
        let start = from + offset;
        if let Some(region) = balanced_region(&text[start..]) {
            if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(region) {
                if items.is_empty() || items.iter().any(Value::is_object) {
                    return Some(items);
                }
            }
        }
        from = start + 1;
    }
    None
}

/// `text` must start with `[`. Returns the slice up to its matching `]`.
fn balanced_region(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Decode backend output into candidate facts. Never fails; garbage in means
/// an empty list out.
pub fn parse_candidates(text: &str, fragment: &str, default_confidence: f32) -> Vec<CandidateFact> {
    if text.trim().is_empty() {
        debug!("extraction returned an empty completion");
        return Vec::new();
    }

    let Some(items) = extract_json_array(text) else {
        warn!("extraction output had no JSON array ({} chars)", text.len());
        return Vec::new();
    };

    let total = items.len();
    let facts: Vec<CandidateFact> = items
        .iter()
        .filter_map(|item| parse_element(item, fragment, default_confidence))
        .collect();

    if facts.len() < total {
        debug!("dropped {} unusable extraction elements", total - facts.len());
    }
    facts
}

fn parse_element(item: &Value, fragment: &str, default_confidence: f32) -> Option<CandidateFact> {
    let obj = item.as_object()?;

    let entity_type = obj
        .get("entity_type")
        .or_else(|| obj.get("type"))
        .and_then(Value::as_str)
        .unwrap_or("preference");

    let values = read_values(obj);
    if values.is_empty() {
        return None;
    }

    let raw_quote = obj
        .get("raw_text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(fragment);

    let strict = obj
        .get("requires_hard_validation")
        .or_else(|| obj.get("strict"))
        .map(read_flag)
        .unwrap_or(false);

    let mut fact = CandidateFact::new(
        FactType::from_entity_type(entity_type),
        values,
        read_confidence(obj.get("confidence"), default_confidence),
        raw_quote,
    )
    .strict(strict);
    fact.metadata = obj.get("metadata").and_then(Value::as_object).cloned();
    Some(fact)
}

/// `value` or `values`, string or array. Blank entries are dropped.
fn read_values(obj: &Map<String, Value>) -> Vec<String> {
    let raw = match obj.get("value").or_else(|| obj.get("values")) {
        Some(v) => v,
        None => return Vec::new(),
    };

    let collected: Vec<String> = match raw {
        Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(other).into_iter().collect(),
    };

    collected
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn read_confidence(value: Option<&Value>, default: f32) -> f32 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().map(|f| f as f32),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(0.9),
            "medium" => Some(0.65),
            "low" => Some(0.3),
            other => other.parse::<f32>().ok(),
        },
        _ => None,
    };

    match raw {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => default,
    }
}

fn read_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_inside_strings_are_ignored() {
        let text = r#"Sure! [{"entity_type":"skill","value":"a ] b [","confidence":0.9}] hope that helps"#;
        let items = extract_json_array(text).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["value"], "a ] b [");
    }

    #[test]
    fn skips_non_json_bracket_prose() {
        for text in [
            r#"See note [1]. Result: [{"entity_type":"location","value":"Leeds"}]"#,
            r#"See note [a]. Result: [{"entity_type":"location","value":"Leeds"}]"#,
        ] {
            let facts = parse_candidates(text, "frag", 0.7);
            assert_eq!(facts.len(), 1);
            assert_eq!(facts[0].fact_type, FactType::Location);
        }
    }

    #[test]
    fn escaped_quotes_stay_inside_strings() {
        let text = r#"[{"value":"say \"[hi\"","entity_type":"preference"}]"#;
        let facts = parse_candidates(text, "frag", 0.7);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].values, vec![r#"say "[hi""#.to_string()]);
    }

    #[test]
    fn confidence_words_and_bounds() {
        assert_eq!(read_confidence(Some(&Value::from("High")), 0.7), 0.9);
        assert_eq!(read_confidence(Some(&Value::from("medium")), 0.7), 0.65);
        assert_eq!(read_confidence(Some(&Value::from("low")), 0.7), 0.3);
        assert_eq!(read_confidence(Some(&Value::from("0.55")), 0.7), 0.55);
        assert_eq!(read_confidence(Some(&Value::from(1.7)), 0.7), 1.0);
        assert_eq!(read_confidence(Some(&Value::from(-0.2)), 0.7), 0.0);
        assert_eq!(read_confidence(Some(&Value::from("sure")), 0.7), 0.7);
        assert_eq!(read_confidence(None, 0.7), 0.7);
    }

    #[test]
    fn values_accept_string_or_array() {
        let text = r#"[
            {"entity_type":"skill","values":["Rust"," ","Go"],"confidence":0.9},
            {"entity_type":"skill","value":"   ","confidence":0.9},
            {"entity_type":"day_rate","value":650}
        ]"#;
        let facts = parse_candidates(text, "frag", 0.7);
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].values, vec!["Rust".to_string(), "Go".to_string()]);
        assert_eq!(facts[1].fact_type, FactType::Rate);
        assert_eq!(facts[1].values, vec!["650".to_string()]);
        assert_eq!(facts[1].raw_quote, "frag");
    }

    #[test]
    fn unbalanced_output_yields_nothing() {
        assert!(parse_candidates(r#"[{"value":"x""#, "frag", 0.7).is_empty());
        assert!(parse_candidates("", "frag", 0.7).is_empty());
        assert!(parse_candidates(r#"{"value":"x"}"#, "frag", 0.7).is_empty());
    }
}
