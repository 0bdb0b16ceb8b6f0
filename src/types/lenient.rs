//! Tolerant field decoders for model-produced JSON.
//!
//! Models routinely emit `"3"` where a number is expected, `12` where a string
//! is expected, `null` for missing sections, or a bare string where a list
//! belongs. These helpers coerce such values instead of rejecting the whole
//! plan; anything unusable decodes to the field's default.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Render a scalar as text. Objects and arrays keep their JSON form.
fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Leading numeric portion of strings like `"150g"` or `" 45 minutes"`.
fn leading_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    let end = trimmed
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-'))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    trimmed[..end].parse().ok()
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        _ => None,
    }
}

pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(Value::deserialize(deserializer)?))
}

/// Whole number, rounded half away from zero. Unparseable input becomes 0.
pub fn integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value).map(|n| n.round() as i64).unwrap_or(0))
}

pub fn unsigned<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value)
        .filter(|n| *n >= 0.0)
        .map(|n| n.round().min(u32::MAX as f64) as u32)
        .unwrap_or(0))
}

pub fn opt_unsigned<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value)
        .filter(|n| *n >= 0.0)
        .map(|n| n.trunc().min(u32::MAX as f64) as u32))
}

pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value))
}

/// `["a", 1]`, `"a"` and `null` all become a list of strings.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter(|v| !v.is_null())
            .map(value_to_string)
            .collect(),
        Value::Null => Vec::new(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        other => vec![value_to_string(other)],
    })
}

/// List of records; entries that do not fit the record shape are dropped.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Nested record; anything that is not a usable object becomes the default.
pub fn object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Probe {
        #[serde(deserialize_with = "string")]
        text: String,
        #[serde(deserialize_with = "integer")]
        whole: i64,
        #[serde(deserialize_with = "unsigned")]
        count: u32,
        #[serde(deserialize_with = "string_list")]
        tags: Vec<String>,
    }

    #[test]
    fn test_numbers_from_strings() {
        let probe: Probe =
            serde_json::from_str(r#"{"whole": "150g", "count": "3", "text": 12}"#).unwrap();
        assert_eq!(probe.whole, 150);
        assert_eq!(probe.count, 3);
        assert_eq!(probe.text, "12");
    }

    #[test]
    fn test_nulls_become_defaults() {
        let probe: Probe =
            serde_json::from_str(r#"{"whole": null, "text": null, "tags": null}"#).unwrap();
        assert_eq!(probe.whole, 0);
        assert!(probe.text.is_empty());
        assert!(probe.tags.is_empty());
    }

    #[test]
    fn test_single_string_becomes_list() {
        let probe: Probe = serde_json::from_str(r#"{"tags": "dumbbells"}"#).unwrap();
        assert_eq!(probe.tags, vec!["dumbbells"]);
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("45 minutes"), Some(45.0));
        assert_eq!(leading_number("2.5kg"), Some(2.5));
        assert_eq!(leading_number("about 3"), None);
    }
}
