//! JSON Repair Mechanism
//!
//! Recovers a JSON object from model output that is wrapped in prose or has
//! minor syntax defects. Stages run in order and each one works on the
//! output of the previous one; the first stage whose text parses to an
//! object wins.
//!
//! 1. Direct parse (after stripping code fences and BOM)
//! 2. Trim to the span between the first `{` and the last `}`
//! 3. Close strings broken by a raw line break or cut off at the end
//! 4. Strip trailing commas and quote bare object keys, outside strings only
//! 5. Parse the largest balanced `{...}` span

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{FitError, Result};

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("Invalid trailing comma regex"));

static BARE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([{,]\s*)(\w+)(\s*:)").expect("Invalid bare key regex"));

/// Repair stage that produced the parsed object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RepairStage {
    Direct,
    Trimmed,
    ClosedStrings,
    Structural,
    BalancedBraces,
}

impl RepairStage {
    pub fn was_repaired(&self) -> bool {
        !matches!(self, RepairStage::Direct)
    }
}

impl std::fmt::Display for RepairStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepairStage::Direct => write!(f, "direct"),
            RepairStage::Trimmed => write!(f, "trimmed"),
            RepairStage::ClosedStrings => write!(f, "closed_strings"),
            RepairStage::Structural => write!(f, "structural"),
            RepairStage::BalancedBraces => write!(f, "balanced_braces"),
        }
    }
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Recover a JSON object from raw model text
pub fn repair(text: &str) -> Result<Value> {
    JsonRepairer::new().repair(text).map(|(value, _)| value)
}

// =============================================================================
// JsonRepairer
// =============================================================================

/// Ordered repair chain for model output
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRepairer;

impl JsonRepairer {
    pub fn new() -> Self {
        Self
    }

    /// Parse `raw`, repairing as needed. Returns the object and the stage
    /// that produced it.
    pub fn repair(&self, raw: &str) -> Result<(Value, RepairStage)> {
        let mut text = self.preprocess(raw);
        if let Some(value) = parse_object(&text) {
            return Ok((value, RepairStage::Direct));
        }
        debug!("Direct JSON parse failed, attempting repair");

        text = self.trim_to_braces(&text);
        if let Some(value) = parse_object(&text) {
            return Ok(self.repaired(value, RepairStage::Trimmed));
        }

        text = self.close_unterminated_values(&text);
        if let Some(value) = parse_object(&text) {
            return Ok(self.repaired(value, RepairStage::ClosedStrings));
        }

        text = self.fix_structure(&text);
        if let Some(value) = parse_object(&text) {
            return Ok(self.repaired(value, RepairStage::Structural));
        }

        for candidate in self.balanced_spans(&text) {
            if let Some(value) = parse_object(candidate) {
                return Ok(self.repaired(value, RepairStage::BalancedBraces));
            }
        }

        Err(FitError::parse(
            "Failed to parse or repair JSON after all repair stages",
            raw,
        ))
    }

    fn repaired(&self, value: Value, stage: RepairStage) -> (Value, RepairStage) {
        warn!(stage = %stage, "JSON repaired");
        (value, stage)
    }

    /// Strip code fences, BOM and surrounding whitespace
    fn preprocess(&self, raw: &str) -> String {
        let s = self.strip_code_fences(raw.trim());
        s.trim_start_matches('\u{feff}').trim().to_string()
    }

    /// Strip markdown code fences
    fn strip_code_fences(&self, s: &str) -> String {
        let mut result = s.to_string();

        if result.starts_with("```")
            && let Some(first_newline) = result.find('\n')
        {
            result = result[first_newline + 1..].to_string();
        }

        if result.ends_with("```") {
            result = result[..result.len() - 3].trim_end().to_string();
        }

        result
    }

    /// Span from the first `{` to the last `}`; unchanged when there is none
    fn trim_to_braces(&self, s: &str) -> String {
        match (s.find('{'), s.rfind('}')) {
            (Some(start), Some(end)) if end > start => s[start..=end].to_string(),
            _ => s.to_string(),
        }
    }

    /// Close string literals that hit a raw line break, and one left open
    /// at the end of the text (before any trailing `}` / `]`). Well-formed
    /// strings pass through untouched.
    fn close_unterminated_values(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        let mut in_string = false;
        let mut escape = false;

        for ch in s.chars() {
            if in_string {
                if escape {
                    escape = false;
                } else if ch == '\\' {
                    escape = true;
                } else if ch == '"' {
                    in_string = false;
                } else if ch == '\n' || ch == '\r' {
                    out.push('"');
                    in_string = false;
                }
            } else if ch == '"' {
                in_string = true;
            }
            out.push(ch);
        }

        if in_string {
            let body_end = out
                .trim_end_matches(|c: char| c.is_whitespace() || c == '}' || c == ']')
                .len();
            out.insert(body_end, '"');
        }
        out
    }

    /// Strip trailing commas, then quote bare keys. String literals are
    /// copied verbatim.
    fn fix_structure(&self, s: &str) -> String {
        map_outside_strings(s, |segment| {
            let without_commas = TRAILING_COMMA_RE.replace_all(segment, "${1}");
            BARE_KEY_RE
                .replace_all(&without_commas, r#"${1}"${2}"${3}"#)
                .into_owned()
        })
    }

    /// Top-level balanced `{...}` spans, largest first. Braces inside string
    /// literals are ignored.
    fn balanced_spans<'a>(&self, s: &'a str) -> Vec<&'a str> {
        let mut spans = Vec::new();
        let mut depth = 0usize;
        let mut start = 0usize;
        let mut in_string = false;
        let mut escape = false;

        for (i, ch) in s.char_indices() {
            if escape {
                escape = false;
                continue;
            }

            match ch {
                '\\' if in_string => escape = true,
                '"' => in_string = !in_string,
                '{' if !in_string => {
                    if depth == 0 {
                        start = i;
                    }
                    depth += 1;
                }
                '}' if !in_string && depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        spans.push(&s[start..=i]);
                    }
                }
                _ => {}
            }
        }

        spans.sort_by_key(|span| std::cmp::Reverse(span.len()));
        spans
    }
}

/// Apply `rewrite` to each run of text that lies outside string literals
fn map_outside_strings(s: &str, rewrite: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    let mut segment_start = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in s.char_indices() {
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
                out.push_str(&s[segment_start..=i]);
                segment_start = i + 1;
            }
        } else if ch == '"' {
            out.push_str(&rewrite(&s[segment_start..i]));
            in_string = true;
            segment_start = i;
        }
    }

    let rest = &s[segment_start..];
    if in_string {
        out.push_str(rest);
    } else {
        out.push_str(&rewrite(rest));
    }
    out
}

fn parse_object(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn stage_of(input: &str) -> RepairStage {
        JsonRepairer::new().repair(input).unwrap().1
    }

    #[test]
    fn test_parse_valid_json() {
        let (value, stage) = JsonRepairer::new().repair(r#"{"key": "value"}"#).unwrap();
        assert_eq!(value, json!({"key": "value"}));
        assert!(!stage.was_repaired());
    }

    #[test]
    fn test_strip_code_fences() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(repair(input).unwrap()["key"], "value");
        assert_eq!(stage_of(input), RepairStage::Direct);
    }

    #[test]
    fn test_prose_around_object() {
        let input = r#"Here is your plan: {"title": "Leg Day", "duration": 45} Enjoy!"#;
        assert_eq!(repair(input).unwrap(), json!({"title": "Leg Day", "duration": 45}));
        assert_eq!(stage_of(input), RepairStage::Trimmed);
    }

    #[test]
    fn test_unterminated_value_before_brace() {
        let input = r#"{"title": "Leg Day}"#;
        assert_eq!(repair(input).unwrap(), json!({"title": "Leg Day"}));
        assert_eq!(stage_of(input), RepairStage::ClosedStrings);
    }

    #[test]
    fn test_unterminated_value_before_newline() {
        let input = "{\"name\": \"unterminated\n, \"other\": \"value\"}";
        let value = repair(input).unwrap();
        assert_eq!(value["name"], "unterminated");
        assert_eq!(value["other"], "value");
    }

    #[test]
    fn test_trailing_commas() {
        let input = r#"{"exercises": [{"name": "Row"},], "notes": ["rest well",],}"#;
        assert_eq!(
            repair(input).unwrap(),
            json!({"exercises": [{"name": "Row"}], "notes": ["rest well"]})
        );
        assert_eq!(stage_of(input), RepairStage::Structural);
    }

    #[test]
    fn test_bare_keys() {
        let input = r#"{title: "Push Day", duration: 30, progressionPlan: {week1: "base"}}"#;
        assert_eq!(
            repair(input).unwrap(),
            json!({"title": "Push Day", "duration": 30, "progressionPlan": {"week1": "base"}})
        );
    }

    #[test]
    fn test_trailing_comma_with_comma_in_value() {
        let input = r#"{"instructions": "Keep back straight, brace core", "sets": 3,}"#;
        assert_eq!(
            repair(input).unwrap(),
            json!({"instructions": "Keep back straight, brace core", "sets": 3})
        );
        assert_eq!(stage_of(input), RepairStage::Structural);
    }

    #[test]
    fn test_bare_key_with_colons_in_value() {
        let input = r#"{monday: ["Breakfast: Oats, Lunch: Rice"]}"#;
        assert_eq!(
            repair(input).unwrap(),
            json!({"monday": ["Breakfast: Oats, Lunch: Rice"]})
        );
    }

    #[test]
    fn test_string_contents_survive_structural_pass() {
        let input = r#"{notes: ["Rest, then go again,]", "a: b"], "tip": "{x,}",}"#;
        assert_eq!(
            repair(input).unwrap(),
            json!({"notes": ["Rest, then go again,]", "a: b"], "tip": "{x,}"})
        );
    }

    #[test]
    fn test_closed_strings_untouched_by_close_stage() {
        let input = r#"{"a": "x, y}", "b": "line\nbreak"}"#;
        assert_eq!(JsonRepairer::new().close_unterminated_values(input), input);
    }

    #[test]
    fn test_largest_balanced_span() {
        let input = r#"Draft {"a": 1} then final {"plan": {"title": "Full Body"}} done"#;
        assert_eq!(
            repair(input).unwrap(),
            json!({"plan": {"title": "Full Body"}})
        );
        assert_eq!(stage_of(input), RepairStage::BalancedBraces);
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let spans = JsonRepairer::new().balanced_spans(r#"x {"note": "use {braces}"} y"#);
        assert_eq!(spans, vec![r#"{"note": "use {braces}"}"#]);
    }

    #[test]
    fn test_unrecoverable_is_parse_error() {
        for input in ["", "no json here", "[1, 2, 3]", "{{{{", "\"just a string\""] {
            let err = repair(input).unwrap_err();
            assert!(matches!(err, FitError::Parse { .. }), "input: {input:?}");
        }
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i32>().prop_map(|n| json!(n)),
            any::<bool>().prop_map(|b| json!(b)),
            "[A-Za-z0-9 ,.:;!?()\"\\n{}\\[\\]-]{0,40}".prop_map(|s| json!(s)),
            Just(Value::Null),
        ]
    }

    fn object() -> impl Strategy<Value = serde_json::Map<String, Value>> {
        let leaf = prop::collection::btree_map("[a-z]{1,8}", scalar(), 0..6)
            .prop_map(|m| Value::Object(m.into_iter().collect()));
        let value = prop_oneof![
            scalar(),
            leaf,
            prop::collection::vec(scalar(), 0..4).prop_map(Value::Array),
        ];
        prop::collection::btree_map("[a-z]{1,8}", value, 0..6)
            .prop_map(|m| m.into_iter().collect())
    }

    proptest! {
        #[test]
        fn prop_well_formed_passthrough(fields in object()) {
            let expected = Value::Object(fields);
            let text = serde_json::to_string_pretty(&expected).unwrap();
            prop_assert_eq!(repair(&text).unwrap(), expected);
        }

        #[test]
        fn prop_trailing_comma_recovered(fields in object()) {
            prop_assume!(!fields.is_empty());
            let expected = Value::Object(fields);
            let text = serde_json::to_string(&expected).unwrap();
            let broken = format!("{},}}", &text[..text.len() - 1]);
            prop_assert_eq!(repair(&broken).unwrap(), expected);
        }

        #[test]
        fn prop_bare_keys_recovered(
            fields in prop::collection::btree_map("[a-z][a-z0-9_]{0,7}", any::<i64>(), 1..6)
        ) {
            let body: Vec<String> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
            let broken = format!("{{{}}}", body.join(", "));
            let expected = Value::Object(fields.into_iter().map(|(k, v)| (k, json!(v))).collect());
            prop_assert_eq!(repair(&broken).unwrap(), expected);
        }

        #[test]
        fn prop_bare_keys_with_prose_values_recovered(
            fields in prop::collection::btree_map("[a-z][a-zA-Z0-9_]{0,7}", "[A-Za-z ,:;.]{0,30}", 1..6)
        ) {
            let body: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{k}: {}", serde_json::to_string(v).unwrap()))
                .collect();
            let broken = format!("{{{}}}", body.join(", "));
            let expected = Value::Object(fields.into_iter().map(|(k, v)| (k, json!(v))).collect());
            prop_assert_eq!(repair(&broken).unwrap(), expected);
        }

        #[test]
        fn prop_prose_wrapped_recovered(fields in object(), lead in "[A-Za-z .]{0,20}", tail in "[A-Za-z .]{0,20}") {
            let expected = Value::Object(fields);
            let text = format!("{lead}{}{tail}", serde_json::to_string(&expected).unwrap());
            prop_assert_eq!(repair(&text).unwrap(), expected);
        }
    }
}
