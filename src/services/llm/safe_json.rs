//! Defensive JSON parsing for LLM output.
//!
//! Ported from `original_source/backend/src/utils/safe_json.py`: a
//! 4-stage cascade (direct parse, brace-extraction, trailing-comma /
//! unquoted-key repair, and the combination of the two) with a
//! structured error carrying the first 500 characters of the raw
//! response if every stage fails.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static TRAILING_COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").unwrap());
static UNQUOTED_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)([{,]\s*)(\w+)(\s*:)").unwrap());

#[derive(Debug)]
pub struct SafeJsonError {
    pub message: String,
    pub raw_excerpt: String,
}

/// Finds the first balanced `{...}` substring by brace counting.
pub fn extract_json(content: &str) -> Option<&str> {
    let bytes = content.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{')?;
    let mut depth = 0i32;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..start + offset + 1]);
                }
            },
            _ => {},
        }
    }
    None
}

/// Removes trailing commas before `}`/`]` and quotes bare object keys.
pub fn repair_json(content: &str) -> String {
    let no_trailing_commas = TRAILING_COMMA_RE.replace_all(content, "$1");
    UNQUOTED_KEY_RE.replace_all(&no_trailing_commas, "$1\"$2\"$3").to_string()
}

/// Strips common markdown code-fence wrappers an LLM may add.
fn strip_code_fences(content: &str) -> String {
    let mut s = content.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim().to_string()
}

/// 4-stage cascade: direct -> extract -> repair -> extract+repair.
/// Returns a structured error with a truncated raw excerpt if every
/// stage fails; never panics or propagates a parse error to the caller.
pub fn safe_load_json(raw: &str) -> Result<Value, SafeJsonError> {
    let content = strip_code_fences(raw);

    if let Ok(v) = serde_json::from_str::<Value>(&content) {
        return Ok(v);
    }

    if let Some(extracted) = extract_json(&content) {
        if let Ok(v) = serde_json::from_str::<Value>(extracted) {
            return Ok(v);
        }
        let repaired = repair_json(extracted);
        if let Ok(v) = serde_json::from_str::<Value>(&repaired) {
            return Ok(v);
        }
    }

    let repaired_whole = repair_json(&content);
    if let Ok(v) = serde_json::from_str::<Value>(&repaired_whole) {
        return Ok(v);
    }

    let excerpt: String = content.chars().take(500).collect();
    Err(SafeJsonError {
        message: "could not extract valid JSON from LLM response".to_string(),
        raw_excerpt: excerpt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_parse() {
        let v = safe_load_json(r#"{"a":1}"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn extracts_from_surrounding_prose() {
        let v = safe_load_json(r#"pre {"a":1} post"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn repairs_trailing_comma() {
        let v = safe_load_json(r#"{"a":1,}"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn nonsense_yields_a_structured_error() {
        let err = safe_load_json("nonsense").unwrap_err();
        assert!(!err.raw_excerpt.is_empty());
    }

    #[test]
    fn strips_markdown_fences() {
        let v = safe_load_json("```json\n{\"a\":1}\n```").unwrap();
        assert_eq!(v["a"], 1);
    }
}
