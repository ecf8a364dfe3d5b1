//! Lenient decoding of JSON answers from language models.
//!
//! Models wrap JSON in markdown fences, append commentary after the closing
//! brace and leave raw newlines inside strings. Everything here tolerates
//! those three habits and nothing more.

use crate::error::{DevlicaError, Result};
use crate::utils::text::truncate;
use serde::de::DeserializeOwned;
use serde::Deserialize;

const RAW_EXCERPT_LEN: usize = 500;

/// Grader verdict for one imitation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Comparison {
    pub score: f64,
    #[serde(default)]
    pub feedback: String,
}

/// Removes a surrounding markdown fence
///
/// Text that already starts with `{` is returned trimmed, so fences quoted
/// inside JSON strings survive. Unfenced prose is cut to its first `{`.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        return trimmed;
    }

    if let Some(rest) = trimmed.strip_prefix("```") {
        // language tag, on its own line or inline with the body
        let body = match rest.find('\n') {
            Some(i) => &rest[i + 1..],
            None => rest.strip_prefix("json").unwrap_or(rest),
        };
        let body = match body.rfind("```") {
            Some(i) => &body[..i],
            None => body,
        };
        let body = body.trim();
        return match body.find('{') {
            Some(i) if i > 0 => &body[i..],
            _ => body,
        };
    }

    match trimmed.find('{') {
        Some(i) => &trimmed[i..],
        None => trimmed,
    }
}

/// Escapes raw control characters inside JSON strings and doubles
/// backslashes that do not start a valid escape
pub fn sanitize_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }

        match c {
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\\' => match chars.peek() {
                Some(&next) if matches!(next, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u') => {
                    out.push('\\');
                    out.push(next);
                    chars.next();
                }
                _ => out.push_str("\\\\"),
            },
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Decodes the first JSON value in `text`, ignoring anything after it
fn decode_first<T: DeserializeOwned>(text: &str) -> serde_json::Result<T> {
    let mut de = serde_json::Deserializer::from_str(text);
    T::deserialize(&mut de)
}

/// Strict decode, then one retry on the sanitized text
///
/// `raw` is the untouched model output, quoted in the error.
pub(crate) fn decode_lenient<T: DeserializeOwned>(text: &str, raw: &str) -> Result<T> {
    match decode_first(text) {
        Ok(value) => Ok(value),
        Err(first) => decode_first(&sanitize_json(text)).map_err(|second| {
            DevlicaError::Parse(format!(
                "invalid JSON from model: {first} (after sanitizing: {second})\nraw response (first {RAW_EXCERPT_LEN} bytes): {}",
                truncate(raw, RAW_EXCERPT_LEN, "...")
            ))
        }),
    }
}

/// Parses a grader answer; the score is clamped to 0..=100
pub fn parse_comparison(raw: &str) -> Result<Comparison> {
    let mut comparison: Comparison = decode_lenient(strip_code_fences(raw), raw)?;
    if !comparison.score.is_finite() {
        return Err(DevlicaError::Parse(format!(
            "non-finite score in grader response: {}",
            truncate(raw, RAW_EXCERPT_LEN, "...")
        )));
    }
    comparison.score = comparison.score.clamp(0.0, 100.0);
    Ok(comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("{\"a\":1}", "{\"a\":1}" ; "bare object")]
    #[test_case("```json\n{\"a\":1}\n```", "{\"a\":1}" ; "json fence")]
    #[test_case("```\n{\"a\":1}\n```\nhope this helps", "{\"a\":1}" ; "fence with trailer")]
    #[test_case("Here you go: {\"a\":1}", "{\"a\":1}" ; "leading prose")]
    #[test_case("  {\"a\":\"```x```\"}  ", "{\"a\":\"```x```\"}" ; "inline fence kept")]
    #[test_case("```json {\"a\":1}```", "{\"a\":1}" ; "single line json fence")]
    #[test_case("```{\"a\":1}```", "{\"a\":1}" ; "single line bare fence")]
    #[test_case("no json here", "no json here" ; "nothing to strip")]
    fn test_strip_code_fences(input: &str, expected: &str) {
        assert_eq!(strip_code_fences(input), expected);
    }

    #[test_case("{\"a\":\"x\ny\"}", "{\"a\":\"x\\ny\"}" ; "raw newline")]
    #[test_case("{\"a\":\"tab\there\"}", "{\"a\":\"tab\\there\"}" ; "raw tab")]
    #[test_case("{\"a\":\"C:\\dir\"}", "{\"a\":\"C:\\\\dir\"}" ; "invalid escape")]
    #[test_case("{\"a\":\"ok \\\" \\n\"}", "{\"a\":\"ok \\\" \\n\"}" ; "valid escapes untouched")]
    #[test_case("{\n  \"a\": 1\n}", "{\n  \"a\": 1\n}" ; "whitespace outside strings")]
    fn test_sanitize_json(input: &str, expected: &str) {
        assert_eq!(sanitize_json(input), expected);
    }

    #[test]
    fn test_comparison_with_fences_and_trailer() {
        let raw = "```json\n{\"score\": 78, \"feedback\": \"close\"}\n```\nLet me know!";
        let comparison = parse_comparison(raw).unwrap();
        assert_eq!(comparison, Comparison { score: 78.0, feedback: "close".into() });
    }

    #[test]
    fn test_comparison_trailing_text_after_object() {
        let comparison = parse_comparison("{\"score\": 55.5, \"feedback\": \"meh\"} extra words").unwrap();
        assert_eq!(comparison.score, 55.5);
    }

    #[test]
    fn test_comparison_literal_newline_recovered() {
        let raw = "{\"score\": 40, \"feedback\": \"line one\nline two\"}";
        let comparison = parse_comparison(raw).unwrap();
        assert_eq!(comparison.feedback, "line one\nline two");
    }

    #[test]
    fn test_comparison_single_line_fence() {
        let comparison = parse_comparison("```json {\"score\": 90, \"feedback\": \"ok\"}```").unwrap();
        assert_eq!(comparison.score, 90.0);
        assert_eq!(comparison.feedback, "ok");
    }

    #[test_case("{\"score\": 140}", 100.0 ; "above range")]
    #[test_case("{\"score\": -3}", 0.0 ; "below range")]
    fn test_comparison_score_clamped(raw: &str, expected: f64) {
        assert_eq!(parse_comparison(raw).unwrap().score, expected);
    }

    #[test]
    fn test_comparison_error_quotes_raw() {
        let raw = format!("not json {}", "x".repeat(800));
        let err = parse_comparison(&raw).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("not json"));
        assert!(message.contains("..."));
        assert!(!message.contains(&"x".repeat(600)));
    }
}
