//! Sanitize-then-parse for model replies.
//!
//! Models are asked for bare JSON but often wrap it in a markdown fence or
//! surround it with a sentence. `sanitize_model_output` removes a leading
//! fence; `parse_model_json` parses the sanitized text and, failing that,
//! the outermost `{...}` span.

use serde_json::Value;

/// Strip a surrounding markdown code fence (```` ``` ```` or ```` ```json ````).
pub fn sanitize_model_output(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (`json`, `JSON`, ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

pub fn parse_model_json(raw: &str) -> Result<Value, serde_json::Error> {
    let cleaned = sanitize_model_output(raw);
    match serde_json::from_str(cleaned) {
        Ok(value) => Ok(value),
        Err(err) => match (cleaned.find('{'), cleaned.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str(&cleaned[start..=end]).map_err(|_| err)
            }
            _ => Err(err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json() {
        assert_eq!(parse_model_json(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_fenced_json_with_language_tag() {
        let raw = "```json\n{\"commands\": [\"uptime\"]}\n```";
        assert_eq!(sanitize_model_output(raw), "{\"commands\": [\"uptime\"]}");
        assert_eq!(
            parse_model_json(raw).unwrap(),
            json!({"commands": ["uptime"]})
        );
    }

    #[test]
    fn test_bare_fence() {
        let raw = "```\n{\"ok\": true}\n```\n";
        assert_eq!(parse_model_json(raw).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn test_json_inside_prose() {
        let raw = "Here is the plan: {\"description\": \"x\"} hope it helps";
        assert_eq!(parse_model_json(raw).unwrap(), json!({"description": "x"}));
    }

    #[test]
    fn test_garbage_fails() {
        assert!(parse_model_json("definitely not json").is_err());
    }
}
