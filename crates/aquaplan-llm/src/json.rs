//! Pull a JSON object out of free-form model text.
use serde_json::Value;

use aquaplan_core::{OrchestratorError, OrchestratorResult};

/// Parse the response as JSON. Accepts bare JSON, fenced ```json blocks and
/// an object embedded in prose (outermost `{ ... }`).
pub fn extract_json(text: &str) -> OrchestratorResult<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    if let Some(inner) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(inner) {
            return Ok(value);
        }
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&trimmed[start..=end])
            .map_err(|e| OrchestratorError::InvalidOutput(e.to_string())),
        _ => Err(OrchestratorError::InvalidOutput(
            "response contains no JSON object".to_string(),
        )),
    }
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    // Skip the info string (`json`, `JSON`, ...)
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_json() {
        assert_eq!(extract_json(r#" {"a": 1} "#).unwrap(), json!({ "a": 1 }));
    }

    #[test]
    fn test_fenced_json() {
        let text = "Here you go:\n```json\n{\"lab_analysis\": {\"violations\": []}}\n```\nThanks";
        assert_eq!(
            extract_json(text).unwrap(),
            json!({ "lab_analysis": { "violations": [] } })
        );
    }

    #[test]
    fn test_embedded_object() {
        let text = "The result is {\"total\": 12.5} as computed.";
        assert_eq!(extract_json(text).unwrap(), json!({ "total": 12.5 }));
    }

    #[test]
    fn test_no_json() {
        let err = extract_json("I cannot help with that.").unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidOutput(_)));
    }

    #[test]
    fn test_broken_json() {
        assert!(extract_json("{\"a\": }").is_err());
    }
}
