//! Small accessors shared by the tool post-processors.
use serde_json::{Map, Value};

use aquaplan_core::{OrchestratorError, OrchestratorResult, ToolInput, ToolOutput};

/// Mutable access to the object stored under `key`.
pub(crate) fn section_mut<'a>(
    output: &'a mut ToolOutput,
    key: &str,
) -> OrchestratorResult<&'a mut Map<String, Value>> {
    output
        .get_mut(key)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| OrchestratorError::shape(format!("/{}", key), "expected object"))
}

/// Numeric value that may arrive as a JSON number or a numeric string.
pub(crate) fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Customer display name from the `customer_request` seed.
pub(crate) fn client_name(input: &ToolInput) -> String {
    let request = input.get("customer_request");
    request
        .and_then(|r| r.get("customer_name"))
        .or_else(|| request.and_then(|r| r.pointer("/customer/name")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "Valued Client".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_accepts_strings() {
        assert_eq!(number(Some(&json!("7.2"))), Some(7.2));
        assert_eq!(number(Some(&json!(3))), Some(3.0));
        assert_eq!(number(Some(&json!("n/a"))), None);
        assert_eq!(number(None), None);
    }

    #[test]
    fn test_client_name_fallbacks() {
        let input = json!({ "customer_request": { "customer": { "name": "Kisumu Bottlers" } } });
        assert_eq!(client_name(input.as_object().unwrap()), "Kisumu Bottlers");
        assert_eq!(client_name(&ToolInput::new()), "Valued Client");
    }
}
