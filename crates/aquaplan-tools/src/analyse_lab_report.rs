//! Lab report analysis: customer parameters vs. the selected guideline.
//!
//! Before the model is called, a mechanical screening compares every
//! numeric parameter with the guideline limits. The model confirms or
//! corrects it and adds the judgement calls (usage mismatch, unit
//! conversions, missing guidelines).
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Value};

use aquaplan_core::{OrchestratorResult, OutputSchema, ToolInput, ToolOutput, ToolSpec};

use crate::fields::{number, round_to, section_mut};
use crate::llm_tool::ToolDefinition;
use crate::prompts::PromptLibrary;

pub const NAME: &str = "analyse_lab_report";

static OUT_SCHEMA: Lazy<Vec<u8>> = Lazy::new(|| include_bytes!("../schemas/analyse_lab_report.out.json").to_vec());

/// Parameters whose violation is a health risk.
const VITAL_PARAMETERS: &[&str] = &["ph", "lead", "nitrate", "fluoride", "arsenic", "mercury"];

pub fn definition() -> OrchestratorResult<ToolDefinition> {
    Ok(ToolDefinition {
        spec: ToolSpec::new(NAME)
            .requires(["customer_request", "guideline"])
            .provides(["lab_analysis"])
            .description("Compares the customer's lab report against the water guideline and flags violations")
            .output_schema(OutputSchema::from_slice(&OUT_SCHEMA)?),
        prompt: NAME,
        prepare,
        finish,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Warning,
}

impl Severity {
    pub fn for_parameter(name: &str) -> Self {
        let lowered = name.to_lowercase();
        if VITAL_PARAMETERS.iter().any(|p| lowered == *p || lowered.starts_with(&format!("{} ", p))) {
            Severity::Critical
        } else {
            Severity::Warning
        }
    }

    /// Read a model-supplied label such as "❌ CRITICAL" or "warning".
    pub fn parse_label(label: &str) -> Self {
        if label.to_uppercase().contains("CRIT") {
            Severity::Critical
        } else {
            Severity::Warning
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Warning => "WARNING",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateViolation {
    pub parameter: String,
    pub customer_value: f64,
    pub unit: String,
    pub guideline_min: Option<f64>,
    pub guideline_max: Option<f64>,
    pub violation_amount: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Screening {
    pub usage_exact: Option<bool>,
    pub candidate_violations: Vec<CandidateViolation>,
    pub within_limits: Vec<String>,
    pub missing_guidelines: Vec<String>,
    pub unit_mismatches: Vec<String>,
    pub unreadable_values: Vec<String>,
}

/// Mechanically compare lab parameters with guideline limits.
pub fn screen(request: &Value, guideline: &Value) -> Screening {
    let mut screening = Screening {
        usage_exact: usage_exact(request, guideline),
        ..Screening::default()
    };
    let limits = parameters(guideline);

    for param in parameters(request) {
        let Some(name) = param.get("name").and_then(Value::as_str) else {
            continue;
        };
        let Some(value) = number(param.get("value")) else {
            screening.unreadable_values.push(name.to_string());
            continue;
        };
        let Some(limit) = limits.iter().find(|l| same_name(l, name)) else {
            screening.missing_guidelines.push(name.to_string());
            continue;
        };

        let unit = param.get("unit").and_then(Value::as_str).unwrap_or_default();
        let limit_unit = limit.get("unit").and_then(Value::as_str).unwrap_or_default();
        if !unit.is_empty() && !limit_unit.is_empty() && normalize_unit(unit) != normalize_unit(limit_unit) {
            screening
                .unit_mismatches
                .push(format!("{}: customer '{}' vs guideline '{}'", name, unit, limit_unit));
        }

        let min = number(limit.get("min_value"));
        let max = number(limit.get("max_value"));
        let amount = match (min, max) {
            (Some(min), _) if value < min => Some(min - value),
            (_, Some(max)) if value > max => Some(value - max),
            _ => None,
        };

        match amount {
            Some(amount) => screening.candidate_violations.push(CandidateViolation {
                parameter: name.to_string(),
                customer_value: value,
                unit: unit.to_string(),
                guideline_min: min,
                guideline_max: max,
                violation_amount: round_to(amount, 4),
                severity: Severity::for_parameter(name),
            }),
            None => screening.within_limits.push(name.to_string()),
        }
    }

    screening
}

/// Lab parameters live either at the top level or under `lab_report`.
fn parameters(source: &Value) -> Vec<&Value> {
    source
        .get("parameters")
        .or_else(|| source.pointer("/lab_report/parameters"))
        .and_then(Value::as_array)
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

fn same_name(limit: &Value, name: &str) -> bool {
    limit
        .get("name")
        .and_then(Value::as_str)
        .map(|n| n.trim().eq_ignore_ascii_case(name.trim()))
        .unwrap_or(false)
}

fn normalize_unit(unit: &str) -> String {
    match unit.trim().to_lowercase().as_str() {
        "ppm" | "mg/l" | "mg/litre" | "mg/liter" => "mg/l".to_string(),
        "us/cm" | "μs/cm" | "µs/cm" => "us/cm".to_string(),
        other => other.to_string(),
    }
}

fn usage_exact(request: &Value, guideline: &Value) -> Option<bool> {
    let requested = request.get("water_usage").and_then(Value::as_str)?;
    let usage = guideline.get("usage").and_then(Value::as_str)?;
    Some(requested.trim().eq_ignore_ascii_case(usage.trim()))
}

fn prepare(input: &ToolInput) -> OrchestratorResult<Value> {
    let empty = Value::Null;
    let request = input.get("customer_request").unwrap_or(&empty);
    let guideline = input.get("guideline").unwrap_or(&empty);
    Ok(json!({
        "customer_request": request,
        "guideline": guideline,
        "screening": screen(request, guideline),
    }))
}

/// Normalise severity labels to `CRITICAL` / `WARNING`.
fn finish(_: &PromptLibrary, _: &ToolInput, mut output: ToolOutput) -> OrchestratorResult<ToolOutput> {
    let analysis = section_mut(&mut output, "lab_analysis")?;
    if let Some(violations) = analysis.get_mut("violations").and_then(Value::as_array_mut) {
        for violation in violations.iter_mut().filter_map(Value::as_object_mut) {
            let label = violation
                .get("severity")
                .and_then(Value::as_str)
                .map(Severity::parse_label)
                .unwrap_or(Severity::Warning);
            violation.insert("severity".to_string(), json!(label.as_str()));
        }
    }
    Ok(output)
}
