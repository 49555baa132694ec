//! Quotation pricing and layout.
//!
//! The model picks line items and unit prices. Arithmetic, reference
//! numbers and dates are filled in here, then the quotation is laid out
//! as Markdown for the PDF renderer.
use chrono::{Duration, Local, NaiveDateTime};
use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};

use aquaplan_core::{OrchestratorError, OrchestratorResult, OutputSchema, ToolInput, ToolOutput, ToolSpec};

use crate::fields::{client_name, number, round_to, section_mut};
use crate::llm_tool::{passthrough_input, ToolDefinition};
use crate::prompts::PromptLibrary;

pub const NAME: &str = "quotation_generator";

static OUT_SCHEMA: Lazy<Vec<u8>> = Lazy::new(|| include_bytes!("../schemas/quotation_generator.out.json").to_vec());

pub const DEFAULT_TAX_RATE: f64 = 0.16;
pub const DEFAULT_VALIDITY_DAYS: i64 = 30;
/// Longest validity a quotation may carry.
pub const MAX_VALIDITY_DAYS: i64 = 365;
const DEFAULT_CURRENCY: &str = "KES";

pub fn definition() -> OrchestratorResult<ToolDefinition> {
    Ok(ToolDefinition {
        spec: ToolSpec::new(NAME)
            .requires(["customer_request", "treatment_plan", "ro_sizing"])
            .provides(["quotation"])
            .description("Prices the recommended system and lays out the quotation")
            .output_schema(OutputSchema::from_slice(&OUT_SCHEMA)?),
        prompt: NAME,
        prepare: passthrough_input,
        finish,
    })
}

fn finish(prompts: &PromptLibrary, input: &ToolInput, mut output: ToolOutput) -> OrchestratorResult<ToolOutput> {
    let quotation = section_mut(&mut output, "quotation")?;
    issue(quotation, &client_name(input), Local::now().naive_local())?;
    let markdown = prompts.render_document("quotation_markdown", &Value::Object(quotation.clone()))?;
    quotation.insert("markdown".to_string(), json!(markdown));
    Ok(output)
}

/// Fill in totals, reference and dates.
pub fn issue(quotation: &mut Map<String, Value>, client: &str, now: NaiveDateTime) -> OrchestratorResult<()> {
    let items = quotation
        .get_mut("line_items")
        .and_then(Value::as_array_mut)
        .filter(|items| !items.is_empty())
        .ok_or_else(|| OrchestratorError::Execution("quotation has no line items".to_string()))?;

    let mut subtotal = 0.0;
    for item in items.iter_mut().filter_map(Value::as_object_mut) {
        let quantity = number(item.get("quantity")).unwrap_or(0.0);
        let unit_price = number(item.get("unit_price")).unwrap_or(0.0);
        let total = round_to(quantity * unit_price, 2);
        subtotal += total;
        item.insert("quantity".to_string(), whole_or_fraction(quantity));
        item.insert("unit_price".to_string(), json!(unit_price));
        item.insert("total".to_string(), json!(total));
    }

    let subtotal = round_to(subtotal, 2);
    let tax_rate = number(quotation.get("tax_rate")).unwrap_or(DEFAULT_TAX_RATE);
    let tax = round_to(subtotal * tax_rate, 2);
    let validity_days = validity_days(quotation.get("validity_days"))?;
    let valid_until = Duration::try_days(validity_days)
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| {
            OrchestratorError::Execution(format!("validity of {} days is out of range", validity_days))
        })?;

    if quotation.get("currency").and_then(Value::as_str).is_none() {
        quotation.insert("currency".to_string(), json!(DEFAULT_CURRENCY));
    }
    quotation.insert("subtotal".to_string(), json!(subtotal));
    quotation.insert("tax_rate".to_string(), json!(tax_rate));
    quotation.insert("tax".to_string(), json!(tax));
    quotation.insert("total".to_string(), json!(round_to(subtotal + tax, 2)));
    quotation.insert("validity_days".to_string(), json!(validity_days));
    quotation.insert("client_name".to_string(), json!(client));
    quotation.insert("reference".to_string(), json!(now.format("Q-%Y%m%d-%H%M").to_string()));
    quotation.insert("issued_on".to_string(), json!(now.format("%d %B %Y").to_string()));
    quotation.insert("valid_until".to_string(), json!(valid_until.format("%d %B %Y").to_string()));
    Ok(())
}

/// Whole days of validity. Missing or sub-day values fall back to the default.
fn validity_days(value: Option<&Value>) -> OrchestratorResult<i64> {
    match number(value).filter(|d| *d >= 1.0) {
        None => Ok(DEFAULT_VALIDITY_DAYS),
        Some(days) if days > MAX_VALIDITY_DAYS as f64 => Err(OrchestratorError::Execution(format!(
            "quotation validity of {} days exceeds {} days",
            days, MAX_VALIDITY_DAYS
        ))),
        Some(days) => Ok(days.trunc() as i64),
    }
}

/// Quantities print as "4", not "4.0".
fn whole_or_fraction(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        json!(value as i64)
    } else {
        json!(value)
    }
}
