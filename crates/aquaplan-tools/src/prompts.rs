//! Prompt library: YAML file of named handlebars templates.
//!
//! `prompts` hold the system/user pair sent to the model for each tool.
//! `documents` hold Markdown layouts rendered from tool outputs for the
//! downstream PDF renderer.
//!
//! Helpers:
//! - json: dump a value as pretty JSON
//! - money: format a number with two decimals and thousands separators
//! - percent: format a ratio (0.16 -> "16%")
//! - inc: add one to an index

use std::collections::HashMap;

use handlebars::{handlebars_helper, no_escape, Handlebars};
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::Value;

use aquaplan_core::{OrchestratorError, OrchestratorResult};
use aquaplan_llm::Prompt;

const EMBEDDED_PROMPTS: &str = include_str!("../prompts/water_treatment.yaml");

static EMBEDDED: Lazy<OrchestratorResult<PromptFile>> =
    Lazy::new(|| PromptFile::from_yaml(EMBEDDED_PROMPTS));

#[derive(Debug, Clone, Deserialize)]
pub struct PromptFile {
    pub version: String,
    pub prompts: HashMap<String, PromptTemplate>,
    #[serde(default)]
    pub documents: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptTemplate {
    pub description: String,
    #[serde(default)]
    pub system: String,
    pub user: String,
}

impl PromptFile {
    pub fn load(path: &str) -> OrchestratorResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| OrchestratorError::Template(format!("failed to read {}: {}", path, e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> OrchestratorResult<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| OrchestratorError::Template(format!("invalid prompt library: {}", e)))
    }
}

handlebars_helper!(json_helper: |v: Json| serde_json::to_string_pretty(v).unwrap_or_default());
handlebars_helper!(money_helper: |v: f64| format_money(v));
handlebars_helper!(percent_helper: |v: f64| format!("{}%", (v * 100.0).round() as i64));
handlebars_helper!(inc_helper: |v: u64| v + 1);

/// Compiled prompt library with helpers registered.
pub struct PromptLibrary {
    handlebars: Handlebars<'static>,
    file: PromptFile,
}

impl PromptLibrary {
    pub fn new(file: PromptFile) -> OrchestratorResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Prompts and Markdown are not HTML
        handlebars.register_escape_fn(no_escape);

        handlebars.register_helper("json", Box::new(json_helper));
        handlebars.register_helper("money", Box::new(money_helper));
        handlebars.register_helper("percent", Box::new(percent_helper));
        handlebars.register_helper("inc", Box::new(inc_helper));

        for (name, template) in &file.prompts {
            register(&mut handlebars, &format!("{}.system", name), &template.system)?;
            register(&mut handlebars, &format!("{}.user", name), &template.user)?;
        }
        for (name, template) in &file.documents {
            register(&mut handlebars, &format!("doc.{}", name), template)?;
        }

        Ok(Self { handlebars, file })
    }

    /// The library shipped with the crate.
    pub fn embedded() -> OrchestratorResult<Self> {
        Self::new(EMBEDDED.clone()?)
    }

    pub fn load(path: &str) -> OrchestratorResult<Self> {
        Self::new(PromptFile::load(path)?)
    }

    pub fn version(&self) -> &str {
        &self.file.version
    }

    pub fn has_prompt(&self, name: &str) -> bool {
        self.file.prompts.contains_key(name)
    }

    /// Render the system/user pair of a named prompt.
    pub fn render(&self, name: &str, data: &Value) -> OrchestratorResult<Prompt> {
        if !self.has_prompt(name) {
            return Err(OrchestratorError::Template(format!("unknown prompt '{}'", name)));
        }
        let system = self.render_named(&format!("{}.system", name), data)?;
        let user = self.render_named(&format!("{}.user", name), data)?;
        Ok(Prompt::new(system, user))
    }

    /// Render a Markdown document layout.
    pub fn render_document(&self, name: &str, data: &Value) -> OrchestratorResult<String> {
        if !self.file.documents.contains_key(name) {
            return Err(OrchestratorError::Template(format!("unknown document '{}'", name)));
        }
        self.render_named(&format!("doc.{}", name), data)
    }

    fn render_named(&self, template: &str, data: &Value) -> OrchestratorResult<String> {
        self.handlebars
            .render(template, data)
            .map_err(|e| OrchestratorError::Template(format!("render error in {}: {}", template, e)))
    }
}

fn register(handlebars: &mut Handlebars<'static>, name: &str, template: &str) -> OrchestratorResult<()> {
    handlebars
        .register_template_string(name, template)
        .map_err(|e| OrchestratorError::Template(format!("invalid template {}: {}", name, e)))
}

/// 1234567.5 -> "1,234,567.50"
pub fn format_money(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, grouped, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedded_library_has_every_tool_prompt() {
        let library = PromptLibrary::embedded().unwrap();
        for name in [
            "analyse_lab_report",
            "treatment_recommendation",
            "ro_sizing",
            "quotation_generator",
            "proposal_generator",
        ] {
            assert!(library.has_prompt(name), "missing prompt {}", name);
        }
    }

    #[test]
    fn test_json_helper_is_not_escaped() {
        let library = PromptLibrary::embedded().unwrap();
        let prompt = library
            .render(
                "treatment_recommendation",
                &json!({
                    "customer_request": { "water_usage": "drinking & cooking" },
                    "lab_analysis": { "violations": [] }
                }),
            )
            .unwrap();
        assert!(prompt.user.contains("\"water_usage\": \"drinking & cooking\""));
        assert!(prompt.system.contains("treatment_plan"));
    }

    #[test]
    fn test_unknown_prompt() {
        let library = PromptLibrary::embedded().unwrap();
        assert!(matches!(
            library.render("nope", &json!({})),
            Err(OrchestratorError::Template(_))
        ));
    }

    #[test]
    fn test_custom_library() {
        let yaml = r#"
version: "test"
prompts:
  echo:
    description: Echo
    user: "Say {{word}}"
"#;
        let library = PromptLibrary::new(PromptFile::from_yaml(yaml).unwrap()).unwrap();
        let prompt = library.render("echo", &json!({ "word": "hi" })).unwrap();
        assert_eq!(prompt.user, "Say hi");
        assert!(prompt.system.is_empty());
        assert_eq!(library.version(), "test");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0.0), "0.00");
        assert_eq!(format_money(999.999), "1,000.00");
        assert_eq!(format_money(1234567.5), "1,234,567.50");
        assert_eq!(format_money(-42.1), "-42.10");
    }
}
