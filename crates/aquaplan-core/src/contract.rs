//! Output contracts: JSON Schema documents checked at the invoker boundary.
//!
//! A contract is compiled once when the tool is defined. Validation reports
//! the first error with the JSON pointer of the offending instance, so the
//! failing field can be located in the model output.

use std::fmt;
use std::sync::Arc;

use jsonschema::JSONSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{OrchestratorError, OrchestratorResult};

/// A compiled JSON Schema plus the document it was compiled from.
#[derive(Clone)]
pub struct OutputSchema {
    document: Value,
    compiled: Arc<JSONSchema>,
}

impl OutputSchema {
    pub fn compile(document: Value) -> OrchestratorResult<Self> {
        let compiled = JSONSchema::compile(&document)
            .map_err(|e| OrchestratorError::Config(format!("invalid output schema: {}", e)))?;
        Ok(Self {
            document,
            compiled: Arc::new(compiled),
        })
    }

    /// Compile an embedded `*.out.json` document.
    pub fn from_slice(bytes: &[u8]) -> OrchestratorResult<Self> {
        let document = serde_json::from_slice(bytes)
            .map_err(|e| OrchestratorError::Config(format!("output schema is not JSON: {}", e)))?;
        Self::compile(document)
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Validate `value`, failing with the first violation found.
    pub fn validate(&self, value: &Value) -> OrchestratorResult<()> {
        let first = match self.compiled.validate(value) {
            Ok(()) => return Ok(()),
            Err(mut errors) => errors.next(),
        };
        match first {
            Some(error) => {
                let path = error.instance_path.to_string();
                let path = if path.is_empty() { "/".to_string() } else { path };
                Err(OrchestratorError::shape(path, error.to_string()))
            }
            None => Ok(()),
        }
    }
}

impl fmt::Debug for OutputSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OutputSchema").field(&self.document).finish()
    }
}

impl PartialEq for OutputSchema {
    fn eq(&self, other: &Self) -> bool {
        self.document == other.document
    }
}

impl Serialize for OutputSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.document.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for OutputSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = Value::deserialize(deserializer)?;
        Self::compile(document).map_err(serde::de::Error::custom)
    }
}
