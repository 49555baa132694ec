//! Unified Error Model
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    #[error("REGISTRY/DUPLICATE: tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("REGISTRY/UNKNOWN: tool '{0}' is not registered")]
    UnknownTool(String),

    #[error("INPUT/MISSING: {tool} is missing required inputs {missing:?}")]
    MissingInputs { tool: String, missing: Vec<String> },

    #[error("PROVIDER/{provider}: {message}")]
    ProviderInvocation { provider: String, message: String },

    #[error("PROVIDER/EXHAUSTED: all {attempts} providers failed, last error: {last_error}")]
    AllProvidersFailed { attempts: usize, last_error: String },

    #[error("{0}")]
    OutputContractViolation(ContractViolation),

    #[error("OUTPUT/PARSE: {0}")]
    InvalidOutput(String),

    #[error("TOOL/EXEC: {0}")]
    Execution(String),

    #[error("TEMPLATE/{0}")]
    Template(String),

    #[error("CONFIG/{0}")]
    Config(String),
}

/// Ways a tool result can break its declared output contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractViolation {
    #[error("Missing expected outputs: {0:?}")]
    MissingKeys(Vec<String>),

    #[error("SCHEMA/MISMATCH at {path}: {reason}")]
    Shape { path: String, reason: String },
}

impl OrchestratorError {
    pub fn missing_outputs(keys: Vec<String>) -> Self {
        Self::OutputContractViolation(ContractViolation::MissingKeys(keys))
    }

    pub fn shape(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OutputContractViolation(ContractViolation::Shape {
            path: path.into(),
            reason: reason.into(),
        })
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_outputs_display() {
        let err = OrchestratorError::missing_outputs(vec!["z".to_string()]);
        assert_eq!(err.to_string(), r#"Missing expected outputs: ["z"]"#);
    }

    #[test]
    fn test_exhausted_display_carries_last_error() {
        let err = OrchestratorError::AllProvidersFailed {
            attempts: 2,
            last_error: "PROVIDER/nvidia: empty response".to_string(),
        };
        assert!(err.to_string().contains("empty response"));
    }
}
