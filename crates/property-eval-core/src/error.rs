use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One rejected request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub reason: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Invalid input: {}", join_issues(.issues))]
    Validation { issues: Vec<FieldIssue> },

    #[error("Computation failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    Computation {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Invalid configuration: {option} ({reason})")]
    Configuration { option: String, reason: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl EvalError {
    /// Single-field validation failure.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EvalError::Validation {
            issues: vec![FieldIssue::new(field, reason)],
        }
    }

    pub fn configuration(option: impl Into<String>, reason: impl Into<String>) -> Self {
        EvalError::Configuration {
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Fields named by a validation failure, empty for every other variant.
    pub fn invalid_fields(&self) -> Vec<&str> {
        match self {
            EvalError::Validation { issues } => issues.iter().map(|i| i.field.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for EvalError {
    fn from(e: serde_json::Error) -> Self {
        EvalError::Serialization(e.to_string())
    }
}
