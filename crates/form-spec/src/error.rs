use thiserror::Error;

use crate::validate::{SchemaReport, ValidationError, ValidationResult};

/// Failure to read a serialized schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse form schema: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Errors produced while driving a form session.
#[derive(Debug, Error)]
pub enum FormError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("form schema rejected: {}", .0.summary())]
    InvalidSchema(SchemaReport),
    #[error("field '{0}' is not part of the form")]
    UnknownField(String),
    #[error("field '{0}' is disabled")]
    FieldDisabled(String),
    #[error("field '{name}' expects {expected} input, got {got}")]
    InputMismatch {
        name: String,
        expected: &'static str,
        got: &'static str,
    },
    #[error("field '{name}' has no option with value '{value}'")]
    UnknownOption { name: String, value: String },
    #[error("field '{name}' cannot take {message}")]
    InvalidValue { name: String, message: String },
    #[error("field '{0}' cannot be cleared")]
    NotClearable(String),
    #[error("field '{0}' is not an inline group")]
    NotInlineGroup(String),
    #[error("inline group '{field}' has no group {group}")]
    GroupOutOfRange { field: String, group: usize },
    #[error("inline entry for '{field}' is missing required fields: {}", .missing.join(", "))]
    EntryIncomplete { field: String, missing: Vec<String> },
    #[error("inline entry for '{field}' has invalid values: {}", describe(.errors))]
    EntryInvalid {
        field: String,
        errors: Vec<ValidationError>,
    },
    #[error("submission blocked: {}", .0.summary())]
    Validation(ValidationResult),
}

fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|error| format!("{} ({})", error.field, error.message))
        .collect::<Vec<_>>()
        .join(", ")
}
