use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw submitted fields, as decoded from an urlencoded request body.
pub type FormData = BTreeMap<String, String>;

/// Validated values keyed by field name.
pub type CleanedData = BTreeMap<String, FieldValue>;

/// Validation messages keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// A cleaned field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(value) => write!(f, "{value}"),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

/// Something a choice step can build forms from, either empty or bound to a submission.
pub trait FormClass: Send + Sync {
    fn name(&self) -> &str;
    fn unbound(&self) -> Box<dyn StepForm>;
    fn bind(&self, data: &FormData) -> Box<dyn StepForm>;
}

/// A single form instance owned by the request handling it.
pub trait StepForm: Send {
    fn is_bound(&self) -> bool;

    /// Cleans the bound data on first call. Unbound forms are never valid.
    fn is_valid(&mut self) -> bool;

    /// Values that passed validation. Empty until `is_valid` has run.
    fn cleaned_data(&self) -> &CleanedData;

    fn errors(&self) -> &FieldErrors;

    /// Serializable view handed to the renderer.
    fn context(&self) -> FormContext;

    /// True when the form is backed by a record store and must be saved once valid.
    fn is_persistable(&self) -> bool {
        false
    }

    fn save(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormContext {
    pub name: String,
    pub bound: bool,
    pub fields: Vec<FieldContext>,
    pub errors: FieldErrors,
}

impl FormContext {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldContext {
    pub name: String,
    pub label: String,
    pub kind: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoiceContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceContext {
    pub value: String,
    pub label: String,
}

/// Record written when a store-backed form is saved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSubmission {
    pub form: String,
    pub cleaned_data: CleanedData,
    pub saved_at: DateTime<Utc>,
}

/// Persistence boundary for store-backed forms.
pub trait SubmissionStore: Send + Sync {
    fn save(&self, submission: FormSubmission) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("form {0} has not been validated")]
    NotValidated(String),
    #[error("submission store unavailable: {0}")]
    Unavailable(String),
}
