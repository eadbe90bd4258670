//! Declarative forms made of choice and boolean fields.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use super::form::{
    ChoiceContext, CleanedData, FieldContext, FieldErrors, FieldValue, FormClass, FormContext,
    FormData, FormSubmission, StepForm, StoreError, SubmissionStore,
};

const REQUIRED_MESSAGE: &str = "This field is required.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Fixed `(value, label)` options; cleans to `FieldValue::Text`.
    Choice(Vec<(String, String)>),
    /// Accepts true/false, on/off, yes/no and 1/0; cleans to `FieldValue::Bool`.
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    name: String,
    label: String,
    required: bool,
    kind: FieldKind,
}

impl FormField {
    pub fn choice(name: impl Into<String>, choices: &[(&str, &str)]) -> Self {
        let choices = choices
            .iter()
            .map(|(value, label)| (value.to_string(), label.to_string()))
            .collect();
        Self::new(name, FieldKind::Choice(choices))
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            label: name.replace('_', " "),
            name,
            required: true,
            kind,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// `Ok(None)` means an optional field was left empty.
    fn clean(&self, raw: Option<&str>) -> Result<Option<FieldValue>, String> {
        let raw = match raw.map(str::trim).filter(|value| !value.is_empty()) {
            Some(raw) => raw,
            None if self.required => return Err(REQUIRED_MESSAGE.to_string()),
            None => return Ok(None),
        };

        match &self.kind {
            FieldKind::Choice(choices) => {
                if choices.iter().any(|(value, _)| value == raw) {
                    Ok(Some(FieldValue::Text(raw.to_string())))
                } else {
                    Err(format!(
                        "Select a valid choice. {raw} is not one of the available choices."
                    ))
                }
            }
            FieldKind::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Ok(Some(FieldValue::Bool(true))),
                "false" | "off" | "no" | "0" => Ok(Some(FieldValue::Bool(false))),
                _ => Err(format!("{raw} is not a yes or no answer.")),
            },
        }
    }

    fn context(&self, value: Option<&String>) -> FieldContext {
        let (kind, choices) = match &self.kind {
            FieldKind::Choice(choices) => (
                "choice",
                choices
                    .iter()
                    .map(|(value, label)| ChoiceContext {
                        value: value.clone(),
                        label: label.clone(),
                    })
                    .collect(),
            ),
            FieldKind::Boolean => ("boolean", Vec::new()),
        };

        FieldContext {
            name: self.name.clone(),
            label: self.label.clone(),
            kind,
            required: self.required,
            value: value.cloned(),
            choices,
        }
    }
}

/// Form class built from a list of fields, optionally saved to a store once valid.
#[derive(Clone)]
pub struct ChoiceForm {
    name: String,
    fields: Arc<[FormField]>,
    store: Option<Arc<dyn SubmissionStore>>,
}

impl ChoiceForm {
    pub fn new(name: impl Into<String>, fields: Vec<FormField>) -> Self {
        Self {
            name: name.into(),
            fields: fields.into(),
            store: None,
        }
    }

    /// Makes the form store-backed: every valid submission is saved once.
    pub fn persisted_to(mut self, store: Arc<dyn SubmissionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    fn instance(&self, data: Option<FormData>) -> BoundChoiceForm {
        BoundChoiceForm {
            form: self.clone(),
            data,
            cleaned: CleanedData::new(),
            errors: FieldErrors::new(),
            validated: false,
        }
    }
}

impl fmt::Debug for ChoiceForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChoiceForm")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("persisted", &self.store.is_some())
            .finish()
    }
}

impl FormClass for ChoiceForm {
    fn name(&self) -> &str {
        &self.name
    }

    fn unbound(&self) -> Box<dyn StepForm> {
        Box::new(self.instance(None))
    }

    fn bind(&self, data: &FormData) -> Box<dyn StepForm> {
        Box::new(self.instance(Some(data.clone())))
    }
}

struct BoundChoiceForm {
    form: ChoiceForm,
    data: Option<FormData>,
    cleaned: CleanedData,
    errors: FieldErrors,
    validated: bool,
}

impl BoundChoiceForm {
    fn full_clean(&mut self) {
        let Some(data) = &self.data else {
            return;
        };

        for field in self.form.fields.iter() {
            match field.clean(data.get(field.name()).map(String::as_str)) {
                Ok(Some(value)) => {
                    self.cleaned.insert(field.name.clone(), value);
                }
                Ok(None) => {}
                Err(message) => {
                    self.errors
                        .entry(field.name.clone())
                        .or_default()
                        .push(message);
                }
            }
        }
    }
}

impl StepForm for BoundChoiceForm {
    fn is_bound(&self) -> bool {
        self.data.is_some()
    }

    fn is_valid(&mut self) -> bool {
        if !self.validated {
            self.full_clean();
            self.validated = true;
        }
        self.is_bound() && self.errors.is_empty()
    }

    fn cleaned_data(&self) -> &CleanedData {
        &self.cleaned
    }

    fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    fn context(&self) -> FormContext {
        let fields = self
            .form
            .fields
            .iter()
            .map(|field| {
                let value = self.data.as_ref().and_then(|data| data.get(field.name()));
                field.context(value)
            })
            .collect();

        FormContext {
            name: self.form.name.clone(),
            bound: self.is_bound(),
            fields,
            errors: self.errors.clone(),
        }
    }

    fn is_persistable(&self) -> bool {
        self.form.store.is_some()
    }

    fn save(&mut self) -> Result<(), StoreError> {
        let Some(store) = &self.form.store else {
            return Ok(());
        };
        if !self.validated || !self.errors.is_empty() || !self.is_bound() {
            return Err(StoreError::NotValidated(self.form.name.clone()));
        }

        store.save(FormSubmission {
            form: self.form.name.clone(),
            cleaned_data: self.cleaned.clone(),
            saved_at: Utc::now(),
        })
    }
}
