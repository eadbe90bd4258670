use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::form::{FieldValue, FormClass, StepForm};

pub const DEFAULT_TEMPLATE: &str = "wizard_step.jinja";
pub const DEFAULT_FIELD_NAME: &str = "next_step";
pub const DEFAULT_CONTINUE_VALUE: &str = "continue";

/// A screen in the wizard graph. Steps are built once and shared read-only.
#[derive(Debug)]
pub enum Step {
    Terminal(TerminalStep),
    Choice(ChoiceStep),
}

impl Step {
    pub fn id(&self) -> &str {
        match self {
            Step::Terminal(step) => &step.id,
            Step::Choice(step) => &step.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Step::Terminal(step) => &step.title,
            Step::Choice(step) => &step.title,
        }
    }

    pub fn template(&self) -> &str {
        match self {
            Step::Terminal(step) => &step.template,
            Step::Choice(step) => &step.template,
        }
    }

    /// Nothing follows a terminal step.
    pub fn is_final(&self) -> bool {
        matches!(self, Step::Terminal(_))
    }

    pub fn as_choice(&self) -> Option<&ChoiceStep> {
        match self {
            Step::Choice(step) => Some(step),
            Step::Terminal(_) => None,
        }
    }

    pub fn view(&self) -> StepView {
        StepView {
            id: self.id().to_string(),
            title: self.title().to_string(),
            template: self.template().to_string(),
            is_final: self.is_final(),
            choice: self.as_choice().map(ChoiceStep::view),
        }
    }
}

impl From<TerminalStep> for Step {
    fn from(step: TerminalStep) -> Self {
        Step::Terminal(step)
    }
}

impl From<ChoiceStep> for Step {
    fn from(step: ChoiceStep) -> Self {
        Step::Choice(step)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalStep {
    id: String,
    title: String,
    template: String,
}

impl TerminalStep {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn into_step(self) -> Arc<Step> {
        Arc::new(Step::Terminal(self))
    }
}

/// Presentation text for the yes/no question at the end of a choice step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChoiceLabels {
    pub legend: String,
    pub hint: String,
    pub continue_label: String,
    pub dropout_label: String,
}

impl ChoiceLabels {
    pub fn new(
        legend: impl Into<String>,
        continue_label: impl Into<String>,
        dropout_label: impl Into<String>,
    ) -> Self {
        Self {
            legend: legend.into(),
            hint: String::new(),
            continue_label: continue_label.into(),
            dropout_label: dropout_label.into(),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }
}

/// A step ending in a binary decision between a continue and a dropout successor.
pub struct ChoiceStep {
    id: String,
    title: String,
    template: String,
    form: Arc<dyn FormClass>,
    continue_step: Arc<Step>,
    dropout_step: Arc<Step>,
    labels: ChoiceLabels,
    field_name: String,
    field_value_continue: FieldValue,
}

impl ChoiceStep {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        form: Arc<dyn FormClass>,
        continue_step: Arc<Step>,
        dropout_step: Arc<Step>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            template: DEFAULT_TEMPLATE.to_string(),
            form,
            continue_step,
            dropout_step,
            labels: ChoiceLabels::default(),
            field_name: DEFAULT_FIELD_NAME.to_string(),
            field_value_continue: FieldValue::from(DEFAULT_CONTINUE_VALUE),
        }
    }

    pub fn with_labels(mut self, labels: ChoiceLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Branch on `field_name`, taking the continue edge only when it equals `continue_value`.
    pub fn with_branching_field(
        mut self,
        field_name: impl Into<String>,
        continue_value: impl Into<FieldValue>,
    ) -> Self {
        self.field_name = field_name.into();
        self.field_value_continue = continue_value.into();
        self
    }

    pub fn into_step(self) -> Arc<Step> {
        Arc::new(Step::Choice(self))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn form(&self) -> &dyn FormClass {
        self.form.as_ref()
    }

    pub fn continue_step(&self) -> &Arc<Step> {
        &self.continue_step
    }

    pub fn dropout_step(&self) -> &Arc<Step> {
        &self.dropout_step
    }

    pub fn labels(&self) -> &ChoiceLabels {
        &self.labels
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn field_value_continue(&self) -> &FieldValue {
        &self.field_value_continue
    }

    /// Picks the successor from an already validated form.
    ///
    /// Anything other than the continue value takes the dropout edge. A form whose
    /// cleaned data lacks the branching field is a wiring fault, not a user error.
    pub fn next_step(&self, form: &dyn StepForm) -> Result<&Arc<Step>, MissingBranchField> {
        let value = form
            .cleaned_data()
            .get(&self.field_name)
            .ok_or_else(|| MissingBranchField {
                step_id: self.id.clone(),
                field_name: self.field_name.clone(),
            })?;

        if *value == self.field_value_continue {
            Ok(&self.continue_step)
        } else {
            Ok(&self.dropout_step)
        }
    }

    fn view(&self) -> ChoiceView {
        ChoiceView {
            form: self.form.name().to_string(),
            field_name: self.field_name.clone(),
            labels: self.labels.clone(),
            continue_step: self.continue_step.id().to_string(),
            dropout_step: self.dropout_step.id().to_string(),
        }
    }
}

impl fmt::Debug for ChoiceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChoiceStep")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("template", &self.template)
            .field("form", &self.form.name())
            .field("continue_step", &self.continue_step.id())
            .field("dropout_step", &self.dropout_step.id())
            .field("field_name", &self.field_name)
            .field("field_value_continue", &self.field_value_continue)
            .finish()
    }
}

/// Raised when a validated form has no value for the step's branching field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid form for step {step_id}: missing {field_name} value")]
pub struct MissingBranchField {
    pub step_id: String,
    pub field_name: String,
}

/// Step metadata exposed to templates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
    pub id: String,
    pub title: String,
    pub template: String,
    pub is_final: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice: Option<ChoiceView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceView {
    pub form: String,
    pub field_name: String,
    #[serde(flatten)]
    pub labels: ChoiceLabels,
    pub continue_step: String,
    pub dropout_step: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::fields::{ChoiceForm, FormField};
    use crate::wizard::form::FormData;

    fn branching_form(required: bool) -> Arc<dyn FormClass> {
        let field = FormField::choice("next_step", &[("continue", "Yes"), ("dropout", "No")]);
        let field = if required { field } else { field.optional() };
        Arc::new(ChoiceForm::new("NextStepForm", vec![field]))
    }

    fn start_step(required: bool) -> ChoiceStep {
        ChoiceStep::new(
            "start",
            "Start",
            branching_form(required),
            TerminalStep::new("ask-medical", "Medical information").into_step(),
            TerminalStep::new("cannot-proceed", "Cannot proceed").into_step(),
        )
    }

    fn submit(step: &ChoiceStep, value: Option<&str>) -> Box<dyn StepForm> {
        let mut data = FormData::new();
        if let Some(value) = value {
            data.insert("next_step".to_string(), value.to_string());
        }
        let mut form = step.form().bind(&data);
        assert!(form.is_valid(), "form should validate: {:?}", form.errors());
        form
    }

    #[test]
    fn terminal_steps_are_final() {
        let step = TerminalStep::new("done", "Done").into_step();
        assert!(step.is_final());
        assert!(step.as_choice().is_none());
        assert_eq!(step.template(), DEFAULT_TEMPLATE);
    }

    #[test]
    fn choice_steps_are_not_final() {
        let step = start_step(true).into_step();
        assert!(!step.is_final());
        assert_eq!(step.as_choice().map(ChoiceStep::field_name), Some("next_step"));
    }

    #[test]
    fn continue_value_selects_continue_step() {
        let step = start_step(true);
        let form = submit(&step, Some("continue"));
        let next = step.next_step(&*form).expect("branch resolves");
        assert!(Arc::ptr_eq(next, step.continue_step()));
    }

    #[test]
    fn any_other_value_selects_dropout_step() {
        let step = start_step(true);
        let form = submit(&step, Some("dropout"));
        let next = step.next_step(&*form).expect("branch resolves");
        assert!(Arc::ptr_eq(next, step.dropout_step()));
    }

    #[test]
    fn missing_branching_field_is_a_fault() {
        let step = start_step(false);
        let form = submit(&step, None);
        let err = step.next_step(&*form).expect_err("missing field");
        assert_eq!(err.step_id, "start");
        assert_eq!(err.field_name, "next_step");
        assert_eq!(
            err.to_string(),
            "invalid form for step start: missing next_step value"
        );
    }

    #[test]
    fn custom_branching_field_compares_booleans() {
        let form: Arc<dyn FormClass> = Arc::new(ChoiceForm::new(
            "Consent",
            vec![FormField::boolean("consented")],
        ));
        let step = ChoiceStep::new(
            "consent",
            "Consent",
            form,
            TerminalStep::new("imaging", "Imaging").into_step(),
            TerminalStep::new("stop", "Stop").into_step(),
        )
        .with_branching_field("consented", true);

        let mut data = FormData::new();
        data.insert("consented".to_string(), "no".to_string());
        let mut bound = step.form().bind(&data);
        assert!(bound.is_valid());
        let next = step.next_step(&*bound).expect("branch resolves");
        assert_eq!(next.id(), "stop");
    }

    #[test]
    fn view_exposes_labels_and_successors() {
        let step = start_step(true)
            .with_labels(
                ChoiceLabels::new("Can the appointment go ahead?", "Yes", "No")
                    .with_hint("Check identity first."),
            )
            .into_step();

        let view = step.view();
        let choice = view.choice.expect("choice metadata");
        assert_eq!(choice.continue_step, "ask-medical");
        assert_eq!(choice.dropout_step, "cannot-proceed");
        assert_eq!(choice.labels.hint, "Check identity first.");

        let json = serde_json::to_value(step.view()).expect("serializes");
        assert_eq!(json["choice"]["legend"], "Can the appointment go ahead?");
        assert_eq!(json["is_final"], false);
    }
}
