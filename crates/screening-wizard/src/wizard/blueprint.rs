use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::warn;

use super::form::{FieldValue, FormClass};
use super::graph::{Wizard, WizardError};
use super::step::{
    ChoiceLabels, ChoiceStep, Step, TerminalStep, DEFAULT_CONTINUE_VALUE, DEFAULT_FIELD_NAME,
    DEFAULT_TEMPLATE,
};

/// A choice step whose successors are named by id rather than held directly.
pub struct ChoiceDefinition {
    id: String,
    title: String,
    template: String,
    form: Arc<dyn FormClass>,
    continue_id: String,
    dropout_id: String,
    labels: ChoiceLabels,
    field_name: String,
    field_value_continue: FieldValue,
}

impl ChoiceDefinition {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        form: Arc<dyn FormClass>,
        continue_id: impl Into<String>,
        dropout_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            template: DEFAULT_TEMPLATE.to_string(),
            form,
            continue_id: continue_id.into(),
            dropout_id: dropout_id.into(),
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

    pub fn with_branching_field(
        mut self,
        field_name: impl Into<String>,
        continue_value: impl Into<FieldValue>,
    ) -> Self {
        self.field_name = field_name.into();
        self.field_value_continue = continue_value.into();
        self
    }

    fn resolve(&self, continue_step: Arc<Step>, dropout_step: Arc<Step>) -> ChoiceStep {
        ChoiceStep::new(
            self.id.clone(),
            self.title.clone(),
            self.form.clone(),
            continue_step,
            dropout_step,
        )
        .with_template(self.template.clone())
        .with_labels(self.labels.clone())
        .with_branching_field(self.field_name.clone(), self.field_value_continue.clone())
    }
}

pub enum StepDefinition {
    Terminal(TerminalStep),
    Choice(ChoiceDefinition),
}

impl StepDefinition {
    fn id(&self) -> &str {
        match self {
            StepDefinition::Terminal(step) => step.id(),
            StepDefinition::Choice(definition) => &definition.id,
        }
    }
}

/// Id-linked step definitions resolved into a [`Wizard`] at configuration load.
#[derive(Default)]
pub struct WizardBlueprint {
    definitions: Vec<StepDefinition>,
}

impl WizardBlueprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terminal(mut self, step: TerminalStep) -> Self {
        self.definitions.push(StepDefinition::Terminal(step));
        self
    }

    pub fn choice(mut self, definition: ChoiceDefinition) -> Self {
        self.definitions.push(StepDefinition::Choice(definition));
        self
    }

    /// Resolves the definitions reachable from `start_id` into a shared step graph.
    ///
    /// Each id is resolved once; later references reuse the same step. A reference
    /// back to a step that is still being resolved is a cycle and fails the build.
    pub fn build(&self, start_id: &str) -> Result<Wizard, WizardError> {
        let mut definitions = HashMap::new();
        for definition in &self.definitions {
            if definitions.insert(definition.id(), definition).is_some() {
                return Err(WizardError::DuplicateStepId {
                    id: definition.id().to_string(),
                });
            }
        }

        if !definitions.contains_key(start_id) {
            return Err(WizardError::UnknownStart(start_id.to_string()));
        }

        let mut resolver = Resolver {
            definitions,
            resolved: HashMap::new(),
            in_progress: Vec::new(),
        };
        let start = resolver.resolve(start_id, None)?;

        let reachable: HashSet<&str> = resolver.resolved.keys().map(String::as_str).collect();
        for definition in &self.definitions {
            if !reachable.contains(definition.id()) {
                warn!(
                    step_id = definition.id(),
                    start_step = start_id,
                    "step definition is unreachable from the start step"
                );
            }
        }

        Wizard::new(start)
    }
}

struct Resolver<'a> {
    definitions: HashMap<&'a str, &'a StepDefinition>,
    resolved: HashMap<String, Arc<Step>>,
    in_progress: Vec<String>,
}

impl Resolver<'_> {
    fn resolve(&mut self, id: &str, referenced_by: Option<&str>) -> Result<Arc<Step>, WizardError> {
        if let Some(step) = self.resolved.get(id) {
            return Ok(step.clone());
        }

        if let Some(position) = self.in_progress.iter().position(|pending| pending == id) {
            let mut path = self.in_progress[position..].to_vec();
            path.push(id.to_string());
            return Err(WizardError::Cycle { path });
        }

        let definition = match self.definitions.get(id) {
            Some(definition) => *definition,
            None => {
                return Err(WizardError::UnknownSuccessor {
                    id: id.to_string(),
                    referenced_by: referenced_by.unwrap_or_default().to_string(),
                })
            }
        };

        let step = match definition {
            StepDefinition::Terminal(step) => Arc::new(Step::Terminal(step.clone())),
            StepDefinition::Choice(choice) => {
                self.in_progress.push(id.to_string());
                let continue_step = self.resolve(&choice.continue_id, Some(id))?;
                let dropout_step = self.resolve(&choice.dropout_id, Some(id))?;
                self.in_progress.pop();
                Arc::new(Step::Choice(choice.resolve(continue_step, dropout_step)))
            }
        };

        self.resolved.insert(id.to_string(), step.clone());
        Ok(step)
    }
}
