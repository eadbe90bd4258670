use std::collections::HashMap;
use std::sync::Arc;

use super::step::Step;

/// Registry of every step reachable from a start step, addressable by id.
#[derive(Debug, Clone)]
pub struct Wizard {
    start_step: Arc<Step>,
    steps: Vec<Arc<Step>>,
    index: HashMap<String, usize>,
}

impl Wizard {
    /// Walks the graph depth first, continue edges before dropout edges.
    ///
    /// A step already registered under its id is not walked again, so converging
    /// branches are visited once. Two distinct steps sharing an id are rejected.
    pub fn new(start_step: Arc<Step>) -> Result<Self, WizardError> {
        let mut steps: Vec<Arc<Step>> = Vec::new();
        let mut index = HashMap::new();
        let mut pending = vec![start_step.clone()];

        while let Some(step) = pending.pop() {
            if let Some(&position) = index.get(step.id()) {
                if Arc::ptr_eq(&steps[position], &step) {
                    continue;
                }
                return Err(WizardError::DuplicateStepId {
                    id: step.id().to_string(),
                });
            }

            index.insert(step.id().to_string(), steps.len());
            if let Step::Choice(choice) = &*step {
                pending.push(choice.dropout_step().clone());
                pending.push(choice.continue_step().clone());
            }
            steps.push(step);
        }

        Ok(Self {
            start_step,
            steps,
            index,
        })
    }

    pub fn start_step(&self) -> &Arc<Step> {
        &self.start_step
    }

    pub fn get_step_by_id(&self, id: &str) -> Result<&Arc<Step>, StepNotFound> {
        self.index
            .get(id)
            .map(|&position| &self.steps[position])
            .ok_or_else(|| StepNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Steps in traversal order, start step first.
    pub fn steps(&self) -> impl Iterator<Item = &Arc<Step>> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Lookup failure for an id outside the reachable set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("step {0} does not exist")]
pub struct StepNotFound(pub String);

/// Wizard misconfiguration detected while building the step graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("step id {id} is used by more than one step")]
    DuplicateStepId { id: String },
    #[error("step {referenced_by} refers to unknown step {id}")]
    UnknownSuccessor { id: String, referenced_by: String },
    #[error("start step {0} is not defined")]
    UnknownStart(String),
    #[error("step graph contains a cycle: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },
}
