//! Request handling for a single wizard step.
//!
//! The dispatcher does no checking that steps are visited in order: any reachable
//! step may be requested directly.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error};

use super::form::{FormContext, FormData, StoreError};
use super::graph::Wizard;
use super::step::{ChoiceStep, MissingBranchField, Step, StepView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepMethod {
    Get,
    Post(FormData),
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRequest {
    pub step_id: String,
    pub method: StepMethod,
}

impl StepRequest {
    pub fn get(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            method: StepMethod::Get,
        }
    }

    pub fn post(step_id: impl Into<String>, data: FormData) -> Self {
        Self {
            step_id: step_id.into(),
            method: StepMethod::Post(data),
        }
    }
}

/// Context handed to the renderer alongside the template name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderContext {
    pub step: StepView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<FormContext>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepResponse {
    Render {
        template: String,
        context: RenderContext,
    },
    /// Navigate to `step_id` on the named route.
    Redirect { route: String, step_id: String },
}

impl StepResponse {
    fn render(step: &Step, form: Option<FormContext>) -> Self {
        StepResponse::Render {
            template: step.template().to_string(),
            context: RenderContext {
                step: step.view(),
                form,
            },
        }
    }

    fn redirect(route: &str, step_id: &str) -> Self {
        StepResponse::Redirect {
            route: route.to_string(),
            step_id: step_id.to_string(),
        }
    }
}

/// Faults that indicate a wiring or collaborator failure rather than bad user input.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    MissingBranchField(#[from] MissingBranchField),
    #[error("failed to save {form} for step {step_id}: {source}")]
    Persist {
        form: String,
        step_id: String,
        #[source]
        source: StoreError,
    },
}

/// Hook run when a client enters the wizard at its start step.
pub trait WizardSession: Send + Sync {
    fn begin(&self, _wizard: &Wizard) {}
}

/// Keeps no wizard-scoped state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSession;

impl WizardSession for NoSession {}

/// Resolves step requests against a wizard and decides what to render or where to go next.
pub struct StepDispatcher {
    wizard: Arc<Wizard>,
    session: Arc<dyn WizardSession>,
}

impl StepDispatcher {
    pub fn new(wizard: Arc<Wizard>) -> Self {
        Self::with_session(wizard, Arc::new(NoSession))
    }

    pub fn with_session(wizard: Arc<Wizard>, session: Arc<dyn WizardSession>) -> Self {
        Self { wizard, session }
    }

    pub fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    /// Handles one request. Redirects carry `route` so the client stays on the same named route.
    pub fn dispatch(
        &self,
        route: &str,
        request: StepRequest,
    ) -> Result<StepResponse, DispatchError> {
        let start_step = self.wizard.start_step();
        let step = match self.wizard.get_step_by_id(&request.step_id) {
            Ok(step) => step,
            Err(err) => {
                error!(%err, start_step = start_step.id(), "redirecting to the start step");
                return Ok(StepResponse::redirect(route, start_step.id()));
            }
        };

        if Arc::ptr_eq(step, start_step) && request.method == StepMethod::Get {
            self.session.begin(&self.wizard);
        }

        match &**step {
            Step::Choice(choice) => self.handle_form(step, choice, route, request.method),
            Step::Terminal(_) => {
                debug!(step_id = step.id(), "rendering terminal step");
                Ok(StepResponse::render(step, None))
            }
        }
    }

    fn handle_form(
        &self,
        step: &Step,
        choice: &ChoiceStep,
        route: &str,
        method: StepMethod,
    ) -> Result<StepResponse, DispatchError> {
        let form = match method {
            StepMethod::Post(data) => {
                let mut form = choice.form().bind(&data);
                if form.is_valid() {
                    if form.is_persistable() {
                        form.save().map_err(|source| DispatchError::Persist {
                            form: choice.form().name().to_string(),
                            step_id: step.id().to_string(),
                            source,
                        })?;
                    }

                    let next = choice.next_step(&*form)?;
                    debug!(step_id = step.id(), next_step = next.id(), "advancing wizard");
                    return Ok(StepResponse::redirect(route, next.id()));
                }

                debug!(
                    step_id = step.id(),
                    fields = ?form.errors().keys().collect::<Vec<_>>(),
                    "submitted form needs correcting"
                );
                form
            }
            StepMethod::Get | StepMethod::Other(_) => choice.form().unbound(),
        };

        Ok(StepResponse::render(step, Some(form.context())))
    }
}
