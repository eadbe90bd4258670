//! Branching step wizard: a graph of screens where each choice step sends the
//! client down a continue or a dropout edge depending on a submitted form.

pub mod blueprint;
pub mod dispatch;
pub mod fields;
pub mod form;
pub mod graph;
pub mod router;
pub mod step;

pub use blueprint::{ChoiceDefinition, StepDefinition, WizardBlueprint};
pub use dispatch::{
    DispatchError, NoSession, RenderContext, StepDispatcher, StepMethod, StepRequest,
    StepResponse, WizardSession,
};
pub use fields::{ChoiceForm, FieldKind, FormField};
pub use form::{
    CleanedData, FieldErrors, FieldValue, FormClass, FormContext, FormData, FormSubmission,
    StepForm, StoreError, SubmissionStore,
};
pub use graph::{StepNotFound, Wizard, WizardError};
pub use router::{wizard_router, JsonRenderer, Renderer, RouteError, RouteTable, WizardMount};
pub use step::{ChoiceLabels, ChoiceStep, MissingBranchField, Step, StepView, TerminalStep};
