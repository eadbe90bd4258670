//! Screens for recording a mammogram appointment.

use std::sync::Arc;

use crate::wizard::{
    ChoiceDefinition, ChoiceForm, ChoiceLabels, FormClass, FormField, TerminalStep, Wizard,
    WizardBlueprint, WizardError,
};

/// Route namespace for the wizard (`record:index`, `record:step`).
pub const NAMESPACE: &str = "record";

pub const START_SCREENING_APPOINTMENT: &str = "start-screening-appointment";
pub const ASK_FOR_MEDICAL_INFORMATION: &str = "ask-for-medical-information";
pub const RECORD_MEDICAL_INFORMATION: &str = "record-medical-information";
pub const AWAITING_IMAGES: &str = "awaiting-images";
pub const APPOINTMENT_CANNOT_GO_AHEAD: &str = "appointment-cannot-go-ahead";

/// Builds the form asking where to go next, with choices worded like the step's labels.
fn next_step_form(name: &str, labels: &ChoiceLabels) -> Arc<dyn FormClass> {
    Arc::new(ChoiceForm::new(
        name,
        vec![FormField::choice(
            "next_step",
            &[
                ("continue", labels.continue_label.as_str()),
                ("dropout", labels.dropout_label.as_str()),
            ],
        )
        .labelled(labels.legend.as_str())],
    ))
}

fn choice(
    id: &str,
    title: &str,
    form_name: &str,
    labels: ChoiceLabels,
    continue_id: &str,
    dropout_id: &str,
) -> ChoiceDefinition {
    let form = next_step_form(form_name, &labels);
    ChoiceDefinition::new(id, title, form, continue_id, dropout_id).with_labels(labels)
}

pub fn blueprint() -> WizardBlueprint {
    WizardBlueprint::new()
        .choice(choice(
            START_SCREENING_APPOINTMENT,
            "Screening appointment",
            "ScreeningAppointmentForm",
            ChoiceLabels::new(
                "Can the appointment go ahead?",
                "Yes, go to medical information",
                "No, screening cannot proceed",
            )
            .with_hint(
                "Before you proceed, check the participant’s identity and confirm that their last mammogram was more than 6 months ago.",
            ),
            ASK_FOR_MEDICAL_INFORMATION,
            APPOINTMENT_CANNOT_GO_AHEAD,
        ))
        .choice(choice(
            ASK_FOR_MEDICAL_INFORMATION,
            "Medical information",
            "AskForMedicalInformation",
            ChoiceLabels::new(
                "Has the participant shared any relevant medical information?",
                "Yes",
                "No - proceed to imaging",
            ),
            RECORD_MEDICAL_INFORMATION,
            AWAITING_IMAGES,
        ))
        .choice(choice(
            RECORD_MEDICAL_INFORMATION,
            "Record medical information",
            "RecordMedicalInformation",
            ChoiceLabels::new(
                "Can imaging go ahead?",
                "Yes, mark incomplete sections as ‘none’ or ‘no’",
                "No, appointment needs to stop",
            ),
            AWAITING_IMAGES,
            APPOINTMENT_CANNOT_GO_AHEAD,
        ))
        .terminal(TerminalStep::new(AWAITING_IMAGES, "Awaiting images"))
        .terminal(TerminalStep::new(
            APPOINTMENT_CANNOT_GO_AHEAD,
            "Appointment cannot go ahead",
        ))
}

/// The wizard served for recording a mammogram, starting at the screening appointment.
pub fn wizard() -> Result<Wizard, WizardError> {
    blueprint().build(START_SCREENING_APPOINTMENT)
}
