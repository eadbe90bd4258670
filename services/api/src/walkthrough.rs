use clap::Args;
use screening_wizard::error::AppError;
use screening_wizard::wizard::{FormData, Step, StepDispatcher, StepRequest, StepResponse};
use screening_wizard::workflows::record_a_mammogram;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct WalkArgs {
    /// Answer for each choice step in turn (`continue` or `dropout`)
    #[arg(long = "answer", value_name = "VALUE")]
    pub(crate) answers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VisitedStep {
    pub(crate) id: String,
    pub(crate) title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WalkEnd {
    Finished,
    AwaitingAnswer,
    Rejected { answer: String, errors: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WalkOutcome {
    pub(crate) visited: Vec<VisitedStep>,
    pub(crate) end: WalkEnd,
}

pub(crate) fn list_steps() -> Result<(), AppError> {
    let wizard = record_a_mammogram::wizard()?;

    println!(
        "Screening wizard: {} steps, starting at {}",
        wizard.len(),
        wizard.start_step().id()
    );
    for step in wizard.steps() {
        match &**step {
            Step::Terminal(_) => println!("- {} [terminal] {}", step.id(), step.title()),
            Step::Choice(choice) => {
                println!(
                    "- {} [choice, form {}] {}",
                    step.id(),
                    choice.form().name(),
                    step.title()
                );
                println!(
                    "    {} -> {}",
                    choice.labels().continue_label,
                    choice.continue_step().id()
                );
                println!(
                    "    {} -> {}",
                    choice.labels().dropout_label,
                    choice.dropout_step().id()
                );
            }
        }
    }

    Ok(())
}

pub(crate) fn walk(args: WalkArgs) -> Result<(), AppError> {
    let wizard = Arc::new(record_a_mammogram::wizard()?);
    let dispatcher = StepDispatcher::new(wizard);
    let route = format!("{}:step", record_a_mammogram::NAMESPACE);

    let outcome = walk_answers(&dispatcher, &route, &args.answers)?;

    println!("Screening wizard walk-through");
    for (position, step) in outcome.visited.iter().enumerate() {
        println!("{}. {} ({})", position + 1, step.title, step.id);
    }

    match outcome.end {
        WalkEnd::Finished => println!("\nReached a final step."),
        WalkEnd::AwaitingAnswer => println!("\nStopped: the last step is waiting for an answer."),
        WalkEnd::Rejected { answer, errors } => {
            println!("\nAnswer '{answer}' was rejected:");
            for error in errors {
                println!("- {error}");
            }
        }
    }

    Ok(())
}

/// Drives the dispatcher the way a browser would: GET each step, then POST the next answer.
pub(crate) fn walk_answers(
    dispatcher: &StepDispatcher,
    route: &str,
    answers: &[String],
) -> Result<WalkOutcome, AppError> {
    let mut current = dispatcher.wizard().start_step().id().to_string();
    let mut visited = Vec::new();
    let mut answers = answers.iter();

    let end = loop {
        let context = match dispatcher.dispatch(route, StepRequest::get(current.as_str()))? {
            StepResponse::Render { context, .. } => context,
            StepResponse::Redirect { step_id, .. } => {
                current = step_id;
                continue;
            }
        };

        visited.push(VisitedStep {
            id: context.step.id.clone(),
            title: context.step.title.clone(),
        });

        let Some(choice) = context.step.choice else {
            break WalkEnd::Finished;
        };
        let Some(answer) = answers.next() else {
            break WalkEnd::AwaitingAnswer;
        };

        let mut data = FormData::new();
        data.insert(choice.field_name, answer.clone());
        match dispatcher.dispatch(route, StepRequest::post(current.as_str(), data))? {
            StepResponse::Redirect { step_id, .. } => current = step_id,
            StepResponse::Render { context, .. } => {
                let errors: Vec<String> = context
                    .form
                    .map(|form| form.errors.into_values().flatten().collect())
                    .unwrap_or_default();
                break WalkEnd::Rejected {
                    answer: answer.clone(),
                    errors,
                };
            }
        }
    };

    Ok(WalkOutcome { visited, end })
}

#[cfg(test)]
mod tests {
    use super::*;
    use screening_wizard::workflows::record_a_mammogram::{
        APPOINTMENT_CANNOT_GO_AHEAD, ASK_FOR_MEDICAL_INFORMATION, AWAITING_IMAGES,
        RECORD_MEDICAL_INFORMATION, START_SCREENING_APPOINTMENT,
    };

    fn dispatcher() -> StepDispatcher {
        let wizard = record_a_mammogram::wizard().expect("wizard builds");
        StepDispatcher::new(Arc::new(wizard))
    }

    fn answers(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn ids(outcome: &WalkOutcome) -> Vec<&str> {
        outcome.visited.iter().map(|step| step.id.as_str()).collect()
    }

    #[test]
    fn full_medical_path_reaches_awaiting_images() {
        let outcome = walk_answers(
            &dispatcher(),
            "record:step",
            &answers(&["continue", "continue", "continue"]),
        )
        .expect("walk completes");

        assert_eq!(
            ids(&outcome),
            [
                START_SCREENING_APPOINTMENT,
                ASK_FOR_MEDICAL_INFORMATION,
                RECORD_MEDICAL_INFORMATION,
                AWAITING_IMAGES,
            ]
        );
        assert_eq!(outcome.end, WalkEnd::Finished);
    }

    #[test]
    fn dropout_at_start_ends_the_appointment() {
        let outcome = walk_answers(&dispatcher(), "record:step", &answers(&["dropout"]))
            .expect("walk completes");

        assert_eq!(
            ids(&outcome),
            [START_SCREENING_APPOINTMENT, APPOINTMENT_CANNOT_GO_AHEAD]
        );
        assert_eq!(outcome.visited[1].title, "Appointment cannot go ahead");
        assert_eq!(outcome.end, WalkEnd::Finished);
    }

    #[test]
    fn running_out_of_answers_stops_at_a_choice() {
        let outcome = walk_answers(&dispatcher(), "record:step", &answers(&["continue"]))
            .expect("walk completes");

        assert_eq!(ids(&outcome).last(), Some(&ASK_FOR_MEDICAL_INFORMATION));
        assert_eq!(outcome.end, WalkEnd::AwaitingAnswer);
    }

    #[test]
    fn invalid_answer_reports_form_errors() {
        let outcome = walk_answers(&dispatcher(), "record:step", &answers(&["perhaps"]))
            .expect("walk completes");

        assert_eq!(ids(&outcome), [START_SCREENING_APPOINTMENT]);
        match outcome.end {
            WalkEnd::Rejected { answer, errors } => {
                assert_eq!(answer, "perhaps");
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("not one of the available choices"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
