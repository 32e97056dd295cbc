//! The screening steps. Each reads the current state and returns one `StateUpdate`.

use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::normalize::extract_json_object;
use crate::llm_client::ChatModel;
use crate::screening::prompts::{
    render, ASSESS_SKILLSET_PROMPT, CATEGORIZE_EXPERIENCE_PROMPT, PARSE_TEXT_PROMPT,
};
use crate::screening::router::Route;
use crate::screening::state::{PipelineState, StateUpdate};

/// Asks the LLM for the cleaned application text and the candidate's email.
///
/// An undecodable reply degrades to the raw resume with no email; only a
/// failed LLM call is an error.
pub async fn parse_text(llm: &dyn ChatModel, state: &PipelineState) -> Result<StateUpdate, AppError> {
    info!("Extracting application text and email from resume");
    let prompt = render(PARSE_TEXT_PROMPT, &[("resume", state.resume.as_str())]);
    let reply = llm
        .complete(&prompt)
        .await
        .map_err(|e| AppError::Llm(format!("Resume parsing failed: {e}")))?;

    match decode_parsed_resume(&reply) {
        Some((application, email)) => {
            info!("Extracted email: {}", email.as_deref().unwrap_or("none"));
            Ok(StateUpdate::Parsed { application, email })
        }
        None => {
            warn!("Resume parse reply was not a JSON object, using raw resume text");
            Ok(StateUpdate::Parsed {
                application: state.resume.clone(),
                email: None,
            })
        }
    }
}

/// `Some((text, email))` when the reply holds a JSON object. A missing `text`
/// becomes empty; a missing or non-string `email` becomes `None`.
fn decode_parsed_resume(reply: &str) -> Option<(String, Option<String>)> {
    let value: Value = serde_json::from_str(extract_json_object(reply)).ok()?;
    let object = value.as_object()?;

    let text = object
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let email = object
        .get("email")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some((text, email))
}

/// Labels the application Entry-level, Mid-level or Senior-level. The reply is stored verbatim.
pub async fn categorize_experience(
    llm: &dyn ChatModel,
    state: &PipelineState,
) -> Result<StateUpdate, AppError> {
    info!("Categorizing experience level");
    let prompt = render(
        CATEGORIZE_EXPERIENCE_PROMPT,
        &[("application", state.application_text())],
    );
    let level = llm
        .complete(&prompt)
        .await
        .map_err(|e| AppError::Llm(format!("Experience categorization failed: {e}")))?;

    info!("Experience level: {level}");
    Ok(StateUpdate::ExperienceLevel(level))
}

/// Labels the application Match or No Match against the job description. The reply is stored verbatim.
pub async fn assess_skillset(
    llm: &dyn ChatModel,
    state: &PipelineState,
) -> Result<StateUpdate, AppError> {
    info!("Assessing skillset match");
    let prompt = render(
        ASSESS_SKILLSET_PROMPT,
        &[
            ("job_description", state.job_description.as_str()),
            ("application", state.application_text()),
        ],
    );
    let skill_match = llm
        .complete(&prompt)
        .await
        .map_err(|e| AppError::Llm(format!("Skill assessment failed: {e}")))?;

    info!("Skill match: {skill_match}");
    Ok(StateUpdate::SkillMatch(skill_match))
}

// Terminal steps. The messages are placeholders: no email is sent and no
// recruiter is notified.

pub fn schedule_hr_interview(state: &PipelineState) -> StateUpdate {
    info!("Scheduling the interview");
    let email = state.email.as_deref().unwrap_or("None");
    StateUpdate::Response(format!(
        "Candidate has been shortlisted for an HR interview. Email has been sent to {email}"
    ))
}

pub fn escalate_to_recruiter(_state: &PipelineState) -> StateUpdate {
    info!("Escalating to recruiter");
    StateUpdate::Response(
        "Candidate has senior-level experience but doesn't match job skills. Escalated to recruiter."
            .to_string(),
    )
}

pub fn reject_application(_state: &PipelineState) -> StateUpdate {
    info!("Sending rejection");
    StateUpdate::Response("Candidate doesn't meet JD and has been rejected.".to_string())
}

/// Runs the terminal step selected by the router.
pub fn run_terminal(route: Route, state: &PipelineState) -> StateUpdate {
    match route {
        Route::ScheduleHrInterview => schedule_hr_interview(state),
        Route::EscalateToRecruiter => escalate_to_recruiter(state),
        Route::RejectApplication => reject_application(state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::scripted::ScriptedModel;

    fn resume_state() -> PipelineState {
        PipelineState::new("Jane Doe | jane@acme.com | 3 years Python", "Python developer")
    }

    #[tokio::test]
    async fn test_parse_text_decodes_fenced_json() {
        let llm = ScriptedModel::new([
            "```json\n{\"text\": \"Jane Doe, Python\", \"email\": \"jane@acme.com\"}\n```",
        ]);
        let update = parse_text(&llm, &resume_state()).await.unwrap();
        assert_eq!(
            update,
            StateUpdate::Parsed {
                application: "Jane Doe, Python".to_string(),
                email: Some("jane@acme.com".to_string()),
            }
        );
        assert!(llm.prompts()[0].contains("Resume: Jane Doe | jane@acme.com"));
    }

    #[tokio::test]
    async fn test_parse_text_null_email_and_missing_text() {
        let llm = ScriptedModel::new(["{\"email\": null}"]);
        let update = parse_text(&llm, &resume_state()).await.unwrap();
        assert_eq!(
            update,
            StateUpdate::Parsed {
                application: String::new(),
                email: None,
            }
        );
    }

    #[tokio::test]
    async fn test_parse_text_falls_back_without_json() {
        let state = resume_state();
        let llm = ScriptedModel::new(["Sorry, I can't help with that."]);
        let update = parse_text(&llm, &state).await.unwrap();
        assert_eq!(
            update,
            StateUpdate::Parsed {
                application: state.resume.clone(),
                email: None,
            }
        );
    }

    #[tokio::test]
    async fn test_parse_text_falls_back_on_malformed_json() {
        let state = resume_state();
        let llm = ScriptedModel::new(["{\"text\": \"unterminated}"]);
        let update = parse_text(&llm, &state).await.unwrap();
        assert!(matches!(update, StateUpdate::Parsed { application, email: None } if application == state.resume));
    }

    #[tokio::test]
    async fn test_parse_text_propagates_llm_failure() {
        let llm = ScriptedModel::default().then_fail("service unavailable");
        let err = parse_text(&llm, &resume_state()).await.unwrap_err();
        assert!(matches!(err, AppError::Llm(msg) if msg.contains("service unavailable")));
    }

    #[tokio::test]
    async fn test_categorize_experience_keeps_reply_verbatim() {
        let llm = ScriptedModel::new(["Senior-level\n"]);
        let state = resume_state().merge(StateUpdate::Parsed {
            application: "Ten years leading teams".to_string(),
            email: None,
        });
        let update = categorize_experience(&llm, &state).await.unwrap();
        assert_eq!(update, StateUpdate::ExperienceLevel("Senior-level\n".to_string()));
        assert!(llm.prompts()[0].contains("Application: Ten years leading teams"));
    }

    #[tokio::test]
    async fn test_assess_skillset_interpolates_both_fields() {
        let llm = ScriptedModel::new(["No Match"]);
        let state = resume_state().merge(StateUpdate::Parsed {
            application: "Go and Kubernetes".to_string(),
            email: None,
        });
        let update = assess_skillset(&llm, &state).await.unwrap();
        assert_eq!(update, StateUpdate::SkillMatch("No Match".to_string()));

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("Job Description: Python developer"));
        assert!(prompt.contains("Application: Go and Kubernetes"));
    }

    #[test]
    fn test_interview_message_names_email() {
        let state = PipelineState {
            email: Some("jane@acme.com".to_string()),
            ..resume_state()
        };
        assert_eq!(
            schedule_hr_interview(&state),
            StateUpdate::Response(
                "Candidate has been shortlisted for an HR interview. Email has been sent to jane@acme.com"
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_assess_skillset_keeps_braces_in_job_description() {
        let llm = ScriptedModel::new(["Match"]);
        let state = PipelineState::new("resume", "Must fill {application} form").merge(
            StateUpdate::Parsed {
                application: "Jane, Python".to_string(),
                email: None,
            },
        );
        assess_skillset(&llm, &state).await.unwrap();

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("Job Description: Must fill {application} form\n"));
        assert!(prompt.contains("Application: Jane, Python"));
    }

    #[test]
    fn test_interview_message_without_email() {
        assert_eq!(
            schedule_hr_interview(&resume_state()),
            StateUpdate::Response(
                "Candidate has been shortlisted for an HR interview. Email has been sent to None"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_terminal_messages_are_fixed() {
        let state = resume_state();
        let StateUpdate::Response(escalated) = run_terminal(Route::EscalateToRecruiter, &state) else {
            panic!("expected a response update");
        };
        assert!(escalated.contains("recruiter"));

        assert_eq!(
            run_terminal(Route::RejectApplication, &state),
            StateUpdate::Response("Candidate doesn't meet JD and has been rejected.".to_string())
        );
    }
}
