/// The record threaded through every screening step.
///
/// Created per request from the caller's inputs; each step contributes one
/// `StateUpdate` and nothing is ever cleared once set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineState {
    pub resume: String,
    pub job_description: String,
    pub application: Option<String>,
    pub email: Option<String>,
    pub experience_level: Option<String>,
    pub skill_match: Option<String>,
    pub response: Option<String>,
}

/// A partial update produced by one step.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    /// Result of `parse_text`. `email` is `None` when the resume had none.
    Parsed {
        application: String,
        email: Option<String>,
    },
    ExperienceLevel(String),
    SkillMatch(String),
    /// Outcome message written by exactly one terminal step.
    Response(String),
}

impl PipelineState {
    pub fn new(resume: impl Into<String>, job_description: impl Into<String>) -> Self {
        Self {
            resume: resume.into(),
            job_description: job_description.into(),
            ..Default::default()
        }
    }

    /// Applies `update`. A `None` in the update never overwrites a value.
    pub fn merge(mut self, update: StateUpdate) -> Self {
        match update {
            StateUpdate::Parsed { application, email } => {
                self.application = Some(application);
                if email.is_some() {
                    self.email = email;
                }
            }
            StateUpdate::ExperienceLevel(level) => self.experience_level = Some(level),
            StateUpdate::SkillMatch(label) => self.skill_match = Some(label),
            StateUpdate::Response(message) => self.response = Some(message),
        }
        self
    }

    /// Text the assessment steps read: the cleaned application, else the raw resume.
    pub fn application_text(&self) -> &str {
        self.application.as_deref().unwrap_or(&self.resume)
    }
}
