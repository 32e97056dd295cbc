use crate::screening::state::PipelineState;

pub const MATCH_LABEL: &str = "Match";
pub const SENIOR_LABEL: &str = "Senior-level";

/// The terminal step chosen after the skill assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ScheduleHrInterview,
    EscalateToRecruiter,
    RejectApplication,
}

/// How LLM labels are compared against the expected values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelMatching {
    /// Exact string equality. Any extra word or whitespace fails to match.
    #[default]
    Strict,
    /// Surrounding whitespace and ASCII case are ignored.
    Tolerant,
}

impl LabelMatching {
    pub fn matches(self, label: Option<&str>, expected: &str) -> bool {
        let Some(label) = label else {
            return false;
        };
        match self {
            LabelMatching::Strict => label == expected,
            LabelMatching::Tolerant => label.trim().eq_ignore_ascii_case(expected),
        }
    }
}

/// Picks the terminal step for a fully assessed state.
///
/// A skill match always wins; otherwise senior candidates are escalated and
/// everyone else is rejected. Unrecognised labels fall through to rejection.
pub fn route_app(state: &PipelineState, matching: LabelMatching) -> Route {
    if matching.matches(state.skill_match.as_deref(), MATCH_LABEL) {
        Route::ScheduleHrInterview
    } else if matching.matches(state.experience_level.as_deref(), SENIOR_LABEL) {
        Route::EscalateToRecruiter
    } else {
        Route::RejectApplication
    }
}
