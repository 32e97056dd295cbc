//! Screening orchestrator.
//!
//! Flow: start → parse_text → categorize_experience → assess_skillset →
//!       (route_app) → one terminal step → end.
//!
//! Strictly sequential: one LLM call per assessment step, no loops, no re-entry.

use std::sync::Arc;

use tracing::info;

use crate::errors::AppError;
use crate::llm_client::ChatModel;
use crate::screening::router::{route_app, LabelMatching, Route};
use crate::screening::state::PipelineState;
use crate::screening::steps;

/// A position in the screening graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Start,
    ParseText,
    CategorizeExperience,
    AssessSkillset,
    Terminal(Route),
    End,
}

impl Node {
    /// The node that follows `self` once its step has been merged into `state`.
    /// The only conditional edge leaves `AssessSkillset`.
    pub fn next(self, state: &PipelineState, matching: LabelMatching) -> Node {
        match self {
            Node::Start => Node::ParseText,
            Node::ParseText => Node::CategorizeExperience,
            Node::CategorizeExperience => Node::AssessSkillset,
            Node::AssessSkillset => Node::Terminal(route_app(state, matching)),
            Node::Terminal(_) | Node::End => Node::End,
        }
    }
}

/// The compiled screening pipeline, built once at startup around an injected model.
#[derive(Clone)]
pub struct ScreeningPipeline {
    llm: Arc<dyn ChatModel>,
    matching: LabelMatching,
}

impl ScreeningPipeline {
    pub fn new(llm: Arc<dyn ChatModel>, matching: LabelMatching) -> Self {
        Self { llm, matching }
    }

    pub fn label_matching(&self) -> LabelMatching {
        self.matching
    }

    /// Screens one candidate and returns the fully merged state.
    pub async fn run(
        &self,
        resume: impl Into<String>,
        job_description: impl Into<String>,
    ) -> Result<PipelineState, AppError> {
        let llm = self.llm.as_ref();
        let mut state = PipelineState::new(resume, job_description);
        let mut node = Node::Start;

        while node != Node::End {
            let update = match node {
                Node::Start | Node::End => None,
                Node::ParseText => Some(steps::parse_text(llm, &state).await?),
                Node::CategorizeExperience => Some(steps::categorize_experience(llm, &state).await?),
                Node::AssessSkillset => Some(steps::assess_skillset(llm, &state).await?),
                Node::Terminal(route) => {
                    info!("Routing candidate to {route:?}");
                    Some(steps::run_terminal(route, &state))
                }
            };
            if let Some(update) = update {
                state = state.merge(update);
            }
            node = node.next(&state, self.matching);
        }

        Ok(state)
    }
}
