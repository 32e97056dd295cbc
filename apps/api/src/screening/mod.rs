// Candidate screening: resume → experience level → skill match → one outcome.
// All LLM calls go through the injected `ChatModel`.

pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod router;
pub mod state;
pub mod steps;
