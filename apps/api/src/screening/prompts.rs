// Screening LLM prompt templates.
// Each is sent as the system message with its `{placeholders}` filled in.

pub const PARSE_TEXT_PROMPT: &str = "\
You are a resume parsing assistant. \
Extract the complete application text and the candidate's email address from the following resume. \
Respond in JSON format with two fields: 'text' containing the application text, and 'email' containing the extracted email address. \
If no email is found, set 'email' to null.\n\n\
Resume: {resume}";

pub const CATEGORIZE_EXPERIENCE_PROMPT: &str = "\
You are an expert HR assistant. \
Based solely on the job application text, categorize experience as: \
'Entry-level', 'Mid-level', or 'Senior-level'.\n\n\
Application: {application}\n\n\
Respond with exactly one label. No explanations.";

pub const ASSESS_SKILLSET_PROMPT: &str = "\
You are an expert technical recruiter. \
Review job description and application. \
Respond with exactly: 'Match' or 'No Match'.\n\n\
Job Description: {job_description}\n\
Application: {application}";


/// Fills `{key}` placeholders in one left-to-right pass. Substituted values are
/// never rescanned, so braces inside a resume or job description stay literal.
/// Unknown or unterminated placeholders are copied through unchanged.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let value = tail.find('}').and_then(|close| {
            let key = &tail[1..close];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
