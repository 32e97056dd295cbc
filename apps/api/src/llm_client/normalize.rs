//! Best-effort recovery of a JSON object from free-text LLM output.

/// Returns the span from the first `{` to the last `}` of `text`, after
/// trimming it and dropping a leading code fence (optionally tagged `json`).
///
/// This is a single-object heuristic, not a JSON scanner. When no braces are
/// found the trimmed text comes back unchanged and the caller's JSON decode
/// decides what happens next.
pub fn extract_json_object(text: &str) -> &str {
    let text = strip_leading_fence(text.trim()).trim();

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

fn strip_leading_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    }
}
