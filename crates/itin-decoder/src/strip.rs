//! Step 1-2 of decoding: strip code fences/preamble and scrub non-ASCII
//! intrusions that corrupt JSON between keys.

/// Strip triple-backtick fences and any preamble/postamble outside the
/// outermost `{...}`.
#[must_use]
pub fn strip_fences_and_preamble(raw: &str) -> String {
    let without_fences = strip_code_fences(raw);
    match (without_fences.find('{'), without_fences.rfind('}')) {
        (Some(start), Some(end)) if end >= start => without_fences[start..=end].to_string(),
        _ => without_fences,
    }
}

fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop an optional language tag on the fence's opening line.
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.trim_start_matches('\n');
        if let Some(end) = rest.rfind("```") {
            return rest[..end].to_string();
        }
        return rest.to_string();
    }
    trimmed.to_string()
}

/// Remove non-ASCII bytes that appear outside of JSON string literals —
/// an observed model failure mode where stray unicode punctuation is
/// emitted between keys and breaks the parser. Characters inside quoted
/// strings are left untouched so legitimate unicode content survives.
#[must_use]
pub fn scrub_non_ascii_intrusions(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escaped = false;
    for ch in s.chars() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        if ch == '"' {
            in_string = true;
            out.push(ch);
            continue;
        }
        if ch.is_ascii() {
            out.push(ch);
        }
        // non-ASCII outside a string literal is dropped
    }
    out
}
