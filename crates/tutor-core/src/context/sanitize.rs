use crate::constants::logging::MAX_PREVIEW_CHARS;

/// Reduce possibly HTML-bearing text to plain text.
///
/// Tags are removed and their text content kept. A `<` only opens a tag when
/// followed by a letter, `/`, `!` or `?` and closed by a `>` before the next
/// `<`. Anything else is kept literally, so `a < b` and `x<y` survive.
/// Passes repeat until nothing changes, which makes the function idempotent.
pub fn strip_html(text: &str) -> String {
    let mut current = strip_once(text);
    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_once(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('<') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        match tag_len(after) {
            Some(len) => rest = &after[len..],
            None => {
                result.push('<');
                rest = after;
            }
        }
    }
    result.push_str(rest);

    result.trim().to_string()
}

/// Length of the tag body through its closing `>` when `text` starts one.
fn tag_len(text: &str) -> Option<usize> {
    let first = text.chars().next()?;
    if !(first.is_ascii_alphabetic() || matches!(first, '/' | '!' | '?')) {
        return None;
    }
    let close = text.find('>')?;
    match text.find('<') {
        Some(open) if open < close => None,
        _ => Some(close + 1),
    }
}

/// Shorten user text for log lines and redact credential-looking fragments.
pub fn log_preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::from("[EMPTY]");
    }

    let total = trimmed.chars().count();
    let preview = if total > MAX_PREVIEW_CHARS {
        let head: String = trimmed.chars().take(MAX_PREVIEW_CHARS).collect();
        format!("{head}... ({total} chars total)")
    } else {
        trimmed.to_string()
    };

    redact_sensitive_patterns(&preview)
}

fn redact_sensitive_patterns(text: &str) -> String {
    let patterns = [
        ("Bearer ", "Bearer [REDACTED]"),
        ("api_key=", "api_key=[REDACTED]"),
        ("password=", "password=[REDACTED]"),
        ("token=", "token=[REDACTED]"),
    ];

    let mut result = text.to_string();
    for (pattern, replacement) in patterns {
        if let Some(idx) = result.find(pattern) {
            let end = result[idx + pattern.len()..]
                .find(|c: char| c.is_whitespace() || c == '&' || c == '"' || c == '\'')
                .map(|i| idx + pattern.len() + i)
                .unwrap_or(result.len());
            result = format!("{}{}{}", &result[..idx], replacement, &result[end..]);
        }
    }
    result
}
