//! Text helpers for channel names and user-entered patterns

/// Names longer than this are truncated before any pattern matching
pub const MAX_NAME_CHARS: usize = 500;

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized form used to compare names: whitespace collapsed, uppercased
pub fn comparison_key(text: &str) -> String {
    normalize_whitespace(text).to_uppercase()
}

/// Truncate to at most `max_chars` characters on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}

/// Truncate a channel name to the matching limit
pub fn bounded_name(name: &str) -> &str {
    truncate_chars(name, MAX_NAME_CHARS)
}

/// Decode backslash escapes that settings forms double up
///
/// `\\` becomes `\`, `\t` and `\n` become their control characters, anything
/// else is kept as written so regex escapes such as `\d` survive.
pub fn decode_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.peek() {
            Some('\\') => {
                out.push('\\');
                chars.next();
            }
            Some('t') => {
                out.push('\t');
                chars.next();
            }
            Some('n') => {
                out.push('\n');
                chars.next();
            }
            _ => out.push('\\'),
        }
    }

    out
}

/// Split a comma separated setting into trimmed, non-empty entries
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
