/// Maximum length of any sanitized path component. Blunt, but keeps full
/// paths under common filesystem limits.
const MAX_COMPONENT_LEN: usize = 150;

/// Removes or replaces characters that are problematic in filenames.
///
/// Total over any input: path separators become `-`, a colon becomes ` -`,
/// `*` and angle brackets and `|` become `_`, `?` is deleted and `"` becomes
/// `'`. The result is truncated to 150 characters and trimmed. Idempotent.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '/' | '\\' => out.push('-'),
            ':' => out.push_str(" -"),
            '*' => out.push('_'),
            '?' => {}
            '"' => out.push('\''),
            '<' | '>' | '|' => out.push('_'),
            _ => out.push(c),
        }
    }

    let truncated: String = out.chars().take(MAX_COMPONENT_LEN).collect();
    truncated.trim().to_string()
}
