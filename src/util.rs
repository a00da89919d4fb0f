//! Shared utility functions for the codesmith crate.

/// Turn a request title into a filesystem-safe project slug.
///
/// Letters, digits and `_` pass through; runs of whitespace and hyphens
/// collapse to one hyphen; everything else is dropped. The result is
/// lowercased and capped at 50 characters. Empty input falls back to a
/// fixed slug so a project directory always exists.
pub fn sanitize_project_slug(input: &str) -> String {
    let mut out = String::new();
    let mut last_was_hyphen = true;
    for c in input.trim().chars() {
        if c.is_alphanumeric() || c == '_' {
            out.push(c);
            last_was_hyphen = false;
        } else if (c == '-' || c.is_whitespace()) && !last_was_hyphen {
            out.push('-');
            last_was_hyphen = true;
        }
    }
    let mut slug = out.trim_end_matches('-').to_lowercase();
    if slug.chars().count() > 50 {
        let capped: String = slug.chars().take(50).collect();
        slug = capped.trim_end_matches('-').to_string();
    }
    if slug.is_empty() {
        "generated-project".to_string()
    } else {
        slug
    }
}

/// Truncate `text` to at most `max_chars` characters, appending a marker
/// when anything was cut. Respects char boundaries.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}\n... (log truncated) ...")
}

/// Uppercase the first character of `s`.
pub fn uppercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Convert a slug or identifier-ish string to PascalCase, splitting on
/// `_` and `-`. Non-alphanumeric leftovers are dropped; an empty result
/// becomes `_`.
pub fn to_pascal_case(input: &str) -> String {
    let parts: Vec<&str> = input
        .split(['_', '-'])
        .filter(|part| !part.is_empty())
        .collect();
    let mut out = String::new();
    for part in parts {
        let cleaned: String = part.chars().filter(|c| c.is_alphanumeric()).collect();
        if cleaned.is_empty() {
            continue;
        }
        out.push_str(&uppercase_first(&cleaned.to_lowercase()));
    }
    if out.is_empty() {
        return "_".to_string();
    }
    if !out.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_') {
        out.insert(0, '_');
    }
    out
}
