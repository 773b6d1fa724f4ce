//! File-name sanitising for document and folder path components.

use crate::domain::{DocumentId, UNTITLED};

/// Extension of every document file.
pub const DOCUMENT_EXTENSION: &str = "md";

/// Longest component kept, in characters.
pub const MAX_COMPONENT_LEN: usize = 100;

/// Turns a title or folder name into a safe path component.
///
/// - Drops path separators, `:*?"<>|` and control characters
/// - Collapses runs of whitespace into one space
/// - Trims leading/trailing dots and spaces, so no component is hidden
/// - Truncates to [`MAX_COMPONENT_LEN`] characters
/// - Returns `Untitled` for empty results
///
/// ```
/// use quire::infra::sanitize_component;
///
/// assert_eq!(sanitize_component("Chapter 1: The Start"), "Chapter 1 The Start");
/// assert_eq!(sanitize_component("../secret"), "secret");
/// assert_eq!(sanitize_component("   "), "Untitled");
/// ```
pub fn sanitize_component(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    let mut pending_space = false;

    for c in name.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if is_forbidden(c) {
            continue;
        }
        if pending_space && !cleaned.is_empty() {
            cleaned.push(' ');
        }
        pending_space = false;
        cleaned.push(c);
    }

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == ' ');
    let capped: String = trimmed.chars().take(MAX_COMPONENT_LEN).collect();
    let capped = capped.trim_end_matches(|c| c == '.' || c == ' ');

    if capped.is_empty() {
        UNTITLED.to_string()
    } else {
        capped.to_string()
    }
}

/// `Title.md`
pub fn plain_file_name(base: &str) -> String {
    format!("{}.{}", base, DOCUMENT_EXTENSION)
}

/// `Title (xxxxxxxx).md`, using the identifier's short suffix.
pub fn disambiguated_file_name(base: &str, id: &DocumentId) -> String {
    format!("{} ({}).{}", base, id.short_suffix(), DOCUMENT_EXTENSION)
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}
