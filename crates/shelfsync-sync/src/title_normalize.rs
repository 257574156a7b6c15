//! Title normalization for the title+author fallback match.
//!
//! ABS titles routinely carry an "(Unabridged)" suffix Hardcover's catalog
//! never stores; stripping it (and the handful of variants publishers use)
//! turns an otherwise-exact title into a match.

const UNABRIDGED_SUFFIXES: &[&str] = &["(unabridged)", "[unabridged]", "- unabridged"];

/// Lowercases, trims, and strips a trailing "(Unabridged)"-style suffix and
/// any punctuation left dangling after the strip.
pub fn normalize_title(title: &str) -> String {
    let mut normalized = title.trim().to_lowercase();

    for suffix in UNABRIDGED_SUFFIXES {
        if let Some(stripped) = normalized.strip_suffix(suffix) {
            normalized = stripped.trim_end().to_string();
            break;
        }
    }

    normalized
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_string()
}
