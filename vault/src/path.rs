//! Secret path normalization.
//!
//! The vault addresses secrets by slug: a lower-case, colon-delimited path.

/// Separator between path segments in a slug.
pub const SEGMENT_SEPARATOR: char = ':';

/// Convert a raw path into the vault's canonical slug form.
///
/// Trims surrounding whitespace, lower-cases, then replaces backslashes with
/// hyphens and forward slashes with colons.
///
/// # Examples
///
/// ```
/// use dsv_secure_store::path::normalize;
///
/// assert_eq!(normalize("A\\B/C "), "a-b:c");
/// ```
#[must_use]
pub fn normalize(path: &str) -> String {
    path.trim()
        .to_lowercase()
        .replace('\\', "-")
        .replace('/', ":")
}

/// Build the slug for a new secret under `prefix`.
#[must_use]
pub fn qualify(prefix: &str, path: &str) -> String {
    normalize(&format!("{prefix}{SEGMENT_SEPARATOR}{path}"))
}
