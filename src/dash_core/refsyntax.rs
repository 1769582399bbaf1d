use regex::Regex;
use std::sync::OnceLock;

/// Prefix families the dashboard resolves at render time. A bare value
/// starting with one of these is meant to be a reference and gets wrapped
/// at commit time.
pub const VAR_PREFIXES: [&str; 2] = ["HOMEPAGE_VAR_", "HOMEPAGE_FILE_"];

static REF_RE: OnceLock<Regex> = OnceLock::new();

fn ref_re() -> &'static Regex {
    REF_RE.get_or_init(|| Regex::new(r"^\{\{\s*([A-Za-z0-9_]+)\s*\}\}$").unwrap())
}

/// True when the value is a single, fully wrapped reference.
pub fn is_reference(value: &str) -> bool {
    ref_re().is_match(value.trim())
}

/// Extract NAME out of `{{NAME}}`.
pub fn reference_name(value: &str) -> Option<String> {
    ref_re()
        .captures(value.trim())
        .map(|caps| caps[1].to_string())
}

pub fn has_recognized_prefix(value: &str) -> bool {
    VAR_PREFIXES.iter().any(|p| value.starts_with(p))
}

/// Commit-time normalization. One-way and idempotent:
/// - an already wrapped reference comes back unchanged;
/// - a bare name with a recognized prefix is wrapped into `{{NAME}}`;
/// - partial wrapping (stray braces on either side) around a recognized
///   name is a formatting defect and is repaired to a full wrap;
/// - anything else passes through untouched.
pub fn wrap_on_commit(value: &str) -> String {
    let trimmed = value.trim();
    if is_reference(trimmed) {
        return trimmed.to_string();
    }
    let bare = trimmed
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim();
    if has_recognized_prefix(bare) {
        return format!("{{{{{bare}}}}}");
    }
    value.to_string()
}
