use std::sync::OnceLock;

use regex::Regex;

/// Strips characters the engine's script list cannot show, then trims.
pub fn sanitize_name(raw: &str) -> String {
    invalid_name_regex()
        .replace_all(raw, "")
        .trim()
        .to_string()
}

pub fn is_valid_name(raw: &str) -> bool {
    !invalid_name_regex().is_match(raw)
}

fn invalid_name_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"[^A-Za-z0-9 +\-_=.,!@#$%\^&();'{}\[\]]+").expect("invalid name regex")
    })
}
