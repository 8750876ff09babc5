// src/core/target.rs

/// Reduces a raw domain entry to the bare hostname the checkers connect to.
///
/// Trims surrounding whitespace, strips a leading `http://` or `https://`
/// (case-sensitive) and drops everything from the first `/` onward.
/// Idempotent: a normalized hostname is returned unchanged.
pub fn normalize_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);

    without_scheme
        .split('/')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_and_path() {
        assert_eq!(normalize_domain("https://example.com/login?next=/"), "example.com");
        assert_eq!(normalize_domain("http://example.com/"), "example.com");
        assert_eq!(normalize_domain("example.com"), "example.com");
        assert_eq!(normalize_domain("  sub.example.com:8443/path \n"), "sub.example.com:8443");
    }

    #[test]
    fn scheme_match_is_case_sensitive() {
        // Not a recognized prefix, so only the path split applies.
        assert_eq!(normalize_domain("HTTPS://example.com"), "HTTPS:");
    }

    #[test]
    fn degenerate_inputs_normalize_to_empty() {
        assert_eq!(normalize_domain(""), "");
        assert_eq!(normalize_domain("https://"), "");
        assert_eq!(normalize_domain("/path/only"), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "https://example.com/a/b",
            "http://http://example.com",
            "https://https://x",
            "  https:// spaced.example /x",
            "example.com",
            "http:/broken",
            "https://",
            "",
            "ftp://example.com/file",
            "HTTP://Example.COM/",
        ];
        for sample in samples {
            let once = normalize_domain(sample);
            assert_eq!(normalize_domain(&once), once, "not idempotent for {sample:?}");
        }
    }
}
