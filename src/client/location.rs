use regex::Regex;
use std::sync::OnceLock;

fn has_network_scheme(location: &str) -> bool {
    static SCHEME_RE: OnceLock<Regex> = OnceLock::new();
    let re = SCHEME_RE
        .get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("valid scheme regex"));
    re.is_match(location)
}

/// Resolve a result reference against the backend origin.
///
/// Absolute locations (`https://...`) are returned byte-for-byte; anything
/// else is trimmed and treated as a path on `origin`.
pub fn resolve_result_location(origin: &str, path_or_url: &str) -> String {
    if has_network_scheme(path_or_url) {
        return path_or_url.to_string();
    }

    let location = path_or_url.trim();
    let origin = origin.trim_end_matches('/');
    if location.starts_with('/') {
        format!("{}{}", origin, location)
    } else {
        format!("{}/{}", origin, location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_location_unchanged() {
        assert_eq!(
            resolve_result_location("http://h:8000", "https://x/y.png"),
            "https://x/y.png"
        );
        assert_eq!(
            resolve_result_location("http://h:8000", "http://cdn.example.com/a.png"),
            "http://cdn.example.com/a.png"
        );
        assert_eq!(
            resolve_result_location("http://h:8000", "https://x/y%20z.png "),
            "https://x/y%20z.png "
        );
    }

    #[test]
    fn test_relative_location_joined() {
        assert_eq!(
            resolve_result_location("http://h:8000", "/outputs/a.png"),
            "http://h:8000/outputs/a.png"
        );
        assert_eq!(
            resolve_result_location("http://h:8000/", "outputs/a.png"),
            "http://h:8000/outputs/a.png"
        );
        assert_eq!(
            resolve_result_location("http://h:8000", " /outputs/a.png\n"),
            "http://h:8000/outputs/a.png"
        );
    }

    #[test]
    fn test_scheme_detection() {
        assert!(has_network_scheme("s3+https://bucket/key"));
        assert!(!has_network_scheme("/outputs/http://odd.png"));
        assert!(!has_network_scheme("outputs/a.png"));
    }
}
