//! String canonicalization for matching: executable paths, URLs, and
//! window-class names all arrive in per-session or historically mangled
//! forms and have to be normalized before comparison.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static QUERY_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[#?].*$").unwrap());
static HTTP_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(https?|ws|wss|ftp)://([^/]+)(/.*)?$").unwrap());
static ABOUT_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(about:\S+)").unwrap());
static FILE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^file:/{0,3}(.+)$").unwrap());
static URL_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(https?|ws|wss|ftp)://([^/]+)").unwrap());
static GUID_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^Avalonia-[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .unwrap()
});

/// Collapse repeated backslashes in Windows paths. Old saved data carries
/// doubled separators (`C:\\\\foo`) that would defeat path comparison.
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let bytes = path.as_bytes();

    // Drive path: C:\...
    if bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && bytes[2] == b'\\'
    {
        return collapse_backslashes(path);
    }

    // UNC path: \\server\share
    if path.starts_with("\\\\") {
        let tail = path.trim_start_matches('\\');
        return format!("\\\\{}", collapse_backslashes(tail));
    }

    path.to_string()
}

fn collapse_backslashes(value: &str) -> String {
    if !value.contains("\\\\") {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut prev_was_backslash = false;
    for ch in value.chars() {
        if ch == '\\' {
            if !prev_was_backslash {
                out.push(ch);
            }
            prev_was_backslash = true;
        } else {
            out.push(ch);
            prev_was_backslash = false;
        }
    }
    out
}

/// Normalize a URL into a stable matching key: trim, strip query/fragment,
/// lowercase scheme and host, keep the path's case.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let collapsed = WHITESPACE.replace_all(trimmed, " ");
    let stripped = QUERY_FRAGMENT.replace(&collapsed, "");

    if let Some(caps) = HTTP_URL.captures(&stripped) {
        let scheme = caps[1].to_lowercase();
        let host = caps[2].to_lowercase();
        let path = caps.get(3).map_or("/", |m| m.as_str());
        return format!("{scheme}://{host}{path}");
    }

    if let Some(caps) = ABOUT_URL.captures(&stripped) {
        return caps[1].to_lowercase();
    }

    if let Some(caps) = FILE_URL.captures(&stripped) {
        return format!("file:{}", caps[1].to_lowercase());
    }

    stripped.to_lowercase()
}

/// Extract the host from a normalized URL key. Empty for non-network keys
/// (`about:`, `file:`).
pub fn url_host(url_key: &str) -> String {
    URL_HOST
        .captures(url_key)
        .map(|caps| caps[2].to_lowercase())
        .unwrap_or_default()
}

/// Normalize a window-class name for storage. Some frameworks embed a
/// per-session random suffix in the class, so the stored pattern keeps only
/// the stable family prefix plus a wildcard marker.
pub fn normalize_class(class: &str) -> String {
    if class.is_empty() {
        return String::new();
    }

    // Avalonia-<guid> changes every session
    if GUID_CLASS.is_match(class) {
        return "Avalonia-*".to_string();
    }

    // WPF hosts: HwndWrapper[App;;<guid>]
    if class.starts_with("HwndWrapper[") {
        return "HwndWrapper[*".to_string();
    }

    class.to_string()
}

/// Check a live class name against a saved (possibly wildcarded) pattern.
///
/// An empty pattern matches anything. An `Avalonia-` pattern matches the
/// whole family regardless of wildcard marker. A trailing `*` matches any
/// class sharing the literal prefix. Everything else is an exact match.
pub fn class_matches(actual: &str, expected: &str) -> bool {
    if expected.is_empty() {
        return true;
    }

    if has_family_prefix(expected) {
        return has_family_prefix(actual);
    }

    if let Some(prefix) = expected.strip_suffix('*') {
        return actual.starts_with(prefix);
    }

    actual == expected
}

fn has_family_prefix(class: &str) -> bool {
    class
        .get(..9)
        .is_some_and(|p| p.eq_ignore_ascii_case("Avalonia-"))
}
