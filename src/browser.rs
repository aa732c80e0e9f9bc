//! Browser process identity.
//!
//! Several browser windows of the same executable are only tellable apart by
//! the profile their process was launched with, which is visible in the
//! launch command line.

use serde::{Deserialize, Serialize};

use crate::normalize::normalize_path;

/// Browser family, deciding which command-line switches carry the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chromium,
    Firefox,
}

/// Detect the browser family from a lowercased executable name.
pub fn browser_kind(exe_lower: &str) -> Option<BrowserKind> {
    match exe_lower {
        "chrome.exe" | "msedge.exe" | "brave.exe" | "vivaldi.exe" => Some(BrowserKind::Chromium),
        "firefox.exe" | "floorp.exe" => Some(BrowserKind::Firefox),
        _ => None,
    }
}

pub fn is_browser(exe_lower: &str) -> bool {
    browser_kind(exe_lower).is_some()
}

/// Profile identity of a browser process. Chromium populates the first pair,
/// Firefox the second.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserIdentity {
    #[serde(rename = "kind")]
    pub kind: String,

    /// Chromium --user-data-dir
    #[serde(rename = "userDataDir", skip_serializing_if = "Option::is_none")]
    pub user_data_dir: Option<String>,

    /// Chromium --profile-directory
    #[serde(rename = "profileDirectory", skip_serializing_if = "Option::is_none")]
    pub profile_directory: Option<String>,

    /// Firefox -profile
    #[serde(rename = "profileDir", skip_serializing_if = "Option::is_none")]
    pub profile_dir: Option<String>,

    /// Firefox -P
    #[serde(rename = "profileName", skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
}

/// Extract the profile identity from a browser's launch command line.
/// `None` when the command line is unavailable or carries no profile switch.
pub fn extract_identity(exe_lower: &str, command_line: &str) -> Option<BrowserIdentity> {
    if command_line.is_empty() {
        return None;
    }

    match browser_kind(exe_lower)? {
        BrowserKind::Chromium => {
            let ud = cmd_arg(command_line, "--user-data-dir");
            let pd = cmd_arg(command_line, "--profile-directory");
            if ud.is_none() && pd.is_none() {
                return None;
            }
            Some(BrowserIdentity {
                kind: "chromium".to_string(),
                user_data_dir: ud.map(|v| normalize_path(&v)),
                profile_directory: pd,
                ..Default::default()
            })
        }
        BrowserKind::Firefox => {
            let dir = cmd_arg(command_line, "-profile");
            let name = cmd_arg(command_line, "-P");
            if dir.is_none() && name.is_none() {
                return None;
            }
            Some(BrowserIdentity {
                kind: "firefox".to_string(),
                profile_dir: dir.map(|v| normalize_path(&v)),
                profile_name: name,
                ..Default::default()
            })
        }
    }
}

/// Find the value of `key` in a command line, accepting `key=value`,
/// `key="value"`, `key value` and `key "value"` forms.
fn cmd_arg(cmd: &str, key: &str) -> Option<String> {
    let escaped = regex::escape(key);
    for pattern in [
        format!(r#"(?i)(?:^|\s)({escaped})=("[^"]+"|\S+)"#),
        format!(r#"(?i)(?:^|\s)({escaped})\s+("[^"]+"|\S+)"#),
    ] {
        // Keys are a tiny fixed set; compiling per lookup is cheap enough here.
        let re = regex::Regex::new(&pattern).ok()?;
        if let Some(caps) = re.captures(cmd) {
            let value = caps[2].trim_matches('"').to_string();
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_kind_detection() {
        assert_eq!(browser_kind("chrome.exe"), Some(BrowserKind::Chromium));
        assert_eq!(browser_kind("msedge.exe"), Some(BrowserKind::Chromium));
        assert_eq!(browser_kind("firefox.exe"), Some(BrowserKind::Firefox));
        assert_eq!(browser_kind("notepad.exe"), None);
        assert!(is_browser("vivaldi.exe"));
        assert!(!is_browser("explorer.exe"));
    }

    #[test]
    fn test_extract_chromium_identity() {
        let cmd = r#""C:\Program Files\Google\Chrome\chrome.exe" --profile-directory="Profile 2" --flag"#;
        let ident = extract_identity("chrome.exe", cmd).unwrap();
        assert_eq!(ident.kind, "chromium");
        assert_eq!(ident.profile_directory.as_deref(), Some("Profile 2"));
        assert_eq!(ident.user_data_dir, None);
    }

    #[test]
    fn test_extract_chromium_user_data_dir_is_normalized() {
        let cmd = r"chrome.exe --user-data-dir=C:\\Users\\me\\Data";
        let ident = extract_identity("chrome.exe", cmd).unwrap();
        assert_eq!(ident.user_data_dir.as_deref(), Some(r"C:\Users\me\Data"));
    }

    #[test]
    fn test_extract_firefox_identity_space_separated() {
        let cmd = r#"firefox.exe -P "work profile" -no-remote"#;
        let ident = extract_identity("firefox.exe", cmd).unwrap();
        assert_eq!(ident.kind, "firefox");
        assert_eq!(ident.profile_name.as_deref(), Some("work profile"));
    }

    #[test]
    fn test_extract_identity_none_without_profile_switches() {
        assert_eq!(extract_identity("chrome.exe", "chrome.exe --flag"), None);
        assert_eq!(extract_identity("chrome.exe", ""), None);
        assert_eq!(extract_identity("notepad.exe", "notepad.exe file.txt"), None);
    }
}
