//! Profile data model: named sets of saved window descriptors plus the
//! policy settings that govern how they are restored.
//!
//! The serde attributes pin the on-disk JSON schema; descriptors written by
//! earlier releases (absolute rect only, no monitor metadata) must keep
//! loading, which is why almost every field has a default.

use serde::{Deserialize, Serialize};

use crate::browser::{self, BrowserIdentity};
use crate::geometry::{detect_snap, NormalizedRect, Rect, SnapKind};
use crate::matcher::WindowCandidate;
use crate::monitor::{monitor_for_rect, Monitor, MonitorRef};
use crate::normalize::{normalize_class, normalize_path, normalize_url};

/// Minimize/maximize state of a window, stored as -1/0/1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i8", into = "i8")]
pub enum WindowState {
    Minimized,
    #[default]
    Normal,
    Maximized,
}

impl From<i8> for WindowState {
    fn from(value: i8) -> Self {
        match value {
            v if v < 0 => WindowState::Minimized,
            0 => WindowState::Normal,
            _ => WindowState::Maximized,
        }
    }
}

impl From<WindowState> for i8 {
    fn from(value: WindowState) -> Self {
        match value {
            WindowState::Minimized => -1,
            WindowState::Normal => 0,
            WindowState::Maximized => 1,
        }
    }
}

/// Criteria used to find a saved window among live candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchRule {
    /// Executable name. Mandatory: an empty exe never matches anything.
    #[serde(default)]
    pub exe: String,

    /// Window class pattern; may carry a trailing wildcard for classes with
    /// per-session random suffixes. Empty matches any class.
    #[serde(default)]
    pub class: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub url: String,

    /// Normalized form of `url`, precomputed at capture time.
    #[serde(rename = "urlKey", default)]
    pub url_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserIdentity>,
}

/// One saved window inside a profile: match criteria, geometry, and state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedWindow {
    #[serde(rename = "match", default)]
    pub rule: MatchRule,

    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub rect: Rect,

    /// Rect normalized to the owning monitor's work area, for
    /// resolution-independent restore.
    #[serde(
        rename = "rectNormalized",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub rect_normalized: Option<NormalizedRect>,

    #[serde(rename = "minMax", default)]
    pub min_max: WindowState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap: Option<SnapKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor: Option<MonitorRef>,

    /// Virtual desktop that owned this window at capture time. Carried for
    /// the shell; the engine itself never moves windows across desktops.
    #[serde(rename = "desktopId", default, skip_serializing_if = "Option::is_none")]
    pub desktop_id: Option<String>,
}

impl SavedWindow {
    /// Build a descriptor from a live candidate.
    ///
    /// Canonicalizes everything that varies per session (class suffix, path
    /// separators, URL query parts), resolves the owning monitor by rect
    /// center, and precomputes the fractional rect and snap tag against that
    /// monitor's work area.
    pub fn capture(
        candidate: &WindowCandidate,
        rect: Rect,
        state: WindowState,
        monitors: &[Monitor],
    ) -> Self {
        let exe_lower = candidate.exe.to_lowercase();
        let owner = monitor_for_rect(rect, monitors);

        Self {
            rule: MatchRule {
                exe: candidate.exe.clone(),
                class: normalize_class(&candidate.class),
                title: candidate.title.clone(),
                url: candidate.url.clone(),
                url_key: normalize_url(&candidate.url),
                browser: browser::extract_identity(&exe_lower, &candidate.command_line),
            },
            path: normalize_path(&candidate.path),
            rect,
            rect_normalized: owner.map(|m| NormalizedRect::from_absolute(rect, m.work_area)),
            min_max: state,
            snap: owner.and_then(|m| detect_snap(rect, m.work_area)),
            monitor: owner.map(|m| MonitorRef {
                index: m.index,
                name: m.name.clone(),
                pixel_width: m.pixel_width,
                pixel_height: m.pixel_height,
            }),
            desktop_id: None,
        }
    }
}

/// A named window layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Mirror minimize/maximize/foreground state across this profile's
    /// windows while they are all open.
    #[serde(default)]
    pub sync: bool,

    #[serde(rename = "createdAt", default)]
    pub created_at: String,

    #[serde(rename = "updatedAt", default)]
    pub updated_at: String,

    #[serde(default)]
    pub windows: Vec<SavedWindow>,

    /// Target virtual desktop for the shell to move windows to on apply.
    #[serde(
        rename = "targetDesktopId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target_desktop_id: Option<String>,
}

/// Restore/sync policy bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Master switch for the synchronization engine.
    #[serde(rename = "syncEnabled", default)]
    pub sync_enabled: bool,

    /// Warn when aspect ratios differ by more than this (absolute w/h delta).
    #[serde(
        rename = "aspectRatioWarnThreshold",
        default = "default_aspect_threshold"
    )]
    pub aspect_ratio_warn_threshold: f64,

    /// Warn when the target resolution differs even at the same aspect
    /// ratio (e.g. 1080p to 4K).
    #[serde(rename = "warnOnResolutionMismatch", default = "default_true")]
    pub warn_on_resolution_mismatch: bool,

    /// Warn when the saved monitor cannot be resolved and a fallback is used.
    #[serde(rename = "warnOnMonitorMismatch", default = "default_true")]
    pub warn_on_monitor_mismatch: bool,

    /// Allow the shell to move windows across virtual desktops on apply.
    #[serde(rename = "allowCrossDesktopApply", default = "default_true")]
    pub allow_cross_desktop_apply: bool,
}

fn default_aspect_threshold() -> f64 {
    0.02
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sync_enabled: false,
            aspect_ratio_warn_threshold: default_aspect_threshold(),
            warn_on_resolution_mismatch: true,
            warn_on_monitor_mismatch: true,
            allow_cross_desktop_apply: true,
        }
    }
}

/// Top-level content of profiles.json.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilesRoot {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub profiles: Vec<Profile>,
}

fn default_version() -> u32 {
    1
}

impl ProfilesRoot {
    pub fn find_by_name(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn has_any_sync_profile(&self) -> bool {
        self.profiles.iter().any(|p| p.sync)
    }
}
