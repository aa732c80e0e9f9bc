//! Monitor descriptors and the monitor-transform decision.
//!
//! A profile stores which monitor a window lived on; at restore time the
//! saved descriptor has to be resolved against whatever monitors exist now,
//! and the substitution judged safe, warnable, or impossible.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::profile::Settings;
use crate::geometry::{Rect, WorkArea};

/// Monitor identity recorded in a saved window descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorRef {
    #[serde(rename = "index", default)]
    pub index: usize,

    #[serde(rename = "name", default)]
    pub name: String,

    /// Full monitor pixel width, used for aspect-ratio / resolution warnings.
    #[serde(rename = "pixelWidth", default)]
    pub pixel_width: i32,

    /// Full monitor pixel height, used for aspect-ratio / resolution warnings.
    #[serde(rename = "pixelHeight", default)]
    pub pixel_height: i32,
}

impl MonitorRef {
    pub fn has_pixel_size(&self) -> bool {
        self.pixel_width > 0 && self.pixel_height > 0
    }
}

/// A currently attached monitor. Snapshots are rebuilt per query and never
/// cached across placement decisions; one apply operation takes one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Monitor {
    /// 1-based enumeration index; index 1 is the primary monitor.
    pub index: usize,
    pub name: String,
    pub work_area: WorkArea,
    /// Full monitor bounds including docked UI.
    pub bounds: WorkArea,
    pub pixel_width: i32,
    pub pixel_height: i32,
}

/// Resolve a saved monitor reference against the current snapshot.
///
/// Priority: name, then index, then the primary monitor. Only a name hit
/// counts as an exact match; an index can silently point at different
/// hardware after a replug.
pub fn resolve_monitor<'a>(
    saved: Option<&MonitorRef>,
    monitors: &'a [Monitor],
) -> Option<(&'a Monitor, bool)> {
    let primary = monitors.first()?;

    let Some(saved) = saved else {
        return Some((primary, false));
    };

    if !saved.name.is_empty() {
        if let Some(m) = monitors.iter().find(|m| m.name == saved.name) {
            return Some((m, true));
        }
    }

    if saved.index >= 1 && saved.index <= monitors.len() {
        return Some((&monitors[saved.index - 1], false));
    }

    debug!(name = %saved.name, index = saved.index, "saved monitor not found, falling back to primary");
    Some((primary, false))
}

/// Find the monitor whose work area contains the rect's center, falling back
/// to the primary. Used for legacy descriptors that carry no monitor metadata.
pub fn monitor_for_rect<'a>(rect: Rect, monitors: &'a [Monitor]) -> Option<&'a Monitor> {
    let (cx, cy) = rect.center();
    monitors
        .iter()
        .find(|m| m.work_area.contains_point(cx, cy))
        .or_else(|| monitors.first())
}

/// Severity of a monitor substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransformLevel {
    /// No issues, apply normally.
    Allow,
    /// Differences detected, apply but tell the user.
    Warn,
    /// Restoring onto this target is impossible.
    Deny,
}

/// One independent finding about the substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformReason {
    pub level: TransformLevel,
    pub message: String,
}

/// Aggregate decision: the highest severity among all findings, with every
/// finding preserved. Callers must not stop at the first reason: all
/// applicable warnings are reported together.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformResult {
    pub level: TransformLevel,
    pub reasons: Vec<TransformReason>,
}

impl TransformResult {
    pub fn ok() -> Self {
        Self {
            level: TransformLevel::Allow,
            reasons: Vec::new(),
        }
    }

    fn warn(message: String) -> Self {
        Self {
            level: TransformLevel::Warn,
            reasons: vec![TransformReason {
                level: TransformLevel::Warn,
                message,
            }],
        }
    }

    /// An explicit user choice of monitor is always honored; Deny only
    /// protects against the system silently picking an unusable target.
    pub fn downgrade_deny_to_warn(mut self) -> Self {
        if self.level == TransformLevel::Deny {
            self.level = TransformLevel::Warn;
            for reason in &mut self.reasons {
                if reason.level == TransformLevel::Deny {
                    reason.level = TransformLevel::Warn;
                }
            }
        }
        self
    }
}

/// Judge restoring a window saved on `saved` onto a target monitor of the
/// given pixel size.
pub fn evaluate(
    saved: Option<&MonitorRef>,
    target_width: i32,
    target_height: i32,
    is_exact_monitor_match: bool,
    settings: &Settings,
) -> TransformResult {
    // Unresolvable target: nothing can be placed there.
    if target_width <= 0 || target_height <= 0 {
        return TransformResult {
            level: TransformLevel::Deny,
            reasons: vec![TransformReason {
                level: TransformLevel::Deny,
                message: format!(
                    "cannot resolve the target monitor (reported size {target_width}x{target_height})"
                ),
            }],
        };
    }

    // Without saved pixel dimensions only the absolute rect is usable.
    let Some(saved) = saved.filter(|s| s.has_pixel_size()) else {
        if !settings.warn_on_monitor_mismatch {
            return TransformResult::ok();
        }
        return TransformResult::warn(
            "no monitor metadata recorded; restoring by absolute coordinates".to_string(),
        );
    };

    // Same physical monitor at the same resolution: nothing changed.
    if is_exact_monitor_match
        && saved.pixel_width == target_width
        && saved.pixel_height == target_height
    {
        return TransformResult::ok();
    }

    let mut reasons = Vec::new();

    let saved_ar = f64::from(saved.pixel_width) / f64::from(saved.pixel_height);
    let target_ar = f64::from(target_width) / f64::from(target_height);
    let ar_delta = (saved_ar - target_ar).abs();
    if ar_delta > settings.aspect_ratio_warn_threshold {
        reasons.push(TransformReason {
            level: TransformLevel::Warn,
            message: format!(
                "aspect ratio differs: saved={saved_ar:.3}, target={target_ar:.3} (delta={ar_delta:.3})"
            ),
        });
    }

    if settings.warn_on_resolution_mismatch
        && (saved.pixel_width != target_width || saved.pixel_height != target_height)
    {
        reasons.push(TransformReason {
            level: TransformLevel::Warn,
            message: format!(
                "resolution differs: saved={}x{}, target={target_width}x{target_height}",
                saved.pixel_width, saved.pixel_height
            ),
        });
    }

    if !is_exact_monitor_match && settings.warn_on_monitor_mismatch {
        reasons.push(TransformReason {
            level: TransformLevel::Warn,
            message: format!(
                "placing on a different monitor (saved={} #{})",
                saved.name, saved.index
            ),
        });
    }

    if reasons.is_empty() {
        return TransformResult::ok();
    }

    let level = reasons
        .iter()
        .map(|r| r.level)
        .max()
        .unwrap_or(TransformLevel::Warn);
    TransformResult { level, reasons }
}
