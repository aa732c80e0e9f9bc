//! Placement: put one matched window where its descriptor says.
//!
//! Strategy priority is snap > fractional > absolute. A snap tag is always
//! recomputed against the *current* target work area; a stale absolute snap
//! rect from a different resolution would land wrong. The fractional path
//! handles monitor/resolution changes; the absolute path is the untouched
//! same-resolution (and legacy-data) case.

use std::thread;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::config::profile::{SavedWindow, Settings, WindowState};
use crate::constants::placement::{FRAME_MARGIN, MIN_VISIBLE_SIZE, RESTORE_SETTLE};
use crate::geometry::{rect_from_snap, NormalizedRect, Rect, WorkArea};
use crate::monitor::{
    evaluate, monitor_for_rect, resolve_monitor, Monitor, TransformLevel, TransformResult,
};
use crate::platform::{WindowId, WindowSystem};

/// What came out of one placement attempt.
#[derive(Debug, Clone)]
pub struct ArrangeOutcome {
    pub applied: bool,
    /// The monitor-transform verdict, absent only when the handle was
    /// already dead and nothing was evaluated.
    pub transform: Option<TransformResult>,
}

/// Place `handle` according to `saved`.
///
/// `forced` is a destination the user explicitly picked; an explicit choice
/// is always honored, so a Deny verdict is downgraded to Warn there. On the
/// non-forced path a Deny aborts with `applied = false`. Placement-command
/// failures are logged and returned as errors; the caller records them as
/// per-item failures and keeps going.
pub fn arrange(
    sys: &dyn WindowSystem,
    handle: WindowId,
    saved: &SavedWindow,
    forced: Option<&Monitor>,
    settings: &Settings,
) -> Result<ArrangeOutcome> {
    if !sys.is_valid(handle) {
        return Ok(ArrangeOutcome {
            applied: false,
            transform: None,
        });
    }

    // One fresh snapshot per placement; monitors may have changed since the
    // caller last looked.
    let monitors = sys.monitors()?;

    let (target, exact, transform) = match forced {
        Some(target) => {
            let exact = is_saved_monitor(saved, target);
            let transform = evaluate(
                saved.monitor.as_ref(),
                target.pixel_width,
                target.pixel_height,
                exact,
                settings,
            )
            .downgrade_deny_to_warn();
            (target, exact, transform)
        }
        None => {
            let resolved = if saved.monitor.is_none() && saved.rect_normalized.is_none() {
                // Legacy descriptor: only the absolute rect tells us where it lived
                monitor_for_rect(saved.rect, &monitors).map(|m| (m, false))
            } else {
                resolve_monitor(saved.monitor.as_ref(), &monitors)
            };

            let Some((target, exact)) = resolved else {
                // No monitors at all: nothing can be placed anywhere
                return Ok(ArrangeOutcome {
                    applied: false,
                    transform: Some(evaluate(saved.monitor.as_ref(), 0, 0, false, settings)),
                });
            };

            let transform = evaluate(
                saved.monitor.as_ref(),
                target.pixel_width,
                target.pixel_height,
                exact,
                settings,
            );
            (target, exact, transform)
        }
    };

    if transform.level == TransformLevel::Deny {
        return Ok(ArrangeOutcome {
            applied: false,
            transform: Some(transform),
        });
    }

    let rect = choose_rect(saved, target, exact, forced.is_some(), &monitors);
    let rect = clamp_rect(rect, target.work_area);
    debug!(handle, ?rect, monitor = %target.name, "arranging window");

    if let Err(err) = apply_rect(sys, handle, rect, saved.min_max) {
        warn!(handle, error = %err, "placement command failed");
        return Err(err);
    }

    Ok(ArrangeOutcome {
        applied: true,
        transform: Some(transform),
    })
}

fn is_saved_monitor(saved: &SavedWindow, target: &Monitor) -> bool {
    saved
        .monitor
        .as_ref()
        .is_some_and(|m| !m.name.is_empty() && m.name == target.name)
}

/// Pick the geometry: snap tag recomputed for the target work area, else the
/// fractional rect when the monitor or resolution changed, else the saved
/// absolute rect.
fn choose_rect(
    saved: &SavedWindow,
    target: &Monitor,
    exact: bool,
    forced: bool,
    monitors: &[Monitor],
) -> Rect {
    if let Some(rect) = saved.snap.and_then(|kind| rect_from_snap(target.work_area, kind)) {
        return rect;
    }

    let resolution_differs = saved.monitor.as_ref().is_some_and(|m| {
        m.has_pixel_size()
            && (m.pixel_width != target.pixel_width || m.pixel_height != target.pixel_height)
    });
    let forced_elsewhere = forced && !exact;

    if forced_elsewhere || resolution_differs {
        let norm = saved.rect_normalized.unwrap_or_else(|| {
            // Nothing persisted: derive the fractions from the saved absolute
            // rect against the work area it was captured on.
            let original_wa = resolve_monitor(saved.monitor.as_ref(), monitors)
                .map(|(m, _)| m.work_area)
                .unwrap_or(target.work_area);
            NormalizedRect::from_absolute(saved.rect, original_wa)
        });
        return norm.to_absolute(target.work_area);
    }

    saved.rect
}

/// Keep the rect usable: a minimum visible size, no larger than the work
/// area plus the invisible-frame margin, origin inside the margin-extended
/// work-area bounds.
fn clamp_rect(rect: Rect, wa: WorkArea) -> Rect {
    let max_w = (wa.width + FRAME_MARGIN).max(MIN_VISIBLE_SIZE);
    let max_h = (wa.height + FRAME_MARGIN).max(MIN_VISIBLE_SIZE);
    let w = rect.w.clamp(MIN_VISIBLE_SIZE, max_w);
    let h = rect.h.clamp(MIN_VISIBLE_SIZE, max_h);

    let min_x = wa.left - FRAME_MARGIN;
    let max_x = (wa.right() + FRAME_MARGIN - w).max(min_x);
    let min_y = wa.top - FRAME_MARGIN;
    let max_y = (wa.bottom() + FRAME_MARGIN - h).max(min_y);

    Rect {
        x: rect.x.clamp(min_x, max_x),
        y: rect.y.clamp(min_y, max_y),
        w,
        h,
    }
}

/// Restore first (a minimized/maximized window cannot be repositioned
/// directly), then position, then the target state.
fn apply_rect(
    sys: &dyn WindowSystem,
    handle: WindowId,
    rect: Rect,
    state: WindowState,
) -> Result<()> {
    sys.restore(handle)
        .with_context(|| format!("restore failed for window {handle}"))?;
    thread::sleep(RESTORE_SETTLE);

    sys.set_position(handle, rect)
        .with_context(|| format!("set_position failed for window {handle}"))?;

    match state {
        WindowState::Minimized => sys
            .minimize(handle)
            .with_context(|| format!("minimize failed for window {handle}"))?,
        WindowState::Maximized => sys
            .maximize(handle)
            .with_context(|| format!("maximize failed for window {handle}"))?,
        WindowState::Normal => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::profile::MatchRule;
    use crate::geometry::SnapKind;
    use crate::monitor::MonitorRef;
    use crate::platform::mock::{Call, MockSystem, MockWindow};

    fn monitor(index: usize, name: &str, wa: WorkArea) -> Monitor {
        Monitor {
            index,
            name: name.to_string(),
            work_area: wa,
            bounds: WorkArea::new(wa.left, wa.top, wa.width, wa.height + 40),
            pixel_width: wa.width,
            pixel_height: wa.height + 40,
        }
    }

    fn saved_on(name: &str, index: usize, pw: i32, ph: i32) -> SavedWindow {
        SavedWindow {
            rule: MatchRule {
                exe: "notepad.exe".to_string(),
                ..Default::default()
            },
            rect: Rect::new(100, 100, 800, 600),
            monitor: Some(MonitorRef {
                index,
                name: name.to_string(),
                pixel_width: pw,
                pixel_height: ph,
            }),
            ..Default::default()
        }
    }

    fn system_with(monitors: Vec<Monitor>) -> MockSystem {
        let sys = MockSystem::with_monitors(monitors);
        sys.add_window(1, MockWindow::new("notepad.exe", "Notepad", "Untitled"));
        sys
    }

    #[test]
    fn test_dead_handle_applies_nothing() {
        let sys = system_with(vec![monitor(1, "D1", WorkArea::new(0, 0, 1920, 1040))]);
        sys.invalidate(1);

        let outcome = arrange(&sys, 1, &saved_on("D1", 1, 1920, 1080), None, &Settings::default())
            .unwrap();
        assert!(!outcome.applied);
        assert!(outcome.transform.is_none());
        assert!(sys.calls().is_empty());
    }

    #[test]
    fn test_same_monitor_uses_absolute_rect() {
        let sys = system_with(vec![monitor(1, "D1", WorkArea::new(0, 0, 1920, 1040))]);
        let saved = saved_on("D1", 1, 1920, 1080);

        let outcome = arrange(&sys, 1, &saved, None, &Settings::default()).unwrap();
        assert!(outcome.applied);
        let transform = outcome.transform.unwrap();
        assert_eq!(transform.level, TransformLevel::Allow);
        assert!(sys
            .calls()
            .contains(&Call::SetPosition(1, Rect::new(100, 100, 800, 600))));
        assert_eq!(sys.rect_of(1), Some(Rect::new(100, 100, 800, 600)));
    }

    #[test]
    fn test_snap_recomputed_for_target_work_area() {
        // Saved snapped-left on a 1080p monitor, restored onto 4K: the snap
        // rect must come from the 4K work area, not the stale absolute rect.
        let sys = system_with(vec![monitor(1, "D1", WorkArea::new(0, 0, 3840, 2120))]);
        let mut saved = saved_on("D1", 1, 1920, 1080);
        saved.rect = Rect::new(0, 0, 960, 1040);
        saved.snap = Some(SnapKind::Left);

        let outcome = arrange(&sys, 1, &saved, None, &Settings::default()).unwrap();
        assert!(outcome.applied);
        assert!(sys
            .calls()
            .contains(&Call::SetPosition(1, Rect::new(0, 0, 1920, 2120))));
    }

    #[test]
    fn test_fractional_rect_scales_across_resolutions() {
        let sys = system_with(vec![monitor(1, "D1", WorkArea::new(0, 0, 3840, 2120))]);
        let mut saved = saved_on("D1", 1, 1920, 1080);
        saved.rect = Rect::new(0, 0, 960, 1040);
        saved.rect_normalized = Some(NormalizedRect {
            x_n: 0.0,
            y_n: 0.0,
            w_n: 0.5,
            h_n: 1.0,
        });

        let outcome = arrange(&sys, 1, &saved, None, &Settings::default()).unwrap();
        assert!(outcome.applied);
        assert!(sys
            .calls()
            .contains(&Call::SetPosition(1, Rect::new(0, 0, 1920, 2120))));
        // Resolution changed on the same monitor: warn, but no aspect complaint
        let transform = outcome.transform.unwrap();
        assert_eq!(transform.level, TransformLevel::Warn);
        assert!(transform
            .reasons
            .iter()
            .any(|r| r.message.contains("resolution differs")));
    }

    #[test]
    fn test_fractional_computed_on_the_fly_when_not_persisted() {
        // Saved on D1 (still attached, 1080p), applying while D1 reports 4K.
        // No rectNormalized stored: the fractions come from the saved rect
        // against D1's current work area... which is the 4K one, so derive
        // from a second monitor instead to keep original and target distinct.
        let d1 = monitor(1, "D1", WorkArea::new(0, 0, 1920, 1040));
        let d2 = monitor(2, "D2", WorkArea::new(1920, 0, 3840, 2120));
        let sys = system_with(vec![d1, d2]);

        // Saved on D1; force to D2. Original work area resolves to D1.
        let mut saved = saved_on("D1", 1, 1920, 1080);
        saved.rect = Rect::new(0, 0, 960, 1040); // left half of D1

        let monitors = sys.monitors().unwrap();
        let forced = monitors[1].clone();
        let outcome = arrange(&sys, 1, &saved, Some(&forced), &Settings::default()).unwrap();
        assert!(outcome.applied);
        // Left half of D1 becomes left half of D2
        assert!(sys
            .calls()
            .contains(&Call::SetPosition(1, Rect::new(1920, 0, 1920, 2120))));
    }

    #[test]
    fn test_legacy_descriptor_resolves_by_rect_center() {
        let d1 = monitor(1, "D1", WorkArea::new(0, 0, 1920, 1040));
        let d2 = monitor(2, "D2", WorkArea::new(1920, 0, 1920, 1040));
        let sys = system_with(vec![d1, d2]);

        // No monitor, no fractional rect; the rect sits on D2
        let saved = SavedWindow {
            rule: MatchRule {
                exe: "notepad.exe".to_string(),
                ..Default::default()
            },
            rect: Rect::new(2000, 100, 800, 600),
            ..Default::default()
        };

        let outcome = arrange(&sys, 1, &saved, None, &Settings::default()).unwrap();
        assert!(outcome.applied);
        // Absolute path: rect unchanged (it already fits D2's work area)
        assert!(sys
            .calls()
            .contains(&Call::SetPosition(1, Rect::new(2000, 100, 800, 600))));
        // No saved monitor metadata: warned, not denied
        let transform = outcome.transform.unwrap();
        assert_eq!(transform.level, TransformLevel::Warn);
    }

    #[test]
    fn test_no_monitors_denies() {
        let sys = MockSystem::new();
        sys.add_window(1, MockWindow::new("notepad.exe", "Notepad", "Untitled"));

        let outcome = arrange(&sys, 1, &saved_on("D1", 1, 1920, 1080), None, &Settings::default())
            .unwrap();
        assert!(!outcome.applied);
        assert_eq!(outcome.transform.unwrap().level, TransformLevel::Deny);
        assert!(sys.calls().is_empty());
    }

    #[test]
    fn test_forced_monitor_downgrades_deny() {
        // A forced target with unusable reported size would be Deny on the
        // automatic path; the explicit user choice turns it into Warn and
        // the placement still runs.
        let sys = system_with(vec![monitor(1, "D1", WorkArea::new(0, 0, 1920, 1040))]);
        let broken = Monitor {
            index: 2,
            name: "D2".to_string(),
            work_area: WorkArea::new(1920, 0, 1920, 1040),
            bounds: WorkArea::new(1920, 0, 1920, 1040),
            pixel_width: 0,
            pixel_height: 0,
        };

        let outcome = arrange(
            &sys,
            1,
            &saved_on("D1", 1, 1920, 1080),
            Some(&broken),
            &Settings::default(),
        )
        .unwrap();
        assert!(outcome.applied);
        let transform = outcome.transform.unwrap();
        assert_eq!(transform.level, TransformLevel::Warn);
    }

    #[test]
    fn test_clamp_enforces_minimum_and_margins() {
        let wa = WorkArea::new(0, 0, 1920, 1040);

        // Tiny rect grows to the minimum visible size
        let r = clamp_rect(Rect::new(500, 500, 20, 20), wa);
        assert_eq!((r.w, r.h), (MIN_VISIBLE_SIZE, MIN_VISIBLE_SIZE));

        // Oversized rect is capped at work area + frame margin
        let r = clamp_rect(Rect::new(0, 0, 5000, 5000), wa);
        assert_eq!((r.w, r.h), (1920 + FRAME_MARGIN, 1040 + FRAME_MARGIN));

        // Origin pulled back inside the margin-extended bounds
        let r = clamp_rect(Rect::new(-500, -500, 800, 600), wa);
        assert_eq!((r.x, r.y), (-FRAME_MARGIN, -FRAME_MARGIN));
        let r = clamp_rect(Rect::new(5000, 5000, 800, 600), wa);
        assert_eq!((r.x, r.y), (1920 + FRAME_MARGIN - 800, 1040 + FRAME_MARGIN - 600));

        // Drop-shadow overflow inside the margin is preserved
        let r = clamp_rect(Rect::new(-7, 0, 1934, 600), wa);
        assert_eq!((r.x, r.w), (-7, 1930));
    }

    #[test]
    fn test_restore_precedes_position_and_final_state() {
        let sys = system_with(vec![monitor(1, "D1", WorkArea::new(0, 0, 1920, 1040))]);
        let mut saved = saved_on("D1", 1, 1920, 1080);
        saved.min_max = WindowState::Maximized;

        arrange(&sys, 1, &saved, None, &Settings::default()).unwrap();
        let calls = sys.calls();
        assert_eq!(calls[0], Call::Restore(1));
        assert!(matches!(calls[1], Call::SetPosition(1, _)));
        assert_eq!(calls[2], Call::Maximize(1));
    }

    #[test]
    fn test_placement_failure_bubbles_as_error() {
        let sys = system_with(vec![monitor(1, "D1", WorkArea::new(0, 0, 1920, 1040))]);
        sys.fail_set_position();

        let result = arrange(&sys, 1, &saved_on("D1", 1, 1920, 1080), None, &Settings::default());
        assert!(result.is_err());
    }
}
