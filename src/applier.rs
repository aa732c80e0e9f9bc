//! Profile application: match every saved window against the live set,
//! optionally launch what is missing, place each match, and report the
//! aggregate. One window failing never stops the rest.

use std::collections::HashSet;
use std::path::Path;
use std::thread;
use std::time::Instant;

use tracing::{info, warn};

use crate::arranger;
use crate::config::profile::{Profile, ProfilesRoot, SavedWindow, Settings};
use crate::constants::launch::{POLL_INTERVAL, WAIT_CEILING};
use crate::matcher::{self, WindowCandidate};
use crate::monitor::{Monitor, TransformLevel};
use crate::platform::{WindowId, WindowSystem};

/// Aggregate outcome of applying one profile.
#[derive(Debug, Default)]
pub struct ApplyResult {
    pub applied: usize,
    pub total: usize,
    /// Per-descriptor failures: not found, placement denied, OS call failed.
    pub failures: Vec<String>,
    /// Caveats on windows that were still placed (resolution, monitor
    /// fallback, ambiguous match). Not failures.
    pub warnings: Vec<String>,
}

impl ApplyResult {
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    fn not_found(message: &str) -> Self {
        Self {
            failures: vec![message.to_string()],
            ..Default::default()
        }
    }

    /// One-line status for logs and the CLI.
    pub fn summary(&self, profile_name: &str) -> String {
        let mut msg = format!("{profile_name}: applied {}/{}", self.applied, self.total);
        if !self.failures.is_empty() {
            let shown: Vec<String> = self.failures.iter().take(3).cloned().collect();
            msg.push_str(&format!(
                " ({} failed: {})",
                self.failures.len(),
                shown.join("; ")
            ));
        }
        if !self.warnings.is_empty() {
            msg.push_str(&format!(", {} warning(s)", self.warnings.len()));
        }
        msg
    }
}

/// Applies profiles through the capability surface.
pub struct ProfileApplier<'a> {
    sys: &'a dyn WindowSystem,
    settings: &'a Settings,
    schedule_rebuild: Option<&'a dyn Fn()>,
}

impl<'a> ProfileApplier<'a> {
    pub fn new(sys: &'a dyn WindowSystem, settings: &'a Settings) -> Self {
        Self {
            sys,
            settings,
            schedule_rebuild: None,
        }
    }

    /// Ask the sync engine to refresh its groups after every apply.
    pub fn with_rebuild_hook(mut self, hook: &'a dyn Fn()) -> Self {
        self.schedule_rebuild = Some(hook);
        self
    }

    pub fn apply_by_name(
        &self,
        root: &ProfilesRoot,
        name: &str,
        launch_missing: bool,
        forced: Option<&Monitor>,
    ) -> ApplyResult {
        match root.find_by_name(name) {
            Some(profile) => self.apply(profile, launch_missing, forced),
            None => ApplyResult::not_found(&format!("profile not found: {name}")),
        }
    }

    pub fn apply_by_id(
        &self,
        root: &ProfilesRoot,
        id: &str,
        launch_missing: bool,
        forced: Option<&Monitor>,
    ) -> ApplyResult {
        match root.find_by_id(id) {
            Some(profile) => self.apply(profile, launch_missing, forced),
            None => ApplyResult::not_found(&format!("profile not found: {id}")),
        }
    }

    /// Apply one profile. `forced` pins every window to a user-chosen
    /// monitor; Deny verdicts are downgraded there (see the arranger).
    pub fn apply(
        &self,
        profile: &Profile,
        launch_missing: bool,
        forced: Option<&Monitor>,
    ) -> ApplyResult {
        let total = profile.windows.len();

        let candidates = match self.sys.enumerate(false) {
            Ok(c) => c,
            Err(err) => {
                warn!(error = %err, "window enumeration failed");
                return ApplyResult {
                    total,
                    failures: vec![format!("window enumeration failed: {err}")],
                    ..Default::default()
                };
            }
        };

        let mut result = ApplyResult {
            total,
            ..Default::default()
        };

        for entry in &profile.windows {
            let label = entry_label(entry);

            let matched = matcher::find_best(entry, &candidates, false);
            if matched.is_some_and(|m| m.ambiguous) {
                result
                    .warnings
                    .push(format!("{label}: ambiguous match, using best candidate"));
            }

            let mut handle = matched.map(|m| m.handle);
            if launch_missing && !handle.is_some_and(|h| self.sys.is_valid(h)) {
                handle = self.launch_and_wait(entry, &candidates);
            }

            let Some(handle) = handle.filter(|h| self.sys.is_valid(*h)) else {
                result.failures.push(format!("{label}: not found"));
                continue;
            };

            match arranger::arrange(self.sys, handle, entry, forced, self.settings) {
                Ok(outcome) if outcome.applied => {
                    result.applied += 1;
                    if let Some(transform) = outcome.transform {
                        for reason in transform.reasons {
                            result.warnings.push(format!("{label}: {}", reason.message));
                        }
                    }
                }
                Ok(outcome) => {
                    let detail = outcome
                        .transform
                        .filter(|t| t.level == TransformLevel::Deny)
                        .map(|t| {
                            t.reasons
                                .into_iter()
                                .map(|r| r.message)
                                .collect::<Vec<_>>()
                                .join("; ")
                        })
                        .unwrap_or_else(|| "window disappeared before placement".to_string());
                    result.failures.push(format!("{label}: {detail}"));
                }
                Err(err) => {
                    result.failures.push(format!("{label}: {err}"));
                }
            }
        }

        if let Some(hook) = self.schedule_rebuild {
            hook();
        }

        info!("{}", result.summary(&profile.name));
        result
    }

    /// Start the saved program and wait for its window, polling enumeration
    /// until the ceiling. Timeout degrades to one fresh re-match instead of
    /// failing hard.
    fn launch_and_wait(
        &self,
        entry: &SavedWindow,
        existing: &[WindowCandidate],
    ) -> Option<WindowId> {
        let exe = &entry.rule.exe;
        let before: HashSet<WindowId> = existing
            .iter()
            .filter(|c| c.exe.eq_ignore_ascii_case(exe))
            .map(|c| c.handle)
            .collect();

        let start_path = if !entry.path.is_empty() && Path::new(&entry.path).exists() {
            entry.path.as_str()
        } else {
            exe.as_str()
        };

        let url_arg = launchable_url(&entry.rule.url);
        if !entry.rule.url.is_empty() && url_arg.is_none() {
            warn!(url = %entry.rule.url, "skipping URL argument with unsupported scheme");
        }

        if let Err(err) = self.sys.launch(start_path, url_arg) {
            warn!(exe = %exe, error = %err, "launch failed");
            return None;
        }

        let deadline = Instant::now() + WAIT_CEILING;
        while Instant::now() < deadline {
            thread::sleep(POLL_INTERVAL);
            let Ok(windows) = self.sys.enumerate(false) else {
                continue;
            };
            if let Some(w) = windows
                .iter()
                .find(|w| w.exe.eq_ignore_ascii_case(exe) && !before.contains(&w.handle))
            {
                return Some(w.handle);
            }
        }

        // Ceiling reached; the window may have been adopted by an existing
        // process. Best effort: match against a fresh snapshot.
        let candidates = self.sys.enumerate(false).ok()?;
        matcher::find_best(entry, &candidates, false).map(|m| m.handle)
    }
}

fn entry_label(entry: &SavedWindow) -> String {
    format!("{} | {}", entry.rule.exe, entry.rule.title)
}

/// Only pass well-known schemes to a program being launched.
fn launchable_url(url: &str) -> Option<&str> {
    if url.is_empty() {
        return None;
    }
    let lower = url.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("file:"))
        .then_some(url)
}
