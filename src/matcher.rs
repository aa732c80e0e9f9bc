//! Window matching: scoring live candidates against a saved descriptor.
//!
//! Matching is two-phase. Phase 1 is a hard filter on executable name and
//! window class; phase 2 scores the survivors with additive, order-independent
//! signals (path, title, browser profile identity, URL). The weights live in
//! [`crate::constants::matching`].

use tracing::debug;

use crate::browser;
use crate::config::profile::SavedWindow;
use crate::constants::matching::*;
use crate::normalize::{class_matches, normalize_path, normalize_url, url_host};
use crate::platform::WindowId;

/// A running window under consideration. Rebuilt on every enumeration and
/// never owned by any component; empty strings mean "not retrieved"
/// (lightweight enumeration skips url and command line).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowCandidate {
    pub handle: WindowId,
    pub exe: String,
    pub class: String,
    pub title: String,
    pub path: String,
    pub url: String,
    pub command_line: String,
}

/// Outcome of matching one descriptor: the chosen handle, its score, and
/// whether the runner-up was too close to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    pub handle: WindowId,
    pub score: i32,
    pub ambiguous: bool,
}

/// Find the best candidate for a saved window.
///
/// Returns `None` when nothing passes the executable/class filter; that is
/// "window not currently open", not an error. With `for_sync` the matcher
/// refuses to guess: an ambiguous result becomes `None`, because sync
/// propagation across look-alike windows must never pick the wrong one.
pub fn find_best(
    saved: &SavedWindow,
    candidates: &[WindowCandidate],
    for_sync: bool,
) -> Option<MatchResult> {
    if saved.rule.exe.is_empty() {
        return None;
    }

    let exe_lower = saved.rule.exe.to_lowercase();
    let want_url_key = if !saved.rule.url_key.is_empty() {
        saved.rule.url_key.clone()
    } else {
        normalize_url(&saved.rule.url)
    };
    let want_host = url_host(&want_url_key);

    // Phase 1: executable and class are mandatory.
    let filtered: Vec<&WindowCandidate> = candidates
        .iter()
        .filter(|c| c.exe.eq_ignore_ascii_case(&saved.rule.exe))
        .filter(|c| class_matches(&c.class, &saved.rule.class))
        .collect();

    if filtered.is_empty() {
        return None;
    }

    // A unique structural match is treated as certain; skip scoring. Sync
    // matching still scores it so the ambiguity rule below gets a say.
    if filtered.len() == 1 && !for_sync {
        return Some(MatchResult {
            handle: filtered[0].handle,
            score: SINGLE_MATCH_SCORE,
            ambiguous: false,
        });
    }

    // Phase 2: additive scoring.
    let mut scored: Vec<(&WindowCandidate, i32)> = filtered
        .iter()
        .map(|&c| (c, score_candidate(saved, c, &exe_lower, &want_url_key, &want_host)))
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    let (best, best_score) = scored[0];

    let ambiguous = scored.len() > 1 && {
        let second_score = scored[1].1;
        best_score - second_score <= AMBIGUITY_GAP && best_score < AMBIGUITY_MIN_SCORE
    };

    if for_sync && ambiguous {
        debug!(exe = %saved.rule.exe, score = best_score, "ambiguous match excluded from sync");
        return None;
    }

    Some(MatchResult {
        handle: best.handle,
        score: best_score,
        ambiguous,
    })
}

fn score_candidate(
    saved: &SavedWindow,
    candidate: &WindowCandidate,
    exe_lower: &str,
    want_url_key: &str,
    want_host: &str,
) -> i32 {
    let mut score = 0;

    // Path match (strong)
    if !saved.path.is_empty()
        && !candidate.path.is_empty()
        && normalize_path(&candidate.path).eq_ignore_ascii_case(&normalize_path(&saved.path))
    {
        score += SCORE_PATH;
    }

    // Title: exact wins over substring, never both
    if !saved.rule.title.is_empty() {
        if candidate.title == saved.rule.title {
            score += SCORE_TITLE_EXACT;
        } else if candidate.title.contains(&saved.rule.title) {
            score += SCORE_TITLE_PARTIAL;
        }
    }

    // Browser profile identity from the candidate's launch command line
    if let Some(want) = &saved.rule.browser {
        if browser::is_browser(exe_lower) {
            if let Some(have) = browser::extract_identity(exe_lower, &candidate.command_line) {
                score += browser_identity_score(want, &have);
            }
        }
    }

    // URL match (only when both sides actually have one)
    if !want_url_key.is_empty() && !candidate.url.is_empty() {
        let have_key = normalize_url(&candidate.url);
        if !have_key.is_empty() {
            if have_key == want_url_key {
                score += SCORE_URL_EXACT;
            } else if !want_host.is_empty() && url_host(&have_key) == want_host {
                score += SCORE_URL_HOST;
            }
        }
    }

    score
}

fn browser_identity_score(
    want: &browser::BrowserIdentity,
    have: &browser::BrowserIdentity,
) -> i32 {
    let mut score = 0;

    // Chromium: user-data-dir is the strong signal, profile-directory the label
    if let (Some(w), Some(h)) = (&want.user_data_dir, &have.user_data_dir) {
        if w.eq_ignore_ascii_case(h) {
            score += SCORE_BROWSER_STRONG;
        }
    }
    if let (Some(w), Some(h)) = (&want.profile_directory, &have.profile_directory) {
        if w == h {
            score += SCORE_BROWSER_NAME;
        }
    }

    // Firefox: -profile directory is strong, -P name is the label
    if let (Some(w), Some(h)) = (&want.profile_dir, &have.profile_dir) {
        if w.eq_ignore_ascii_case(h) {
            score += SCORE_BROWSER_STRONG;
        }
    }
    if let (Some(w), Some(h)) = (&want.profile_name, &have.profile_name) {
        if w == h {
            score += SCORE_BROWSER_NAME;
        }
    }

    score
}
