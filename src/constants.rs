//! Application-wide constants
//!
//! Every tunable threshold and timing lives here. The matching weights and
//! timing values were carried over from long-running field use; they have no
//! derivation beyond "worked well in practice" and are kept in one place so
//! they can be recalibrated without hunting through the codebase.

use std::time::Duration;

/// Window-matching score weights and ambiguity thresholds
pub mod matching {
    /// Saved path equals candidate path after normalization
    pub const SCORE_PATH: i32 = 60;

    /// Candidate title equals the saved title exactly
    pub const SCORE_TITLE_EXACT: i32 = 30;

    /// Candidate title contains the saved title as a substring
    pub const SCORE_TITLE_PARTIAL: i32 = 10;

    /// Strong browser identity: same user-data / profile directory
    pub const SCORE_BROWSER_STRONG: i32 = 70;

    /// Weaker browser identity: same profile name/directory label
    pub const SCORE_BROWSER_NAME: i32 = 50;

    /// Normalized candidate URL equals the saved URL key
    pub const SCORE_URL_EXACT: i32 = 60;

    /// URL hosts match but the full URLs differ
    pub const SCORE_URL_HOST: i32 = 20;

    /// Score assigned when exactly one candidate survives the exe/class filter
    pub const SINGLE_MATCH_SCORE: i32 = 100;

    /// Top-two score gap at or below this marks the result ambiguous...
    pub const AMBIGUITY_GAP: i32 = 10;

    /// ...but only when the top score is below this floor
    pub const AMBIGUITY_MIN_SCORE: i32 = 50;
}

/// Snap detection tolerances (work-area units, i.e. pixels)
pub mod snap {
    /// Allowed distance between a window edge and the snap edge
    pub const POSITION_TOLERANCE: i32 = 25;

    /// Allowed deviation from the exact half/quadrant size
    pub const SIZE_TOLERANCE: i32 = 35;
}

/// Placement clamping and apply timing
pub mod placement {
    use super::Duration;

    /// Smallest width/height a restored window may end up with
    pub const MIN_VISIBLE_SIZE: i32 = 100;

    /// Extra slack beyond the work area for invisible drop-shadow borders
    pub const FRAME_MARGIN: i32 = 10;

    /// Pause after restoring a window before repositioning it
    pub const RESTORE_SETTLE: Duration = Duration::from_millis(30);
}

/// Synchronization engine timing
pub mod sync {
    use super::Duration;

    /// Duplicate events for the same handle+kind inside this window are dropped
    pub const EVENT_THROTTLE: Duration = Duration::from_millis(30);

    /// Debounce delay for scheduled group rebuilds
    pub const REBUILD_DEBOUNCE: Duration = Duration::from_millis(100);

    /// An event for an unknown handle triggers a rebuild if the last one is older than this
    pub const OPPORTUNISTIC_REBUILD_AFTER: Duration = Duration::from_secs(2);

    /// Per-profile suppression window for repeated foreground propagation
    pub const FOREGROUND_DEBOUNCE: Duration = Duration::from_millis(250);

    /// Pause between restore and maximize when mirroring a maximize.
    /// Some windows ignore a maximize issued while still minimized.
    pub const RESTORE_PAUSE: Duration = Duration::from_millis(20);
}

/// Launch-missing-program polling
pub mod launch {
    use super::Duration;

    /// Interval between enumeration polls while waiting for a new window
    pub const POLL_INTERVAL: Duration = Duration::from_millis(300);

    /// Give up waiting for a launched program's window after this long
    pub const WAIT_CEILING: Duration = Duration::from_secs(12);
}

/// Configuration file locations
pub mod config {
    /// Directory under the platform config dir
    pub const APP_DIR: &str = "winkeep";

    /// Profiles + settings file name
    pub const PROFILES_FILE: &str = "profiles.json";
}
