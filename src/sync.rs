//! Real-time state synchronization across the windows of a profile.
//!
//! The engine keeps one group of live handles per sync-enabled profile and
//! mirrors minimize/maximize/foreground transitions inside each group.
//! Groups go stale between rebuilds by design; a rebuild always replaces the
//! whole map, so a destroyed window never survives one.
//!
//! Everything runs on the engine loop: hook events and rebuild-due notices
//! arrive over one channel, which is the only serialization primitive:
//! no rebuild or propagation pass can overlap another.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::profile::{ProfilesRoot, WindowState};
use crate::constants::sync::{
    EVENT_THROTTLE, FOREGROUND_DEBOUNCE, OPPORTUNISTIC_REBUILD_AFTER, REBUILD_DEBOUNCE,
    RESTORE_PAUSE,
};
use crate::matcher;
use crate::platform::{HookEvent, WindowEventKind, WindowId, WindowSystem};

/// Everything the engine loop drains: hook events from the capability
/// surface, plus expiry notices from the rebuild scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMessage {
    Hook(HookEvent),
    RebuildDue,
}

enum SchedulerCommand {
    Schedule(Duration),
    Shutdown,
}

/// Channel-based debounce actor for group rebuilds.
///
/// Each `schedule` call supersedes the pending deadline (a true debounce,
/// not a throttle); when a deadline finally expires, one `RebuildDue` lands
/// in the engine's channel. The actual rebuild then runs on the engine loop,
/// never concurrently with propagation.
pub struct RebuildScheduler {
    tx: Sender<SchedulerCommand>,
    worker: Option<JoinHandle<()>>,
}

impl RebuildScheduler {
    pub fn new(out: Sender<SyncMessage>) -> Self {
        let (tx, rx) = mpsc::channel();
        let worker = thread::spawn(move || scheduler_loop(rx, out));
        Self {
            tx,
            worker: Some(worker),
        }
    }

    pub fn schedule(&self, delay: Duration) {
        let _ = self.tx.send(SchedulerCommand::Schedule(delay));
    }
}

impl Drop for RebuildScheduler {
    fn drop(&mut self) {
        let _ = self.tx.send(SchedulerCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn scheduler_loop(rx: Receiver<SchedulerCommand>, out: Sender<SyncMessage>) {
    loop {
        // Idle until someone wants a rebuild
        let mut delay = match rx.recv() {
            Ok(SchedulerCommand::Schedule(delay)) => delay,
            Ok(SchedulerCommand::Shutdown) | Err(_) => return,
        };

        // Armed: a newer request restarts the wait
        loop {
            match rx.recv_timeout(delay) {
                Ok(SchedulerCommand::Schedule(next)) => delay = next,
                Ok(SchedulerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {
                    if out.send(SyncMessage::RebuildDue).is_err() {
                        return;
                    }
                    break;
                }
            }
        }
    }
}

/// Sync-group owner and event reactor. All mutable state lives here, with a
/// construct / rebuild / drop lifecycle, nothing ambient.
pub struct SyncEngine {
    /// profile name → handles currently believed to belong together
    groups: HashMap<String, HashSet<WindowId>>,
    /// last known minimize/maximize state per handle; suppresses echoes of
    /// our own propagation
    last_state: HashMap<WindowId, WindowState>,
    /// per-profile (source handle, time) of the last foreground propagation
    last_foreground: HashMap<String, (WindowId, Instant)>,
    /// last (handle, kind, time) seen, for duplicate-event throttling
    last_event: Option<(WindowId, WindowEventKind, Instant)>,
    /// true while this engine is itself issuing OS calls
    propagating: bool,
    last_rebuild: Option<Instant>,
    scheduler: RebuildScheduler,
}

impl SyncEngine {
    /// `out` is the engine's own message channel; the debounce scheduler
    /// posts `RebuildDue` into it.
    pub fn new(out: Sender<SyncMessage>) -> Self {
        Self {
            groups: HashMap::new(),
            last_state: HashMap::new(),
            last_foreground: HashMap::new(),
            last_event: None,
            propagating: false,
            last_rebuild: None,
            scheduler: RebuildScheduler::new(out),
        }
    }

    /// Request a debounced rebuild. Rapid repeats collapse into one.
    pub fn schedule_rebuild(&self) {
        self.scheduler.schedule(REBUILD_DEBOUNCE);
    }

    /// Install or remove the OS hook to match current settings, clearing
    /// group state when sync goes off.
    pub fn update_hooks(
        &mut self,
        sys: &mut dyn WindowSystem,
        root: &ProfilesRoot,
        tx: &Sender<HookEvent>,
    ) -> Result<()> {
        if root.settings.sync_enabled && root.has_any_sync_profile() {
            sys.subscribe(tx.clone())?;
            self.schedule_rebuild();
        } else {
            sys.unsubscribe();
            self.groups.clear();
            self.last_state.clear();
        }
        Ok(())
    }

    pub fn handle_message(
        &mut self,
        sys: &dyn WindowSystem,
        root: &ProfilesRoot,
        message: SyncMessage,
    ) {
        match message {
            SyncMessage::RebuildDue => self.rebuild_groups(sys, root),
            SyncMessage::Hook(event) => self.on_hook_event(sys, root, event),
        }
    }

    /// Recompute every group from a fresh lightweight enumeration. The map
    /// is replaced wholesale; a group survives only if at least one
    /// descriptor matched, and an ambiguous descriptor matches nothing in
    /// sync mode.
    pub fn rebuild_groups(&mut self, sys: &dyn WindowSystem, root: &ProfilesRoot) {
        let candidates = match sys.enumerate(true) {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(error = %err, "lightweight enumeration failed, keeping stale groups");
                return;
            }
        };

        let mut groups: HashMap<String, HashSet<WindowId>> = HashMap::new();
        for profile in root.profiles.iter().filter(|p| p.sync) {
            let mut group = HashSet::new();
            for entry in &profile.windows {
                if let Some(matched) = matcher::find_best(entry, &candidates, true) {
                    if sys.is_valid(matched.handle) {
                        group.insert(matched.handle);
                    }
                }
            }
            if !group.is_empty() {
                groups.insert(profile.name.clone(), group);
            }
        }

        debug!(groups = groups.len(), "sync groups rebuilt");
        self.groups = groups;
        self.last_rebuild = Some(Instant::now());
    }

    fn on_hook_event(&mut self, sys: &dyn WindowSystem, root: &ProfilesRoot, event: HookEvent) {
        // Our own propagation calls echo back as events; drop them at the door
        if self.propagating {
            return;
        }
        if !root.settings.sync_enabled {
            return;
        }

        // Hooks fire in noisy bursts; coalesce duplicates
        let now = Instant::now();
        if let Some((window, kind, at)) = self.last_event {
            if window == event.window
                && kind == event.kind
                && now.duration_since(at) < EVENT_THROTTLE
            {
                return;
            }
        }
        self.last_event = Some((event.window, event.kind, now));

        match event.kind {
            WindowEventKind::Foreground => self.on_foreground_event(sys, root, event.window),
            WindowEventKind::MinimizeStart
            | WindowEventKind::MinimizeEnd
            | WindowEventKind::StateChange => self.on_state_event(sys, root, event.window),
        }
    }

    fn on_state_event(&mut self, sys: &dyn WindowSystem, root: &ProfilesRoot, window: WindowId) {
        if !sys.is_valid(window) {
            return;
        }

        let state = sys.window_state(window);
        if self.last_state.get(&window) == Some(&state) {
            return;
        }
        self.last_state.insert(window, state);

        let groups = self.groups_containing(sys, root, window);
        if groups.is_empty() {
            return;
        }

        self.propagating = true;
        for (name, group) in groups {
            self.propagate_state(sys, &name, &group, window, state);
        }
        self.propagating = false;
    }

    fn on_foreground_event(
        &mut self,
        sys: &dyn WindowSystem,
        root: &ProfilesRoot,
        window: WindowId,
    ) {
        if !sys.is_valid(window) || sys.is_minimized(window) {
            return;
        }

        let groups = self.groups_containing(sys, root, window);
        if groups.is_empty() {
            return;
        }

        self.propagating = true;
        for (name, group) in groups {
            self.propagate_foreground(sys, &name, &group, window);
        }
        self.propagating = false;
    }

    /// All groups holding this handle. An unknown handle triggers one
    /// opportunistic rebuild (if the last one is old enough) and a single
    /// retry; windows opened since the last rebuild would otherwise stay
    /// invisible to sync until the next scheduled one.
    fn groups_containing(
        &mut self,
        sys: &dyn WindowSystem,
        root: &ProfilesRoot,
        window: WindowId,
    ) -> Vec<(String, HashSet<WindowId>)> {
        let found = self.lookup(window);
        if !found.is_empty() {
            return found;
        }

        let stale = self
            .last_rebuild
            .is_none_or(|at| at.elapsed() > OPPORTUNISTIC_REBUILD_AFTER);
        if !stale {
            return found;
        }

        self.rebuild_groups(sys, root);
        self.lookup(window)
    }

    fn lookup(&self, window: WindowId) -> Vec<(String, HashSet<WindowId>)> {
        self.groups
            .iter()
            .filter(|(_, group)| group.contains(&window))
            .map(|(name, group)| (name.clone(), group.clone()))
            .collect()
    }

    fn propagate_state(
        &mut self,
        sys: &dyn WindowSystem,
        profile: &str,
        group: &HashSet<WindowId>,
        source: WindowId,
        state: WindowState,
    ) {
        let mut count = 0;
        for &target in group {
            if target == source || !sys.is_valid(target) {
                continue;
            }

            let result = match state {
                WindowState::Minimized => sys.minimize(target),
                // A direct maximize is ignored by some windows while they are
                // minimized; restore, give them a beat, then maximize.
                WindowState::Maximized => sys.restore(target).and_then(|_| {
                    thread::sleep(RESTORE_PAUSE);
                    sys.maximize(target)
                }),
                WindowState::Normal => sys.restore(target),
            };

            match result {
                Ok(()) => {
                    // Mark the target up to date so its echo event is a no-op
                    self.last_state.insert(target, state);
                    count += 1;
                }
                Err(err) => debug!(target, error = %err, "state propagation skipped a window"),
            }
        }

        if count > 0 {
            info!(profile, count, state = ?state, "propagated window state");
        }
    }

    /// Bring the rest of the group up right behind the newly focused window
    /// without activating anything ("keep nearby", not focus stealing).
    fn propagate_foreground(
        &mut self,
        sys: &dyn WindowSystem,
        profile: &str,
        group: &HashSet<WindowId>,
        source: WindowId,
    ) {
        // Windows trading focus rapidly would re-trigger this in a loop
        let now = Instant::now();
        if let Some((last_source, at)) = self.last_foreground.get(profile) {
            if *last_source == source && now.duration_since(*at) < FOREGROUND_DEBOUNCE {
                return;
            }
        }
        self.last_foreground
            .insert(profile.to_string(), (source, now));

        let mut count = 0;
        for &target in group {
            if target == source || !sys.is_valid(target) || sys.is_minimized(target) {
                continue;
            }
            match sys.reorder_behind(target, source) {
                Ok(()) => count += 1,
                Err(err) => debug!(target, error = %err, "foreground propagation skipped a window"),
            }
        }

        if count > 0 {
            info!(profile, count, "foreground sync");
        }
    }
}
