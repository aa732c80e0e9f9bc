//! The OS capability surface.
//!
//! Everything the engine needs from the operating system (enumerating
//! windows, placing them, watching their state) sits behind [`WindowSystem`].
//! The engine never owns a window: handles are borrowed identifiers that are
//! only meaningful while the OS considers the window alive, so liveness is
//! re-checked before every use.

use std::sync::mpsc::Sender;

use anyhow::{bail, Result};

use crate::config::profile::WindowState;
use crate::geometry::Rect;
use crate::matcher::WindowCandidate;
use crate::monitor::Monitor;

/// Opaque window handle in a single flat namespace.
pub type WindowId = u64;

/// Categories of window-state events delivered by the OS hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowEventKind {
    MinimizeStart,
    MinimizeEnd,
    /// Generic object-state change; the new state must be queried.
    StateChange,
    Foreground,
}

/// One event from the OS hook: what happened, to which window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookEvent {
    pub kind: WindowEventKind,
    pub window: WindowId,
}

/// Capability surface over the OS window layer.
///
/// Placement commands are best-effort fire-and-forget; an `Err` means the
/// call itself failed, not that the window refused. Implementations deliver
/// hook events on their own thread; subscribers must drain the channel
/// quickly and never panic the delivery context.
pub trait WindowSystem {
    /// Snapshot all visible top-level windows. Lightweight mode skips the
    /// expensive per-window metadata (launch command line, URL); the sync
    /// rebuild path uses it exclusively.
    fn enumerate(&self, lightweight: bool) -> Result<Vec<WindowCandidate>>;

    /// Snapshot the attached monitors. Index 1 is the primary.
    fn monitors(&self) -> Result<Vec<Monitor>>;

    fn is_valid(&self, handle: WindowId) -> bool;

    fn window_state(&self, handle: WindowId) -> WindowState;

    /// Current outer rectangle of a window, for capture.
    fn window_rect(&self, handle: WindowId) -> Result<Rect>;

    fn is_minimized(&self, handle: WindowId) -> bool {
        self.window_state(handle) == WindowState::Minimized
    }

    fn restore(&self, handle: WindowId) -> Result<()>;

    fn minimize(&self, handle: WindowId) -> Result<()>;

    fn maximize(&self, handle: WindowId) -> Result<()>;

    fn set_position(&self, handle: WindowId, rect: Rect) -> Result<()>;

    /// Place `handle` directly behind `reference` in z-order without moving,
    /// resizing, or activating it.
    fn reorder_behind(&self, handle: WindowId, reference: WindowId) -> Result<()>;

    /// Install the event hook, delivering events into `tx`. Idempotent.
    fn subscribe(&mut self, tx: Sender<HookEvent>) -> Result<()>;

    /// Remove the event hook. Idempotent.
    fn unsubscribe(&mut self);

    /// Start a program, optionally passing a URL argument.
    fn launch(&self, path: &str, url_arg: Option<&str>) -> Result<()>;
}

/// The native capability surface for this build.
///
/// The engine only ever talks to [`WindowSystem`]; shells embed this crate
/// and plug in their platform backend. The standalone binary ships without
/// one, so live window commands fail here while profile inspection keeps
/// working.
pub fn native() -> Result<Box<dyn WindowSystem>> {
    bail!("this build has no native window-system backend; profile inspection works, live window commands do not")
}

#[cfg(test)]
pub mod mock;
