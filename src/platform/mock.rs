//! Recording fake of the OS capability surface for tests.

use std::collections::BTreeMap;
use std::sync::mpsc::Sender;
use std::sync::Mutex;

use anyhow::Result;

use super::{HookEvent, WindowId, WindowSystem};
use crate::config::profile::WindowState;
use crate::geometry::Rect;
use crate::matcher::WindowCandidate;
use crate::monitor::Monitor;

/// One fake window with everything enumeration would report.
#[derive(Debug, Clone)]
pub struct MockWindow {
    pub exe: String,
    pub class: String,
    pub title: String,
    pub path: String,
    pub url: String,
    pub command_line: String,
    pub state: WindowState,
    pub rect: Rect,
    pub valid: bool,
}

impl MockWindow {
    pub fn new(exe: &str, class: &str, title: &str) -> Self {
        Self {
            exe: exe.to_string(),
            class: class.to_string(),
            title: title.to_string(),
            path: String::new(),
            url: String::new(),
            command_line: String::new(),
            state: WindowState::Normal,
            rect: Rect::new(0, 0, 800, 600),
            valid: true,
        }
    }
}

/// Every placement command issued through the surface, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Restore(WindowId),
    Minimize(WindowId),
    Maximize(WindowId),
    SetPosition(WindowId, Rect),
    ReorderBehind(WindowId, WindowId),
    Launch(String, Option<String>),
}

#[derive(Default)]
struct Inner {
    windows: BTreeMap<WindowId, MockWindow>,
    monitors: Vec<Monitor>,
    calls: Vec<Call>,
    // Windows that appear once launch() has been called
    pending_launch: Vec<(WindowId, MockWindow)>,
    fail_set_position: bool,
}

/// Fake [`WindowSystem`] with scripted windows/monitors and call recording.
#[derive(Default)]
pub struct MockSystem {
    inner: Mutex<Inner>,
}

impl MockSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_monitors(monitors: Vec<Monitor>) -> Self {
        let sys = Self::new();
        sys.inner.lock().unwrap().monitors = monitors;
        sys
    }

    pub fn add_window(&self, handle: WindowId, window: MockWindow) {
        self.inner.lock().unwrap().windows.insert(handle, window);
    }

    pub fn set_state(&self, handle: WindowId, state: WindowState) {
        if let Some(w) = self.inner.lock().unwrap().windows.get_mut(&handle) {
            w.state = state;
        }
    }

    pub fn invalidate(&self, handle: WindowId) {
        if let Some(w) = self.inner.lock().unwrap().windows.get_mut(&handle) {
            w.valid = false;
        }
    }

    /// Make a window appear as soon as launch() is called.
    pub fn spawn_on_launch(&self, handle: WindowId, window: MockWindow) {
        self.inner
            .lock()
            .unwrap()
            .pending_launch
            .push((handle, window));
    }

    pub fn fail_set_position(&self) {
        self.inner.lock().unwrap().fail_set_position = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    pub fn rect_of(&self, handle: WindowId) -> Option<Rect> {
        self.inner
            .lock()
            .unwrap()
            .windows
            .get(&handle)
            .map(|w| w.rect)
    }
}

impl WindowSystem for MockSystem {
    fn enumerate(&self, lightweight: bool) -> Result<Vec<WindowCandidate>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .windows
            .iter()
            .filter(|(_, w)| w.valid)
            .map(|(handle, w)| WindowCandidate {
                handle: *handle,
                exe: w.exe.clone(),
                class: w.class.clone(),
                title: w.title.clone(),
                path: w.path.clone(),
                url: if lightweight { String::new() } else { w.url.clone() },
                command_line: if lightweight {
                    String::new()
                } else {
                    w.command_line.clone()
                },
            })
            .collect())
    }

    fn monitors(&self) -> Result<Vec<Monitor>> {
        Ok(self.inner.lock().unwrap().monitors.clone())
    }

    fn is_valid(&self, handle: WindowId) -> bool {
        self.inner
            .lock()
            .unwrap()
            .windows
            .get(&handle)
            .is_some_and(|w| w.valid)
    }

    fn window_state(&self, handle: WindowId) -> WindowState {
        self.inner
            .lock()
            .unwrap()
            .windows
            .get(&handle)
            .map(|w| w.state)
            .unwrap_or_default()
    }

    fn window_rect(&self, handle: WindowId) -> Result<Rect> {
        self.inner
            .lock()
            .unwrap()
            .windows
            .get(&handle)
            .map(|w| w.rect)
            .ok_or_else(|| anyhow::anyhow!("unknown window {handle}"))
    }

    fn restore(&self, handle: WindowId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Restore(handle));
        if let Some(w) = inner.windows.get_mut(&handle) {
            w.state = WindowState::Normal;
        }
        Ok(())
    }

    fn minimize(&self, handle: WindowId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Minimize(handle));
        if let Some(w) = inner.windows.get_mut(&handle) {
            w.state = WindowState::Minimized;
        }
        Ok(())
    }

    fn maximize(&self, handle: WindowId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Maximize(handle));
        if let Some(w) = inner.windows.get_mut(&handle) {
            w.state = WindowState::Maximized;
        }
        Ok(())
    }

    fn set_position(&self, handle: WindowId, rect: Rect) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_set_position {
            anyhow::bail!("SetWindowPos failed");
        }
        inner.calls.push(Call::SetPosition(handle, rect));
        if let Some(w) = inner.windows.get_mut(&handle) {
            w.rect = rect;
        }
        Ok(())
    }

    fn reorder_behind(&self, handle: WindowId, reference: WindowId) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .push(Call::ReorderBehind(handle, reference));
        Ok(())
    }

    fn subscribe(&mut self, _tx: Sender<HookEvent>) -> Result<()> {
        Ok(())
    }

    fn unsubscribe(&mut self) {}

    fn launch(&self, path: &str, url_arg: Option<&str>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .calls
            .push(Call::Launch(path.to_string(), url_arg.map(str::to_string)));
        let pending = std::mem::take(&mut inner.pending_launch);
        for (handle, window) in pending {
            inner.windows.insert(handle, window);
        }
        Ok(())
    }
}
