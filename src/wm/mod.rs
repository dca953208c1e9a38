//! Window Engine Module
//!
//! Tracks compositor windows, drives the restore animation and enforces the
//! minimum open size. Everything runs on one thread: compositor events and
//! due scheduler tasks are fed in by the host, in order.

pub mod decorations;
pub mod min_size;
pub mod panel;
pub mod restore;
pub mod scheduler;
pub mod signals;
pub mod tracker;

use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::compositor::{Compositor, CompositorEvent, Signal};
use crate::config::Settings;
use crate::shared::{Protocol, WindowId};
use crate::wm::decorations::{DecorationHook, DecorationTarget};
use crate::wm::panel::{PanelState, PanelUpdate};
use crate::wm::restore::{Session, SessionId, SessionStep};
use crate::wm::scheduler::{Priority, Scheduler, TaskHandle};
use crate::wm::signals::{SignalHub, SubscriptionId};
use crate::wm::tracker::WindowState;

pub use min_size::MinSizePhase;
pub use restore::target_rect;

/// Delay between window creation and tracking, so the window type settles
const TRACK_DELAY: Duration = Duration::from_millis(50);

/// Deferred work owned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Track(WindowId),
    ClearSuppression(WindowId),
    Refocus(WindowId),
    /// Externally-triggered un-maximize: animate if nothing else did
    RestoreCheck(WindowId),
    MinSizeProbe(WindowId),
    MinSizeStop(WindowId),
    Session {
        window: WindowId,
        session: SessionId,
        step: SessionStep,
    },
}

/// Handler bound to a signal subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Listener {
    MaxToggle,
    Geometry,
    MinSize,
    Title,
    SessionUnmanaged(SessionId),
    SessionResized(SessionId),
}

pub struct Engine<C: Compositor> {
    comp: C,
    settings: Settings,
    decorations: Box<dyn DecorationHook>,
    scheduler: Scheduler<Task>,
    signals: SignalHub<Listener>,
    /// Side table of per-window state, keyed by compositor handle
    windows: HashMap<WindowId, WindowState>,
    sessions: HashMap<WindowId, Session>,
    panel: PanelState,
    updates: Vec<PanelUpdate>,
    now: Duration,
    next_session: u64,
    started: bool,
    shut_down: bool,
}

impl<C: Compositor> Engine<C> {
    pub fn new(comp: C, settings: Settings, decorations: Box<dyn DecorationHook>) -> Self {
        Self {
            comp,
            settings,
            decorations,
            scheduler: Scheduler::new(),
            signals: SignalHub::new(),
            windows: HashMap::new(),
            sessions: HashMap::new(),
            panel: PanelState::default(),
            updates: Vec::new(),
            now: Duration::ZERO,
            next_session: 1,
            started: false,
            shut_down: false,
        }
    }

    /// Apply start-up side effects and track every live window
    pub fn start(&mut self, now: Duration) {
        if self.started || self.shut_down {
            return;
        }
        self.started = true;
        self.now = now;
        info!("Starting restore engine ({} live windows)", self.comp.windows().len());

        if let Err(e) = self.decorations.startup() {
            warn!("Decoration start-up failed: {}", e);
        }
        for window in self.comp.windows() {
            self.track(window);
        }
        self.refresh_panel();
    }

    /// Run due tasks, then dispatch `event`
    pub fn handle_event(&mut self, now: Duration, event: CompositorEvent) {
        self.advance_to(now);
        if self.shut_down {
            return;
        }
        match event {
            CompositorEvent::WindowCreated(window) => self.on_window_created(window),
            CompositorEvent::Window(window, signal) => self.dispatch_signal(window, signal),
            CompositorEvent::FocusChanged
            | CompositorEvent::WorkspaceChanged
            | CompositorEvent::OverviewHidden => self.refresh_panel(),
            CompositorEvent::OverviewShown => self.hide_panel(),
            CompositorEvent::OverlayTransitionDone(overlay) => self.on_overlay_done(overlay),
        }
    }

    /// Run every task due at or before `now`, each at its own deadline
    pub fn advance_to(&mut self, now: Duration) {
        while let Some((deadline, task)) = self.scheduler.pop_due(now) {
            self.now = deadline.max(self.now);
            self.run_task(task);
        }
        self.now = now.max(self.now);
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace settings; the next use of each value sees the change
    pub fn update_settings(&mut self, settings: Settings) {
        debug!("Settings updated: {:?}", settings);
        self.settings = settings;
    }

    pub fn compositor(&self) -> &C {
        &self.comp
    }

    pub fn compositor_mut(&mut self) -> &mut C {
        &mut self.comp
    }

    /// Drain panel notifications published since the last call
    pub fn take_panel_updates(&mut self) -> Vec<PanelUpdate> {
        std::mem::take(&mut self.updates)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.signals.len()
    }

    /// Cancel all tasks, abandon sessions and detach every window. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        let cancelled = self.scheduler.cancel_all();
        let windows: Vec<WindowId> = self.sessions.keys().copied().collect();
        for window in windows {
            self.abandon_session(window);
        }
        let tracked: Vec<WindowId> = self.windows.keys().copied().collect();
        for window in tracked {
            self.untrack(window);
        }
        self.drop_title_subscription();
        self.signals.clear();

        if let Err(e) = self.decorations.shutdown() {
            warn!("Decoration shutdown failed: {}", e);
        }
        self.publish_panel(PanelUpdate::hidden());
        info!("Restore engine stopped ({} pending tasks cancelled)", cancelled);
    }

    fn on_window_created(&mut self, window: WindowId) {
        if self.ensure_state(window).is_none() {
            return;
        }
        self.schedule_window_task(window, TRACK_DELAY, Priority::Default, Task::Track(window));
        self.enroll_min_size(window);
    }

    fn dispatch_signal(&mut self, window: WindowId, signal: Signal) {
        for (id, listener) in self.signals.listeners(window, signal) {
            if !self.signals.is_connected(id) {
                continue;
            }
            match listener {
                Listener::MaxToggle => self.on_max_toggle(window),
                Listener::Geometry => self.on_geometry_changed(window, signal),
                Listener::MinSize => self.enforce_min_size(window),
                Listener::Title => self.on_title_changed(window),
                Listener::SessionUnmanaged(session) => {
                    self.signals.disconnect(id);
                    self.finish_session(window, session);
                }
                Listener::SessionResized(session) => self.on_session_resized(window, session),
            }
        }

        if signal == Signal::Unmanaged {
            self.untrack(window);
            self.refresh_panel();
        }
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::Track(window) => self.track(window),
            Task::ClearSuppression(window) => {
                if let Some(state) = self.windows.get_mut(&window) {
                    state.suppress_notifications = false;
                    state.suppress_clear = None;
                }
            }
            Task::Refocus(window) => {
                if self.is_alive(window) && !self.comp.is_minimized(window) {
                    self.comp.activate(window);
                }
            }
            Task::RestoreCheck(window) => self.check_external_restore(window),
            Task::MinSizeProbe(window) => self.enforce_min_size(window),
            Task::MinSizeStop(window) => self.settle_min_size(window),
            Task::Session {
                window,
                session,
                step,
            } => self.run_session_step(window, session, step),
        }
    }

    /// Side-table entry for `window`, created on first observation
    fn ensure_state(&mut self, window: WindowId) -> Option<&mut WindowState> {
        if !self.windows.contains_key(&window) {
            let protocol = self.comp.protocol(window)?;
            self.windows.insert(window, WindowState::new(protocol));
        }
        self.windows.get_mut(&window)
    }

    fn protocol_of(&mut self, window: WindowId) -> Option<Protocol> {
        self.ensure_state(window).map(|state| state.protocol)
    }

    fn is_alive(&self, window: WindowId) -> bool {
        self.comp.window_type(window).is_some()
    }

    /// Window-scoped task, cancelled when the window is untracked
    fn schedule_window_task(
        &mut self,
        window: WindowId,
        delay: Duration,
        priority: Priority,
        task: Task,
    ) -> Option<TaskHandle> {
        let scheduler = &mut self.scheduler;
        let state = self.windows.get_mut(&window)?;
        state.tasks.retain(|handle| scheduler.is_pending(*handle));
        let handle = scheduler.schedule_with_priority(self.now, delay, priority, task);
        state.tasks.push(handle);
        Some(handle)
    }

    /// Mark geometry events on `window` as self-caused until cleared
    fn suppress(&mut self, window: WindowId) {
        if let Some(state) = self.windows.get_mut(&window) {
            state.suppress_notifications = true;
            if let Some(handle) = state.suppress_clear.take() {
                self.scheduler.cancel(handle);
            }
        }
    }

    /// Clear suppression after `delay`, superseding any earlier pending clear
    fn clear_suppression_after(&mut self, window: WindowId, delay: Duration) {
        let Some(state) = self.windows.get_mut(&window) else {
            return;
        };
        if let Some(handle) = state.suppress_clear.take() {
            self.scheduler.cancel(handle);
        }
        let handle = self
            .scheduler
            .schedule(self.now, delay, Task::ClearSuppression(window));
        state.suppress_clear = Some(handle);
    }

    fn connect(&mut self, window: WindowId, signal: Signal, listener: Listener) -> SubscriptionId {
        self.signals.connect(window, signal, listener)
    }

    fn apply_decoration(&mut self, window: WindowId, maximized: bool) {
        let Some(protocol) = self.windows.get(&window).map(|state| state.protocol) else {
            return;
        };
        let target = DecorationTarget {
            window,
            protocol,
            x11_window: self.comp.x11_window(window),
        };
        if let Err(e) = self.decorations.set_maximized(target, maximized) {
            warn!("Decoration update failed for {}: {}", self.describe(window), e);
        }
    }

    #[cfg(test)]
    pub(crate) fn set_last_restored(&mut self, window: WindowId, rect: crate::shared::Geometry) {
        if let Some(state) = self.ensure_state(window) {
            state.last_restored = Some(rect);
        }
    }

    /// `"title" (class, protocol)` for log lines
    fn describe(&self, window: WindowId) -> String {
        let title = self.comp.title(window).unwrap_or_default();
        let class = self.comp.wm_class(window).unwrap_or_default();
        let protocol = self
            .windows
            .get(&window)
            .map(|state| state.protocol)
            .or_else(|| self.comp.protocol(window))
            .map(Protocol::name)
            .unwrap_or("?");
        format!("\"{}\" ({}, {})", title, class, protocol)
    }
}
