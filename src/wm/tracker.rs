//! Window tracking
//!
//! Decides which windows get the restore treatment and keeps their side-table
//! state current: maximize flags, pre-maximize size and the trusted restored
//! rectangle.

use std::time::Duration;
use tracing::debug;

use crate::compositor::{Compositor, Signal};
use crate::shared::{Geometry, MaximizeFlags, Protocol, Size, WindowId, WindowType};
use crate::wm::min_size::MinSizePhase;
use crate::wm::scheduler::{Priority, TaskHandle};
use crate::wm::signals::SubscriptionId;
use crate::wm::{Engine, Listener, Task};

/// External move/resize beyond this many pixels invalidates `last_restored`
pub const RESTORE_TOLERANCE: u32 = 15;

/// Smallest frame worth remembering as a window's natural size
pub const MIN_REMEMBERED_SIZE: u32 = 50;

/// Per-window state, removed when the window goes away
#[derive(Debug)]
pub struct WindowState {
    pub protocol: Protocol,
    pub tracking: Option<Tracking>,
    /// Frame after the last programmatic restore
    pub last_restored: Option<Geometry>,
    /// Size observed before the window was ever maximized
    pub original_size: Option<Size>,
    /// Geometry events are self-caused while set
    pub suppress_notifications: bool,
    pub suppress_clear: Option<TaskHandle>,
    pub min_size: MinSizePhase,
    pub tasks: Vec<TaskHandle>,
}

impl WindowState {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            tracking: None,
            last_restored: None,
            original_size: None,
            suppress_notifications: false,
            suppress_clear: None,
            min_size: MinSizePhase::Idle,
            tasks: Vec::new(),
        }
    }
}

/// Subscriptions and flags of a tracked window
#[derive(Debug)]
pub struct Tracking {
    pub was_maximized: MaximizeFlags,
    pub subscriptions: Vec<SubscriptionId>,
}

impl<C: Compositor> Engine<C> {
    /// Start observing a normal top-level window. No-op if already tracked.
    pub fn track(&mut self, window: WindowId) {
        if self.shut_down || self.is_tracked(window) {
            return;
        }
        if self.comp.window_type(window) != Some(WindowType::Normal) {
            return;
        }
        if self.ensure_state(window).is_none() {
            return;
        }
        debug!("Track: {}", self.describe(window));

        let flags = self.comp.maximize_flags(window);
        if flags.is_maximized() {
            self.apply_decoration(window, true);
        } else if let Some(frame) = self.comp.frame_rect(window) {
            if frame.at_least(MIN_REMEMBERED_SIZE) {
                if let Some(state) = self.windows.get_mut(&window) {
                    state.original_size = Some(frame.size());
                }
            }
        }

        let subscriptions = vec![
            self.connect(window, Signal::MaximizedHorizontally, Listener::MaxToggle),
            self.connect(window, Signal::MaximizedVertically, Listener::MaxToggle),
            self.connect(window, Signal::PositionChanged, Listener::Geometry),
            self.connect(window, Signal::SizeChanged, Listener::Geometry),
        ];
        if let Some(state) = self.windows.get_mut(&window) {
            state.tracking = Some(Tracking {
                was_maximized: flags,
                subscriptions,
            });
        }
    }

    /// Drop every subscription, task and field attached to `window`. Idempotent.
    pub fn untrack(&mut self, window: WindowId) {
        if self.sessions.contains_key(&window) {
            self.abandon_session(window);
        }
        let Some(state) = self.windows.remove(&window) else {
            return;
        };

        for handle in state.tasks.iter().chain(state.suppress_clear.iter()) {
            self.scheduler.cancel(*handle);
        }
        if let Some(tracking) = &state.tracking {
            for id in &tracking.subscriptions {
                self.signals.disconnect(*id);
            }
        }
        if let MinSizePhase::Watching {
            subscription,
            tasks,
            ..
        } = &state.min_size
        {
            self.signals.disconnect(*subscription);
            for handle in tasks {
                self.scheduler.cancel(*handle);
            }
        }
        if self.panel.title_window == Some(window) {
            self.drop_title_subscription();
        }
        let leftover = self.signals.disconnect_window(window);
        if leftover > 0 {
            debug!("Released {} stray subscriptions on {:?}", leftover, window);
        }
        debug!("Untracked {:?}", window);
    }

    pub fn is_tracked(&self, window: WindowId) -> bool {
        self.windows
            .get(&window)
            .is_some_and(|state| state.tracking.is_some())
    }

    pub fn last_restored(&self, window: WindowId) -> Option<Geometry> {
        self.windows.get(&window).and_then(|state| state.last_restored)
    }

    pub fn original_size(&self, window: WindowId) -> Option<Size> {
        self.windows.get(&window).and_then(|state| state.original_size)
    }

    pub fn is_suppressed(&self, window: WindowId) -> bool {
        self.windows
            .get(&window)
            .is_some_and(|state| state.suppress_notifications)
    }

    /// Position/size change: a large external delta means the user took over
    pub(super) fn on_geometry_changed(&mut self, window: WindowId, signal: Signal) {
        let Some(state) = self.windows.get(&window) else {
            return;
        };
        if state.suppress_notifications || self.sessions.contains_key(&window) {
            return;
        }
        let Some(last) = state.last_restored else {
            return;
        };
        if !self.comp.maximize_flags(window).is_empty() {
            return;
        }
        let Some(frame) = self.comp.frame_rect(window) else {
            return;
        };

        let delta = match signal {
            Signal::PositionChanged => frame.position_delta(&last),
            _ => frame.size_delta(&last),
        };
        if delta > RESTORE_TOLERANCE {
            debug!(
                "Manual {} → reset {}",
                if signal == Signal::PositionChanged { "move" } else { "resize" },
                self.describe(window)
            );
            if let Some(state) = self.windows.get_mut(&window) {
                state.last_restored = None;
            }
        }
    }

    pub(super) fn on_max_toggle(&mut self, window: WindowId) {
        let Some(was) = self
            .windows
            .get(&window)
            .and_then(|state| state.tracking.as_ref())
            .map(|tracking| tracking.was_maximized)
        else {
            return;
        };
        let flags = self.comp.maximize_flags(window);
        if flags == was {
            return;
        }

        let was_max = was.is_maximized();
        let is_max = flags.is_maximized();

        if !was_max && is_max {
            let frame = self.comp.frame_rect(window);
            let monitor = self.comp.monitor_geometry(window);
            if let (Some(frame), Some(monitor)) = (frame, monitor) {
                if frame.at_least(MIN_REMEMBERED_SIZE) && frame.width < monitor.width {
                    debug!("Pre-max: {}×{} {}", frame.width, frame.height, self.describe(window));
                    if let Some(state) = self.windows.get_mut(&window) {
                        state.original_size = Some(frame.size());
                    }
                }
            }
            self.apply_decoration(window, true);
        }

        if was_max && !is_max {
            debug!("Sig unmax: {}", self.describe(window));
            self.apply_decoration(window, false);
            if !self.sessions.contains_key(&window) {
                self.schedule_window_task(
                    window,
                    Duration::ZERO,
                    Priority::High,
                    Task::RestoreCheck(window),
                );
            }
        }

        if let Some(tracking) = self
            .windows
            .get_mut(&window)
            .and_then(|state| state.tracking.as_mut())
        {
            tracking.was_maximized = flags;
        }
        self.refresh_panel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::CompositorEvent;
    use crate::testing::{FakeWindow, Harness, ms};

    fn restored_harness() -> (Harness, WindowId) {
        let mut h = Harness::new();
        let w = h.add(FakeWindow::native().frame(Geometry::new(192, 108, 1536, 864)));
        h.engine.start(ms(0));
        h.set_last_restored(w, Geometry::new(192, 108, 1536, 864));
        (h, w)
    }

    #[test]
    fn test_track_records_state_and_subscribes() {
        let mut h = Harness::new();
        let w = h.add(FakeWindow::native().frame(Geometry::new(10, 10, 640, 480)));
        h.engine.start(ms(0));

        assert!(h.engine.is_tracked(w));
        assert_eq!(h.engine.original_size(w), Some(Size::new(640, 480)));
        assert_eq!(h.engine.signals.count_for(w), 4);

        h.engine.track(w);
        assert_eq!(h.engine.signals.count_for(w), 4);
    }

    #[test]
    fn test_track_skips_non_normal_and_tiny() {
        let mut h = Harness::new();
        let dialog = h.add(FakeWindow::native().kind(WindowType::Dialog));
        let tiny = h.add(FakeWindow::native().frame(Geometry::new(0, 0, 40, 40)));
        h.engine.start(ms(0));

        assert!(!h.engine.is_tracked(dialog));
        assert!(h.engine.is_tracked(tiny));
        assert_eq!(h.engine.original_size(tiny), None);
    }

    #[test]
    fn test_track_maximized_window_hides_decoration() {
        let mut h = Harness::new();
        let w = h.add(FakeWindow::legacy(0x3a00004).maximized());
        h.engine.start(ms(0));

        assert_eq!(h.decorations(), vec![(w, true)]);
        assert_eq!(h.engine.original_size(w), None);
    }

    #[test]
    fn test_move_within_tolerance_keeps_cache() {
        let (mut h, w) = restored_harness();
        h.comp().set_frame(w, Geometry::new(207, 123, 1536, 864));
        h.event(ms(500), CompositorEvent::Window(w, Signal::PositionChanged));
        assert!(h.engine.last_restored(w).is_some());
    }

    #[test]
    fn test_move_beyond_tolerance_clears_cache() {
        let (mut h, w) = restored_harness();
        h.comp().set_frame(w, Geometry::new(208, 108, 1536, 864));
        h.event(ms(500), CompositorEvent::Window(w, Signal::PositionChanged));
        assert_eq!(h.engine.last_restored(w), None);
    }

    #[test]
    fn test_resize_tolerance_boundary() {
        let (mut h, w) = restored_harness();
        h.comp().set_frame(w, Geometry::new(192, 108, 1536, 849));
        h.event(ms(500), CompositorEvent::Window(w, Signal::SizeChanged));
        assert!(h.engine.last_restored(w).is_some());

        h.comp().set_frame(w, Geometry::new(192, 108, 1552, 864));
        h.event(ms(600), CompositorEvent::Window(w, Signal::SizeChanged));
        assert_eq!(h.engine.last_restored(w), None);
    }

    #[test]
    fn test_suppressed_events_keep_cache() {
        let (mut h, w) = restored_harness();
        h.engine.suppress(w);
        h.comp().set_frame(w, Geometry::new(0, 0, 800, 600));
        h.event(ms(500), CompositorEvent::Window(w, Signal::SizeChanged));
        h.event(ms(500), CompositorEvent::Window(w, Signal::PositionChanged));
        assert!(h.engine.last_restored(w).is_some());
    }

    #[test]
    fn test_maximize_records_original_size() {
        let mut h = Harness::new();
        let w = h.add(FakeWindow::native().frame(Geometry::new(50, 50, 900, 700)));
        h.engine.start(ms(0));

        h.comp().set_flags(w, MaximizeFlags::BOTH);
        h.event(ms(100), CompositorEvent::Window(w, Signal::MaximizedHorizontally));
        assert_eq!(h.engine.original_size(w), Some(Size::new(900, 700)));
        assert_eq!(h.decorations(), vec![(w, true)]);

        // Second notification for the other axis carries no change
        h.event(ms(100), CompositorEvent::Window(w, Signal::MaximizedVertically));
        assert_eq!(h.decorations().len(), 1);
    }

    #[test]
    fn test_untrack_is_idempotent_and_complete() {
        let mut h = Harness::new();
        let w = h.add(FakeWindow::native());
        h.engine.start(ms(0));
        assert!(h.engine.subscription_count() > 0);

        h.engine.untrack(w);
        h.engine.untrack(w);
        assert!(!h.engine.is_tracked(w));
        assert_eq!(h.engine.signals.count_for(w), 0);
        assert!(h.engine.windows.get(&w).is_none());
    }

    #[test]
    fn test_created_window_tracked_after_delay() {
        let mut h = Harness::new();
        h.engine.start(ms(0));
        let w = h.add(FakeWindow::native());
        h.event(ms(1000), CompositorEvent::WindowCreated(w));
        assert!(!h.engine.is_tracked(w));

        h.engine.advance_to(ms(1049));
        assert!(!h.engine.is_tracked(w));
        h.engine.advance_to(ms(1050));
        assert!(h.engine.is_tracked(w));
    }

    #[test]
    fn test_unmanaged_removes_state() {
        let mut h = Harness::new();
        let w = h.add(FakeWindow::native());
        h.engine.start(ms(0));

        h.comp().remove(w);
        h.event(ms(10), CompositorEvent::Window(w, Signal::Unmanaged));
        assert!(h.engine.windows.get(&w).is_none());
        assert_eq!(h.engine.subscription_count(), 0);
    }
}
