//! In-memory compositor and engine harness for tests

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use crate::compositor::{Compositor, CompositorEvent};
use crate::config::Settings;
use crate::shared::{Geometry, MaximizeFlags, OverlayId, Protocol, WindowId, WindowType};
use crate::wm::Engine;
use crate::wm::decorations::{DecorationError, DecorationHook, DecorationTarget};
use crate::wm::restore::{SessionPhase, Trigger};

pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

pub const WORK_AREA: Geometry = Geometry {
    x: 0,
    y: 0,
    width: 1920,
    height: 1080,
};

/// Mutating requests the engine made, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetVisible(WindowId, bool),
    Unmaximize(WindowId),
    MoveResize(WindowId, Geometry),
    Activate(WindowId),
    Delete(WindowId),
    CreateOverlay(OverlayId, WindowId, Geometry),
    EaseOverlay(OverlayId, Geometry),
    DestroyOverlay(OverlayId),
}

#[derive(Debug, Clone)]
pub struct FakeWindow {
    kind: WindowType,
    protocol: Protocol,
    x11_window: Option<u32>,
    flags: MaximizeFlags,
    frame: Geometry,
    /// Frame the compositor falls back to on un-maximize
    unmaximized_frame: Geometry,
    has_surface: bool,
    visible: bool,
    can_maximize: bool,
    minimized: bool,
    skip_taskbar: bool,
    on_workspace: bool,
    title: String,
    wm_class: String,
    /// Geometry requests are recorded but not applied (slow client)
    defer_geometry: bool,
}

impl FakeWindow {
    pub fn native() -> Self {
        Self {
            kind: WindowType::Normal,
            protocol: Protocol::Native,
            x11_window: None,
            flags: MaximizeFlags::empty(),
            frame: Geometry::new(100, 100, 800, 600),
            unmaximized_frame: Geometry::new(100, 100, 800, 600),
            has_surface: true,
            visible: true,
            can_maximize: true,
            minimized: false,
            skip_taskbar: false,
            on_workspace: true,
            title: String::new(),
            wm_class: "app".to_string(),
            defer_geometry: false,
        }
    }

    pub fn legacy(xid: u32) -> Self {
        Self {
            protocol: Protocol::Legacy,
            x11_window: Some(xid),
            ..Self::native()
        }
    }

    pub fn maximized(mut self) -> Self {
        self.flags = MaximizeFlags::BOTH;
        self.frame = WORK_AREA;
        self
    }

    pub fn flags(mut self, flags: MaximizeFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn frame(mut self, frame: Geometry) -> Self {
        self.frame = frame;
        self.unmaximized_frame = frame;
        self
    }

    pub fn kind(mut self, kind: WindowType) -> Self {
        self.kind = kind;
        self
    }

    pub fn maximizable(mut self, can_maximize: bool) -> Self {
        self.can_maximize = can_maximize;
        self
    }

    pub fn minimized(mut self) -> Self {
        self.minimized = true;
        self
    }

    pub fn skip_taskbar(mut self) -> Self {
        self.skip_taskbar = true;
        self
    }

    pub fn off_workspace(mut self) -> Self {
        self.on_workspace = false;
        self
    }

    pub fn without_surface(mut self) -> Self {
        self.has_surface = false;
        self
    }

    pub fn defer_geometry(mut self) -> Self {
        self.defer_geometry = true;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn wm_class(mut self, class: &str) -> Self {
        self.wm_class = class.to_string();
        self
    }
}

#[derive(Debug, Default)]
pub struct FakeCompositor {
    windows: BTreeMap<WindowId, FakeWindow>,
    focus: Option<WindowId>,
    overview: bool,
    calls: Vec<Call>,
    overlays: HashSet<OverlayId>,
    next_window: u64,
    next_overlay: u64,
}

impl FakeCompositor {
    pub fn add(&mut self, window: FakeWindow) -> WindowId {
        self.next_window += 1;
        let id = WindowId(self.next_window);
        self.windows.insert(id, window);
        id
    }

    pub fn remove(&mut self, window: WindowId) {
        self.windows.remove(&window);
        if self.focus == Some(window) {
            self.focus = None;
        }
    }

    pub fn set_focus(&mut self, window: Option<WindowId>) {
        self.focus = window;
    }

    pub fn set_overview(&mut self, visible: bool) {
        self.overview = visible;
    }

    pub fn set_frame(&mut self, window: WindowId, frame: Geometry) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.frame = frame;
        }
    }

    pub fn set_flags(&mut self, window: WindowId, flags: MaximizeFlags) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.flags = flags;
        }
    }

    pub fn set_minimized(&mut self, window: WindowId, minimized: bool) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.minimized = minimized;
        }
    }

    pub fn set_title(&mut self, window: WindowId, title: &str) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.title = title.to_string();
        }
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn move_resizes(&self, window: WindowId) -> Vec<Geometry> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::MoveResize(id, rect) if *id == window => Some(*rect),
                _ => None,
            })
            .collect()
    }

    /// Most recent overlay ease request
    pub fn eased(&self) -> Option<(OverlayId, Geometry)> {
        self.calls.iter().rev().find_map(|call| match call {
            Call::EaseOverlay(overlay, rect) => Some((*overlay, *rect)),
            _ => None,
        })
    }

    pub fn live_overlays(&self) -> usize {
        self.overlays.len()
    }

    pub fn visible(&self, window: WindowId) -> Option<bool> {
        self.windows.get(&window).map(|w| w.visible)
    }
}

impl Compositor for FakeCompositor {
    fn windows(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    fn focus_window(&self) -> Option<WindowId> {
        self.focus
    }

    fn window_type(&self, window: WindowId) -> Option<WindowType> {
        self.windows.get(&window).map(|w| w.kind)
    }

    fn protocol(&self, window: WindowId) -> Option<Protocol> {
        self.windows.get(&window).map(|w| w.protocol)
    }

    fn x11_window(&self, window: WindowId) -> Option<u32> {
        self.windows.get(&window).and_then(|w| w.x11_window)
    }

    fn maximize_flags(&self, window: WindowId) -> MaximizeFlags {
        self.windows
            .get(&window)
            .map(|w| w.flags)
            .unwrap_or_default()
    }

    fn frame_rect(&self, window: WindowId) -> Option<Geometry> {
        self.windows.get(&window).map(|w| w.frame)
    }

    fn work_area(&self, window: WindowId) -> Option<Geometry> {
        self.windows.get(&window).map(|_| WORK_AREA)
    }

    fn monitor_geometry(&self, window: WindowId) -> Option<Geometry> {
        self.windows.get(&window).map(|_| WORK_AREA)
    }

    fn can_maximize(&self, window: WindowId) -> bool {
        self.windows.get(&window).is_some_and(|w| w.can_maximize)
    }

    fn is_minimized(&self, window: WindowId) -> bool {
        self.windows.get(&window).is_some_and(|w| w.minimized)
    }

    fn title(&self, window: WindowId) -> Option<String> {
        self.windows.get(&window).map(|w| w.title.clone())
    }

    fn wm_class(&self, window: WindowId) -> Option<String> {
        self.windows.get(&window).map(|w| w.wm_class.clone())
    }

    fn skip_taskbar(&self, window: WindowId) -> bool {
        self.windows.get(&window).is_some_and(|w| w.skip_taskbar)
    }

    fn on_active_workspace(&self, window: WindowId) -> bool {
        self.windows.get(&window).is_some_and(|w| w.on_workspace)
    }

    fn overview_visible(&self) -> bool {
        self.overview
    }

    fn surface_rect(&self, window: WindowId) -> Option<Geometry> {
        self.windows
            .get(&window)
            .filter(|w| w.has_surface)
            .map(|w| w.frame)
    }

    fn set_surface_visible(&mut self, window: WindowId, visible: bool) {
        self.calls.push(Call::SetVisible(window, visible));
        if let Some(w) = self.windows.get_mut(&window) {
            w.visible = visible;
        }
    }

    fn unmaximize(&mut self, window: WindowId) {
        self.calls.push(Call::Unmaximize(window));
        if let Some(w) = self.windows.get_mut(&window) {
            w.flags = MaximizeFlags::empty();
            if !w.defer_geometry {
                w.frame = w.unmaximized_frame;
            }
        }
    }

    fn move_resize_frame(&mut self, window: WindowId, rect: Geometry) {
        self.calls.push(Call::MoveResize(window, rect));
        if let Some(w) = self.windows.get_mut(&window) {
            if !w.defer_geometry {
                w.frame = rect;
            }
        }
    }

    fn activate(&mut self, window: WindowId) {
        self.calls.push(Call::Activate(window));
        if self.windows.contains_key(&window) {
            self.focus = Some(window);
        }
    }

    fn delete(&mut self, window: WindowId) {
        self.calls.push(Call::Delete(window));
    }

    fn create_overlay(&mut self, window: WindowId, rect: Geometry) -> Option<OverlayId> {
        self.windows.get(&window).filter(|w| w.has_surface)?;
        self.next_overlay += 1;
        let overlay = OverlayId(self.next_overlay);
        self.overlays.insert(overlay);
        self.calls.push(Call::CreateOverlay(overlay, window, rect));
        Some(overlay)
    }

    fn ease_overlay(&mut self, overlay: OverlayId, rect: Geometry, _duration: Duration) {
        self.calls.push(Call::EaseOverlay(overlay, rect));
    }

    fn destroy_overlay(&mut self, overlay: OverlayId) {
        self.calls.push(Call::DestroyOverlay(overlay));
        self.overlays.remove(&overlay);
    }
}

/// Decoration hook that records every call
#[derive(Clone, Default)]
pub struct RecordingDecorations {
    pub log: Rc<RefCell<Vec<(WindowId, bool)>>>,
    pub lifecycle: Rc<RefCell<Vec<&'static str>>>,
}

impl DecorationHook for RecordingDecorations {
    fn startup(&mut self) -> Result<(), DecorationError> {
        self.lifecycle.borrow_mut().push("startup");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), DecorationError> {
        self.lifecycle.borrow_mut().push("shutdown");
        Ok(())
    }

    fn set_maximized(
        &mut self,
        target: DecorationTarget,
        maximized: bool,
    ) -> Result<(), DecorationError> {
        self.log.borrow_mut().push((target.window, maximized));
        Ok(())
    }
}

/// Engine over a [`FakeCompositor`] with recorded decorations
pub struct Harness {
    pub engine: Engine<FakeCompositor>,
    pub decorations: RecordingDecorations,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let decorations = RecordingDecorations::default();
        let engine = Engine::new(
            FakeCompositor::default(),
            settings,
            Box::new(decorations.clone()),
        );
        Self {
            engine,
            decorations,
        }
    }

    pub fn comp(&mut self) -> &mut FakeCompositor {
        self.engine.compositor_mut()
    }

    pub fn add(&mut self, window: FakeWindow) -> WindowId {
        self.comp().add(window)
    }

    pub fn event(&mut self, now: Duration, event: CompositorEvent) {
        self.engine.handle_event(now, event);
    }

    pub fn decorations(&self) -> Vec<(WindowId, bool)> {
        self.decorations.log.borrow().clone()
    }

    pub fn set_last_restored(&mut self, window: WindowId, rect: Geometry) {
        self.engine.set_last_restored(window, rect);
    }

    pub fn session_phase(&self, window: WindowId) -> Option<SessionPhase> {
        self.engine.session(window).map(|s| s.phase)
    }

    pub fn session_trigger(&self, window: WindowId) -> Option<Trigger> {
        self.engine.session(window).map(|s| s.trigger)
    }
}
