//! Compositor Module
//!
//! The engine never owns a window. Everything it knows is re-queried through
//! [`Compositor`], and everything it wants is a request that the compositor may
//! apply late (legacy clients) or not at all.

use std::time::Duration;

use crate::shared::{Geometry, MaximizeFlags, OverlayId, Protocol, WindowId, WindowType};

/// Per-window notifications the engine can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    MaximizedHorizontally,
    MaximizedVertically,
    PositionChanged,
    SizeChanged,
    TitleChanged,
    Unmanaged,
}

/// Events delivered by the compositor backend, in the order they occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositorEvent {
    WindowCreated(WindowId),
    /// A per-window notification; `Signal::Unmanaged` means the window is gone
    Window(WindowId, Signal),
    FocusChanged,
    WorkspaceChanged,
    OverviewShown,
    OverviewHidden,
    /// An overlay started by [`Compositor::ease_overlay`] reached its target
    OverlayTransitionDone(OverlayId),
}

/// Window queries and requests the engine needs from the compositor
///
/// Queries on a window that no longer exists return `None` / `false`;
/// requests on it are ignored.
pub trait Compositor {
    /// Every live window, in stacking order
    fn windows(&self) -> Vec<WindowId>;

    fn focus_window(&self) -> Option<WindowId>;

    fn window_type(&self, window: WindowId) -> Option<WindowType>;

    fn protocol(&self, window: WindowId) -> Option<Protocol>;

    /// X11 window id for legacy-protocol clients
    fn x11_window(&self, window: WindowId) -> Option<u32>;

    fn maximize_flags(&self, window: WindowId) -> MaximizeFlags;

    fn frame_rect(&self, window: WindowId) -> Option<Geometry>;

    /// Work area of the monitor the window is on
    fn work_area(&self, window: WindowId) -> Option<Geometry>;

    /// Full geometry of the monitor the window is on
    fn monitor_geometry(&self, window: WindowId) -> Option<Geometry>;

    fn can_maximize(&self, window: WindowId) -> bool;

    fn is_minimized(&self, window: WindowId) -> bool;

    fn title(&self, window: WindowId) -> Option<String>;

    fn wm_class(&self, window: WindowId) -> Option<String>;

    fn skip_taskbar(&self, window: WindowId) -> bool;

    fn on_active_workspace(&self, window: WindowId) -> bool;

    fn overview_visible(&self) -> bool;

    /// Geometry of the window's rendered surface, `None` when it has none
    fn surface_rect(&self, window: WindowId) -> Option<Geometry>;

    fn set_surface_visible(&mut self, window: WindowId, visible: bool);

    fn unmaximize(&mut self, window: WindowId);

    fn move_resize_frame(&mut self, window: WindowId, rect: Geometry);

    fn activate(&mut self, window: WindowId);

    /// Ask the client to close
    fn delete(&mut self, window: WindowId);

    /// Static copy of the window's pixels placed at `rect` above the window group
    fn create_overlay(&mut self, window: WindowId, rect: Geometry) -> Option<OverlayId>;

    /// Ease an overlay to `rect`; completion arrives as
    /// [`CompositorEvent::OverlayTransitionDone`]
    fn ease_overlay(&mut self, overlay: OverlayId, rect: Geometry, duration: Duration);

    fn destroy_overlay(&mut self, overlay: OverlayId);
}
