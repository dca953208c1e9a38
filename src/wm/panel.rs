//! Panel visibility
//!
//! The custom close/restore buttons and title are only shown while the focused
//! window is maximized. The host renders them; the engine decides visibility
//! and publishes [`PanelUpdate`]s so the host can hide its own window buttons
//! in lockstep.

use tracing::debug;

use crate::compositor::{Compositor, Signal};
use crate::shared::{WindowId, WindowType};
use crate::wm::signals::SubscriptionId;
use crate::wm::{Engine, Listener};

/// Desktop-icon windows, never treated as a focused app
const DESKTOP_WM_CLASSES: [&str; 4] = ["ding", "nemo-desktop", "nautilus-desktop", "caja-desktop"];

/// Panel contents published to the host
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelUpdate {
    /// Focused window is maximized: show custom buttons, hide the host's
    pub visible: bool,
    pub title: Option<String>,
}

impl PanelUpdate {
    pub fn hidden() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default)]
pub struct PanelState {
    pub current: PanelUpdate,
    /// Window whose title is shown
    pub title_window: Option<WindowId>,
    pub title_subscription: Option<SubscriptionId>,
    published: bool,
}

/// Buttons the panel exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelButton {
    Close,
    Restore,
}

impl<C: Compositor> Engine<C> {
    /// Recompute panel visibility from the focused window
    pub fn refresh_panel(&mut self) {
        if self.shut_down {
            return;
        }
        let focus = self
            .comp
            .focus_window()
            .filter(|window| self.panel_eligible(*window));

        let Some(window) = focus.filter(|w| self.comp.maximize_flags(*w).is_maximized()) else {
            self.drop_title_subscription();
            self.publish_panel(PanelUpdate::hidden());
            return;
        };

        if self.panel.title_window != Some(window) {
            self.drop_title_subscription();
            let id = self.connect(window, Signal::TitleChanged, Listener::Title);
            self.panel.title_window = Some(window);
            self.panel.title_subscription = Some(id);
        }
        let title = self.comp.title(window).unwrap_or_default();
        self.publish_panel(PanelUpdate {
            visible: true,
            title: Some(title),
        });
    }

    /// Panel buttons act on the focused window
    pub fn press(&mut self, button: PanelButton) {
        if self.shut_down {
            return;
        }
        let Some(window) = self.comp.focus_window() else {
            return;
        };
        match button {
            PanelButton::Close => {
                debug!("Close: {}", self.describe(window));
                self.comp.delete(window);
            }
            PanelButton::Restore => self.restore(window),
        }
    }

    pub fn panel(&self) -> &PanelUpdate {
        &self.panel.current
    }

    pub(super) fn hide_panel(&mut self) {
        self.publish_panel(PanelUpdate::hidden());
    }

    pub(super) fn on_title_changed(&mut self, window: WindowId) {
        if self.panel.title_window != Some(window) || !self.panel.current.visible {
            return;
        }
        let title = self.comp.title(window).unwrap_or_default();
        self.publish_panel(PanelUpdate {
            visible: true,
            title: Some(title),
        });
    }

    pub(super) fn drop_title_subscription(&mut self) {
        if let Some(id) = self.panel.title_subscription.take() {
            self.signals.disconnect(id);
        }
        self.panel.title_window = None;
    }

    /// Publish `update` if it differs from what the host last saw
    pub(super) fn publish_panel(&mut self, update: PanelUpdate) {
        if self.panel.published && self.panel.current == update {
            return;
        }
        self.panel.published = true;
        self.panel.current = update.clone();
        self.updates.push(update);
    }

    fn panel_eligible(&self, window: WindowId) -> bool {
        if self.comp.is_minimized(window)
            || self.comp.window_type(window) != Some(WindowType::Normal)
            || self.comp.overview_visible()
            || !self.comp.on_active_workspace(window)
            || self.comp.skip_taskbar(window)
        {
            return false;
        }
        let class = self.comp.wm_class(window).unwrap_or_default().to_lowercase();
        !DESKTOP_WM_CLASSES.contains(&class.as_str())
    }
}
