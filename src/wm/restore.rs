//! Restore animation
//!
//! Un-maximizing makes a window jump: the compositor shows the old geometry,
//! then the client redraws at the new one, and legacy clients only resize once
//! they have acknowledged the un-maximize. A session hides all of that behind
//! an overlay clone frozen at the maximized geometry. The live surface is made
//! invisible, driven to a centered rectangle, and once it has settled the
//! overlay eases onto it and is discarded.
//!
//! Sessions end through [`Engine::finish_session`], which every exit path
//! (normal completion, safety timeout, window destruction) funnels into and
//! which only acts once.

use std::time::Duration;
use tracing::{debug, info};

use crate::compositor::{Compositor, Signal};
use crate::shared::{Geometry, OverlayId, Protocol, WindowId};
use crate::wm::scheduler::{Priority, TaskHandle};
use crate::wm::signals::SubscriptionId;
use crate::wm::{Engine, Listener, Task};

/// Overlay ease onto the settled surface
pub const OVERLAY_EASE: Duration = Duration::from_millis(10);
/// Native protocol: second move-resize after the first
pub const NATIVE_NUDGE: Duration = Duration::from_millis(10);
/// Legacy protocol: wait this long for the client to acknowledge un-maximize
pub const LEGACY_ACK_TIMEOUT: Duration = Duration::from_millis(500);
/// Legacy protocol: move-resize retries after the first request
pub const LEGACY_RETRIES: [Duration; 2] = [Duration::from_millis(50), Duration::from_millis(120)];
/// Legacy protocol: settle time before the overlay is eased away
pub const LEGACY_SETTLE: Duration = Duration::from_millis(200);
/// Legacy protocol: focus is re-requested after finishing
pub const LEGACY_REFOCUS: [Duration; 2] = [Duration::from_millis(50), Duration::from_millis(150)];
/// Suppression outlives a session by this much
pub const SUPPRESS_TRAILING: Duration = Duration::from_millis(100);

pub fn safety_timeout(protocol: Protocol) -> Duration {
    match protocol {
        Protocol::Native => Duration::from_millis(1500),
        Protocol::Legacy => Duration::from_millis(3000),
    }
}

/// Centered rectangle covering `percent` of the work area on each axis
pub fn target_rect(work_area: Geometry, percent: u32) -> Geometry {
    work_area.center(work_area.scaled_size(percent))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub(crate) u64);

/// What started the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Our restore button; the session issues the un-maximize itself
    Button,
    /// The window was un-maximized by something else
    External,
}

/// Scheduled steps of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    SafetyTimeout,
    NativeNudge,
    LegacyAckTimeout,
    LegacyRetry,
    Settle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Geometry requests in flight
    Driving,
    /// Legacy client has not acknowledged the un-maximize yet
    AwaitingAck,
    /// Overlay easing onto the live surface
    Easing,
}

/// One in-flight restore for one window
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub protocol: Protocol,
    pub trigger: Trigger,
    pub overlay: OverlayId,
    pub target: Geometry,
    pub phase: SessionPhase,
    /// Every task this session scheduled
    pub tasks: Vec<TaskHandle>,
    pub unmanaged: Option<SubscriptionId>,
    pub resized: Option<SubscriptionId>,
    pub ack_timeout: Option<TaskHandle>,
}

impl<C: Compositor> Engine<C> {
    /// Restore-button path: un-maximize `window` without a visible jump
    pub fn restore(&mut self, window: WindowId) {
        if self.shut_down || !self.comp.maximize_flags(window).is_maximized() {
            return;
        }
        if self.comp.surface_rect(window).is_none() {
            debug!("No surface, plain unmaximize: {}", self.describe(window));
            self.comp.unmaximize(window);
            return;
        }
        if self.last_restored(window).is_some() {
            debug!("Compositor-native restore: {}", self.describe(window));
            self.comp.unmaximize(window);
            return;
        }
        self.begin_session(window, Trigger::Button);
    }

    pub fn is_animating(&self, window: WindowId) -> bool {
        self.sessions.contains_key(&window)
    }

    pub fn session(&self, window: WindowId) -> Option<&Session> {
        self.sessions.get(&window)
    }

    /// Target rectangle for `window` with the current restore percentage
    pub fn restore_target(&self, window: WindowId) -> Option<Geometry> {
        let work_area = self.comp.work_area(window)?;
        Some(target_rect(work_area, self.settings.restore_percent()))
    }

    pub(super) fn check_external_restore(&mut self, window: WindowId) {
        if !self.is_alive(window) || !self.comp.maximize_flags(window).is_empty() {
            return;
        }
        if self.last_restored(window).is_some() || self.comp.surface_rect(window).is_none() {
            return;
        }
        self.begin_session(window, Trigger::External);
    }

    fn begin_session(&mut self, window: WindowId, trigger: Trigger) {
        if self.sessions.contains_key(&window) {
            debug!("Session already running for {}", self.describe(window));
            return;
        }
        let Some(protocol) = self.protocol_of(window) else {
            return;
        };
        let button = trigger == Trigger::Button;

        let prepared = self.restore_target(window).and_then(|target| {
            let surface = self.comp.surface_rect(window)?;
            Some((target, surface))
        });
        let Some((target, surface)) = prepared else {
            if button {
                self.comp.unmaximize(window);
            }
            return;
        };
        let Some(overlay) = self.comp.create_overlay(window, surface) else {
            debug!("Overlay unavailable, plain unmaximize: {}", self.describe(window));
            if button {
                self.comp.unmaximize(window);
            }
            return;
        };

        info!(
            "Animate {}: {} → {:?}",
            if button { "btn" } else { "sig" },
            self.describe(window),
            target
        );

        self.suppress(window);
        self.comp.set_surface_visible(window, false);

        let id = SessionId(self.next_session);
        self.next_session += 1;

        let safety = self.scheduler.schedule(
            self.now,
            safety_timeout(protocol),
            Task::Session {
                window,
                session: id,
                step: SessionStep::SafetyTimeout,
            },
        );
        let unmanaged = self.connect(window, Signal::Unmanaged, Listener::SessionUnmanaged(id));

        self.sessions.insert(
            window,
            Session {
                id,
                protocol,
                trigger,
                overlay,
                target,
                phase: SessionPhase::Driving,
                tasks: vec![safety],
                unmanaged: Some(unmanaged),
                resized: None,
                ack_timeout: None,
            },
        );

        if button {
            self.comp.unmaximize(window);
        }

        match protocol {
            Protocol::Native => {
                self.comp.move_resize_frame(window, target);
                self.schedule_step(window, id, NATIVE_NUDGE, SessionStep::NativeNudge);
            }
            Protocol::Legacy => {
                let resized = self.connect(window, Signal::SizeChanged, Listener::SessionResized(id));
                let ack = self.schedule_step(window, id, LEGACY_ACK_TIMEOUT, SessionStep::LegacyAckTimeout);
                if let Some(session) = self.sessions.get_mut(&window) {
                    session.phase = SessionPhase::AwaitingAck;
                    session.resized = Some(resized);
                    session.ack_timeout = ack;
                }
            }
        }
    }

    /// Schedule a step owned by the session, if it is still the live one
    fn schedule_step(
        &mut self,
        window: WindowId,
        id: SessionId,
        delay: Duration,
        step: SessionStep,
    ) -> Option<TaskHandle> {
        let session = self.sessions.get_mut(&window).filter(|s| s.id == id)?;
        let handle = self.scheduler.schedule_with_priority(
            self.now,
            delay,
            Priority::Default,
            Task::Session {
                window,
                session: id,
                step,
            },
        );
        session.tasks.push(handle);
        Some(handle)
    }

    fn live_session(&self, window: WindowId, id: SessionId) -> Option<&Session> {
        self.sessions.get(&window).filter(|s| s.id == id)
    }

    pub(super) fn run_session_step(&mut self, window: WindowId, id: SessionId, step: SessionStep) {
        let Some(session) = self.live_session(window, id) else {
            return;
        };
        let target = session.target;

        match step {
            SessionStep::SafetyTimeout => {
                debug!("Safety cleanup: {}", self.describe(window));
                self.finish_session(window, id);
            }
            SessionStep::NativeNudge => {
                self.comp.move_resize_frame(window, target);
                self.schedule_step(window, id, Duration::ZERO, SessionStep::Settle);
            }
            SessionStep::LegacyAckTimeout => {
                debug!("X11 size-changed timeout, proceeding: {}", self.describe(window));
                self.proceed_legacy(window, id);
            }
            SessionStep::LegacyRetry => self.comp.move_resize_frame(window, target),
            SessionStep::Settle => self.settle_session(window, id),
        }
    }

    /// Legacy client resized; proceed once it is no longer maximized
    pub(super) fn on_session_resized(&mut self, window: WindowId, id: SessionId) {
        if self.live_session(window, id).is_none() {
            return;
        }
        if self.comp.maximize_flags(window).is_maximized() {
            return;
        }
        self.proceed_legacy(window, id);
    }

    /// First of acknowledgment or timeout: stop waiting, then drive geometry with retries
    fn proceed_legacy(&mut self, window: WindowId, id: SessionId) {
        let Some(session) = self.sessions.get_mut(&window).filter(|s| s.id == id) else {
            return;
        };
        if session.phase != SessionPhase::AwaitingAck {
            return;
        }
        session.phase = SessionPhase::Driving;
        let resized = session.resized.take();
        let ack = session.ack_timeout.take();
        let target = session.target;

        if let Some(resized) = resized {
            self.signals.disconnect(resized);
        }
        if let Some(ack) = ack {
            self.scheduler.cancel(ack);
        }

        debug!("X11 unmax confirmed, moving to center: {}", self.describe(window));
        self.comp.move_resize_frame(window, target);
        for delay in LEGACY_RETRIES {
            self.schedule_step(window, id, delay, SessionStep::LegacyRetry);
        }
        self.schedule_step(window, id, LEGACY_SETTLE, SessionStep::Settle);
    }

    /// Record the settled frame and ease the overlay onto the live surface
    fn settle_session(&mut self, window: WindowId, id: SessionId) {
        let Some(frame) = self.comp.frame_rect(window) else {
            self.finish_session(window, id);
            return;
        };
        if let Some(state) = self.windows.get_mut(&window) {
            state.last_restored = Some(frame);
        }
        let Some(surface) = self.comp.surface_rect(window) else {
            self.finish_session(window, id);
            return;
        };
        debug!("Final: {:?} for {}", surface, self.describe(window));

        let Some(session) = self.sessions.get_mut(&window).filter(|s| s.id == id) else {
            return;
        };
        if session.phase == SessionPhase::Easing {
            return;
        }
        session.phase = SessionPhase::Easing;
        let overlay = session.overlay;
        self.comp.ease_overlay(overlay, surface, OVERLAY_EASE);
    }

    pub(super) fn on_overlay_done(&mut self, overlay: OverlayId) {
        let found = self
            .sessions
            .iter()
            .find(|(_, session)| session.overlay == overlay && session.phase == SessionPhase::Easing)
            .map(|(window, session)| (*window, session.id));
        if let Some((window, id)) = found {
            self.finish_session(window, id);
        }
    }

    /// End a session exactly once: release its resources, show the surface,
    /// refocus the window and schedule the trailing suppression clear.
    pub(crate) fn finish_session(&mut self, window: WindowId, id: SessionId) {
        if self.live_session(window, id).is_none() {
            return;
        }
        let Some(session) = self.sessions.remove(&window) else {
            return;
        };
        self.release_session(window, &session);

        if self.is_alive(window) && !self.comp.is_minimized(window) {
            // Hiding the surface can cost a legacy client its input focus
            self.comp.activate(window);
            if session.protocol == Protocol::Legacy {
                for delay in LEGACY_REFOCUS {
                    self.schedule_window_task(window, delay, Priority::Default, Task::Refocus(window));
                }
            }
        }
        self.clear_suppression_after(window, SUPPRESS_TRAILING);
    }

    /// Tear down a session without refocusing or scheduling anything
    pub(super) fn abandon_session(&mut self, window: WindowId) {
        if let Some(session) = self.sessions.remove(&window) {
            debug!("Abandoning session on {:?}", window);
            self.release_session(window, &session);
            if let Some(state) = self.windows.get_mut(&window) {
                state.suppress_notifications = false;
            }
        }
    }

    fn release_session(&mut self, window: WindowId, session: &Session) {
        for handle in &session.tasks {
            self.scheduler.cancel(*handle);
        }
        for id in session.unmanaged.iter().chain(session.resized.iter()) {
            self.signals.disconnect(*id);
        }
        self.comp.set_surface_visible(window, true);
        self.comp.destroy_overlay(session.overlay);
    }
}
