//! Minimum open size
//!
//! Newly created maximizable windows that open smaller than a fraction of the
//! work area get nudged up to it. Apps often resize themselves several times
//! after mapping, so the window is watched for a bounded period and only
//! settles after two consecutive probes find it large enough.

use std::time::Duration;
use tracing::debug;

use crate::compositor::{Compositor, Signal};
use crate::shared::{Size, WindowId};
use crate::wm::scheduler::TaskHandle;
use crate::wm::signals::SubscriptionId;
use crate::wm::tracker::MIN_REMEMBERED_SIZE;
use crate::wm::{Engine, Listener, Task};

/// Probe offsets from enrollment
pub const PROBES: [Duration; 6] = [
    Duration::from_millis(200),
    Duration::from_millis(500),
    Duration::from_millis(800),
    Duration::from_millis(1200),
    Duration::from_millis(2000),
    Duration::from_millis(3000),
];
/// Enforcement stops unconditionally this long after enrollment
pub const HARD_STOP: Duration = Duration::from_millis(3500);
/// Consecutive satisfying probes needed to settle
pub const SETTLE_PROBES: u32 = 2;
/// Frames smaller than this on either axis are not laid out yet
pub const DEGENERATE_SIZE: u32 = 10;
pub const SUPPRESS_TRAILING: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MinSizePhase {
    /// Never enrolled
    #[default]
    Idle,
    Watching {
        ok_probes: u32,
        subscription: SubscriptionId,
        tasks: Vec<TaskHandle>,
    },
    /// Terminal
    Settled,
}

impl<C: Compositor> Engine<C> {
    /// Start watching a new window, if enforcement is enabled
    pub(super) fn enroll_min_size(&mut self, window: WindowId) {
        if self.settings.min_open_percent().is_none() {
            return;
        }
        match self.windows.get(&window) {
            Some(state) if state.min_size == MinSizePhase::Idle => {}
            _ => return,
        }

        let subscription = self.connect(window, Signal::SizeChanged, Listener::MinSize);
        let mut tasks: Vec<TaskHandle> = PROBES
            .iter()
            .map(|delay| {
                self.scheduler
                    .schedule(self.now, *delay, Task::MinSizeProbe(window))
            })
            .collect();
        tasks.push(
            self.scheduler
                .schedule(self.now, HARD_STOP, Task::MinSizeStop(window)),
        );

        if let Some(state) = self.windows.get_mut(&window) {
            state.min_size = MinSizePhase::Watching {
                ok_probes: 0,
                subscription,
                tasks,
            };
        }
    }

    pub fn min_size_phase(&self, window: WindowId) -> Option<&MinSizePhase> {
        self.windows.get(&window).map(|state| &state.min_size)
    }

    pub fn min_size_settled(&self, window: WindowId) -> bool {
        matches!(self.min_size_phase(window), Some(MinSizePhase::Settled))
    }

    /// One probe: count a satisfying frame, or push the window up to the floor
    pub(super) fn enforce_min_size(&mut self, window: WindowId) {
        let watching = matches!(
            self.windows.get(&window).map(|state| &state.min_size),
            Some(MinSizePhase::Watching { .. })
        );
        if !watching {
            return;
        }
        if !self.comp.maximize_flags(window).is_empty() || !self.comp.can_maximize(window) {
            return;
        }
        let Some(percent) = self.settings.min_open_percent() else {
            self.settle_min_size(window);
            return;
        };
        let Some(frame) = self.comp.frame_rect(window) else {
            return;
        };
        if frame.width < DEGENERATE_SIZE || frame.height < DEGENERATE_SIZE {
            return;
        }
        let Some(work_area) = self.comp.work_area(window) else {
            return;
        };
        let floor = work_area.scaled_size(percent);

        if frame.width >= floor.width && frame.height >= floor.height {
            let ok = self.bump_ok_probes(window);
            if ok >= SETTLE_PROBES {
                debug!("Min size OK: {} {}×{}", self.describe(window), frame.width, frame.height);
                self.settle_min_size(window);
            }
            return;
        }

        self.reset_ok_probes(window);
        let size = Size::new(frame.width.max(floor.width), frame.height.max(floor.height));
        let target = work_area.center(size);
        debug!(
            "Min size: {} {}×{} → {}×{}",
            self.describe(window),
            frame.width,
            frame.height,
            size.width,
            size.height
        );

        self.suppress(window);
        self.comp.move_resize_frame(window, target);
        self.clear_suppression_after(window, SUPPRESS_TRAILING);
    }

    fn bump_ok_probes(&mut self, window: WindowId) -> u32 {
        match self.windows.get_mut(&window).map(|state| &mut state.min_size) {
            Some(MinSizePhase::Watching { ok_probes, .. }) => {
                *ok_probes += 1;
                *ok_probes
            }
            _ => 0,
        }
    }

    fn reset_ok_probes(&mut self, window: WindowId) {
        if let Some(MinSizePhase::Watching { ok_probes, .. }) =
            self.windows.get_mut(&window).map(|state| &mut state.min_size)
        {
            *ok_probes = 0;
        }
    }

    /// Enter the terminal state: release the watch and remember the size
    pub(super) fn settle_min_size(&mut self, window: WindowId) {
        let Some(state) = self.windows.get_mut(&window) else {
            return;
        };
        if !matches!(state.min_size, MinSizePhase::Watching { .. }) {
            return;
        }
        let MinSizePhase::Watching {
            subscription,
            tasks,
            ..
        } = std::mem::replace(&mut state.min_size, MinSizePhase::Settled)
        else {
            return;
        };
        if let Some(handle) = state.suppress_clear.take() {
            self.scheduler.cancel(handle);
        }
        if !self.sessions.contains_key(&window) {
            state.suppress_notifications = false;
        }

        self.signals.disconnect(subscription);
        for handle in tasks {
            self.scheduler.cancel(handle);
        }

        if let Some(frame) = self.comp.frame_rect(window) {
            if frame.at_least(MIN_REMEMBERED_SIZE) {
                if let Some(state) = self.windows.get_mut(&window) {
                    state.original_size = Some(frame.size());
                }
            }
        }
    }
}
