//! Signal subscriptions
//!
//! Every connection the engine makes to a window notification is an entry in
//! this table, released through its id exactly once.

use std::collections::BTreeMap;

use crate::compositor::Signal;
use crate::shared::WindowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, Copy)]
struct Subscription<L> {
    window: WindowId,
    signal: Signal,
    listener: L,
}

/// Subscription table; ids grow monotonically so iteration follows connect order
pub struct SignalHub<L> {
    subscriptions: BTreeMap<SubscriptionId, Subscription<L>>,
    next_id: u64,
}

impl<L: Copy> SignalHub<L> {
    pub fn new() -> Self {
        Self {
            subscriptions: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn connect(&mut self, window: WindowId, signal: Signal, listener: L) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.insert(
            id,
            Subscription {
                window,
                signal,
                listener,
            },
        );
        id
    }

    /// Returns `false` if the subscription was already released
    pub fn disconnect(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    pub fn is_connected(&self, id: SubscriptionId) -> bool {
        self.subscriptions.contains_key(&id)
    }

    /// Listeners for `signal` on `window`, in connect order
    ///
    /// Returned as a snapshot: callers must re-check [`Self::is_connected`]
    /// before invoking each one, since an earlier listener may release a later one.
    pub fn listeners(&self, window: WindowId, signal: Signal) -> Vec<(SubscriptionId, L)> {
        self.subscriptions
            .iter()
            .filter(|(_, sub)| sub.window == window && sub.signal == signal)
            .map(|(id, sub)| (*id, sub.listener))
            .collect()
    }

    /// Number of live subscriptions on `window`
    pub fn count_for(&self, window: WindowId) -> usize {
        self.subscriptions
            .values()
            .filter(|sub| sub.window == window)
            .count()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release everything still connected on `window`
    pub fn disconnect_window(&mut self, window: WindowId) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|_, sub| sub.window != window);
        before - self.subscriptions.len()
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

impl<L: Copy> Default for SignalHub<L> {
    fn default() -> Self {
        Self::new()
    }
}
