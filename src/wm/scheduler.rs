//! Scheduler Module
//!
//! One-shot delayed tasks keyed by handle. Time is a monotonic offset from
//! engine start, supplied by the host; nothing here reads a clock.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Handle returned by [`Scheduler::schedule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

/// Dispatch priority among tasks due at the same instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    High,
    Default,
}

/// Sort key: deadline first, then priority, then insertion order
type QueueKey = (Duration, Priority, TaskHandle);

pub struct Scheduler<T> {
    queue: BTreeMap<QueueKey, T>,
    /// Handle -> queue key, for cancellation
    pending: HashMap<TaskHandle, QueueKey>,
    next_handle: u64,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            pending: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Queue `task` to run `delay` after `now`
    pub fn schedule(&mut self, now: Duration, delay: Duration, task: T) -> TaskHandle {
        self.schedule_with_priority(now, delay, Priority::Default, task)
    }

    pub fn schedule_with_priority(
        &mut self,
        now: Duration,
        delay: Duration,
        priority: Priority,
        task: T,
    ) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;

        let key = (now + delay, priority, handle);
        self.queue.insert(key, task);
        self.pending.insert(handle, key);
        handle
    }

    /// Drop a pending task. Returns `false` if it already ran or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        match self.pending.remove(&handle) {
            Some(key) => self.queue.remove(&key).is_some(),
            None => false,
        }
    }

    /// Drop every pending task
    pub fn cancel_all(&mut self) -> usize {
        let count = self.queue.len();
        self.queue.clear();
        self.pending.clear();
        count
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.pending.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Deadline of the earliest pending task
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(deadline, _, _)| *deadline)
    }

    /// Remove and return the earliest task due at or before `now`
    ///
    /// The task leaves the pending set before the caller runs it, so it may
    /// schedule follow-ups freely.
    pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, T)> {
        let key = *self.queue.keys().next()?;
        if key.0 > now {
            return None;
        }
        let task = self.queue.remove(&key)?;
        self.pending.remove(&key.2);
        Some((key.0, task))
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
