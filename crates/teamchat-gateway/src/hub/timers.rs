//! Cancellable hub timers
//!
//! Each armed timer is a spawned sleep that reports back to the hub through a
//! channel. Re-arming a key aborts the previous sleep and bumps its generation,
//! so a firing that raced the abort is recognised as stale and dropped.

use std::collections::HashMap;
use std::time::Duration;

use teamchat_core::{ChannelId, UserId};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// What a timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Offline-pending grace window of a user
    PresenceGrace(UserId),
    /// Auto-clear of a typing indicator
    Typing { channel_id: ChannelId, user_id: UserId },
}

/// Notification sent to the hub when a timer elapses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub key: TimerKey,
    pub generation: u64,
}

#[derive(Debug)]
struct ArmedTimer {
    generation: u64,
    handle: AbortHandle,
}

#[derive(Debug)]
pub struct Timers {
    fired: mpsc::UnboundedSender<TimerFired>,
    armed: HashMap<TimerKey, ArmedTimer>,
    next_generation: u64,
}

impl Timers {
    pub fn new(fired: mpsc::UnboundedSender<TimerFired>) -> Self {
        Self {
            fired,
            armed: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Arm `key` to fire after `delay`, replacing any pending timer for it
    pub fn arm(&mut self, key: TimerKey, delay: Duration) -> u64 {
        self.cancel(key);

        self.next_generation += 1;
        let generation = self.next_generation;
        let fired = self.fired.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The hub may already be gone during shutdown
            let _ = fired.send(TimerFired { key, generation });
        });

        self.armed.insert(
            key,
            ArmedTimer {
                generation,
                handle: task.abort_handle(),
            },
        );
        generation
    }

    /// Cancel a pending timer; returns whether one was armed
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        match self.armed.remove(&key) {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Accept a firing if it belongs to the currently armed timer
    ///
    /// The timer is disarmed on acceptance.
    pub fn take_if_current(&mut self, fired: TimerFired) -> bool {
        let current = self
            .armed
            .get(&fired.key)
            .is_some_and(|t| t.generation == fired.generation);
        if current {
            self.armed.remove(&fired.key);
        }
        current
    }

    pub fn is_armed(&self, key: TimerKey) -> bool {
        self.armed.contains_key(&key)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        for timer in self.armed.values() {
            timer.handle.abort();
        }
    }
}
