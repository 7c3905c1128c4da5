//! Optimistic state plus debounced commit.
//!
//! A drag produces a new value on every pointer move. The value is applied to
//! a local slice straight away so the canvas redraws without lag, while
//! writes to the authoritative host arrays are coalesced to at most one per
//! debounce window. [`CommitBuffer::flush`] ends the gesture: it hands back
//! the final local value exactly once so the host records a single history
//! entry for the whole drag.
//!
//! Time is passed in by the caller (milliseconds, any monotonic origin); the
//! buffer never reads a clock, so it behaves the same natively and in the
//! browser.

#[cfg(test)]
#[path = "commit_test.rs"]
mod commit_test;

use crate::doc::{Entity, ObjectId};

/// Records addressable by id, so a local copy can shadow its authoritative
/// counterpart.
pub trait Keyed {
    fn key(&self) -> ObjectId;
}

impl Keyed for Entity {
    fn key(&self) -> ObjectId {
        self.id()
    }
}

/// Overlay the optimistic value on the authoritative list.
///
/// The local copy replaces the authoritative record with the same key in
/// place. A local value with no authoritative counterpart is ignored.
#[must_use]
pub fn merge<T: Keyed + Clone>(authoritative: &[T], local: Option<&T>) -> Vec<T> {
    authoritative
        .iter()
        .map(|a| match local {
            Some(l) if l.key() == a.key() => l.clone(),
            _ => a.clone(),
        })
        .collect()
}

/// Debounce buffer for one gesture's value.
#[derive(Debug, Clone)]
pub struct CommitBuffer<T> {
    window_ms: f64,
    local: Option<T>,
    pending: Option<T>,
    deadline: Option<f64>,
}

impl<T: Clone> CommitBuffer<T> {
    #[must_use]
    pub fn new(window_ms: f64) -> Self {
        Self { window_ms, local: None, pending: None, deadline: None }
    }

    /// The optimistic value, if a gesture is in progress.
    #[must_use]
    pub fn local(&self) -> Option<&T> {
        self.local.as_ref()
    }

    /// Record a new value. The window opens on the first stage after an
    /// emit and is not extended by later stages.
    pub fn stage(&mut self, value: T, now_ms: f64) {
        self.local = Some(value.clone());
        self.pending = Some(value);
        if self.deadline.is_none() {
            self.deadline = Some(now_ms + self.window_ms);
        }
    }

    /// Emit the pending value if its window has closed.
    pub fn poll(&mut self, now_ms: f64) -> Option<T> {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    /// End the gesture: return the final local value and reset.
    pub fn flush(&mut self) -> Option<T> {
        self.pending = None;
        self.deadline = None;
        self.local.take()
    }

    /// Drop everything without emitting.
    pub fn discard(&mut self) {
        self.local = None;
        self.pending = None;
        self.deadline = None;
    }
}
