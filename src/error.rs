// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduler error kinds
//!
//! Two kinds of failure leave the scheduler core:
//!
//! - **Range errors**: a priority outside `[PRIORITY_MINIMUM, PRIORITY_MAXIMUM]`.
//!   Nothing is mutated and the caller may retry with a valid value.
//! - **Invariant violations**: the host kernel used the core in a way that breaks
//!   the ownership graph (a donation cycle, a self-deadlock, a stale queue id).
//!   These are programming defects; the host is expected to treat them as fatal.

use crate::sched::queue::QueueId;
use crate::sched::scheduler::Priority;
use crate::sched::thread::ThreadHandle;

/// Result type for scheduler operations
pub type SchedResult<T> = Result<T, SchedError>;

/// Scheduler error
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchedError {
    /// Requested base priority is outside the supported range
    #[error("priority {priority} outside [{min}, {max}]")]
    PriorityOutOfRange {
        priority: Priority,
        min: Priority,
        max: Priority,
    },

    /// The ownership graph or a queue is in a state the core cannot accept
    #[error("scheduler invariant violated: {0}")]
    InvariantViolation(Violation),
}

impl SchedError {
    /// Whether this error signals a defect in the caller (fatal)
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

/// Detected corruption of the scheduler's invariants
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// A thread was reached twice while walking donation edges
    #[error("donation cycle through thread {0}")]
    DonationCycle(ThreadHandle),

    /// A thread waited on a queue it already owns
    #[error("thread {thread} waits on {queue}, which it owns")]
    SelfDeadlock { thread: ThreadHandle, queue: QueueId },

    /// A thread waited on a second queue while still queued on another
    #[error("thread {thread} is already waiting on {queue}")]
    AlreadyWaiting { thread: ThreadHandle, queue: QueueId },

    /// The queue id was never created or has been destroyed
    #[error("unknown queue {0}")]
    UnknownQueue(QueueId),

    /// A thread gave up a queue it does not own
    #[error("thread {thread} does not own {queue}")]
    NotOwner { thread: ThreadHandle, queue: QueueId },

    /// A thread tried to join on itself
    #[error("thread {0} joined on itself")]
    JoinSelf(ThreadHandle),
}

impl From<Violation> for SchedError {
    fn from(violation: Violation) -> Self {
        log::error!("sched: {}", violation);
        Self::InvariantViolation(violation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_error_is_recoverable() {
        let err = SchedError::PriorityOutOfRange { priority: 9, min: 0, max: 7 };
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_violation_converts_to_fatal_error() {
        let err: SchedError = Violation::JoinSelf(ThreadHandle::from_raw(3)).into();
        assert!(err.is_fatal());
        assert_eq!(err, SchedError::InvariantViolation(Violation::JoinSelf(ThreadHandle::from_raw(3))));
    }
}
