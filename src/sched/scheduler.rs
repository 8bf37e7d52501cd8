// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduling policy interface
//!
//! Every scheduling policy exposes the same surface to the kernel: queue
//! creation plus priority accessors and mutators. The priority-donation policy
//! in [`super::priority`] is one implementation.
//!
//! All methods require the caller to hold the kernel's atomic section (see
//! [`crate::sync::section`]). This is a precondition, not something the
//! scheduler checks.

use crate::error::{SchedError, SchedResult};
use super::queue::QueueId;
use super::thread::ThreadHandle;

/// Thread priority
///
/// Signed so that out-of-range requests can be expressed and rejected.
pub type Priority = i32;

/// Lowest priority a thread can have
pub const PRIORITY_MINIMUM: Priority = 0;

/// Highest priority a thread can have
pub const PRIORITY_MAXIMUM: Priority = 7;

/// Priority given to a thread the first time the scheduler sees it
pub const PRIORITY_DEFAULT: Priority = 1;

/// Validate a base priority against the supported range
pub fn check_priority(priority: Priority) -> SchedResult<()> {
    if !(PRIORITY_MINIMUM..=PRIORITY_MAXIMUM).contains(&priority) {
        return Err(SchedError::PriorityOutOfRange {
            priority,
            min: PRIORITY_MINIMUM,
            max: PRIORITY_MAXIMUM,
        });
    }
    Ok(())
}

/// Scheduling policy
pub trait Scheduler {
    /// Allocate a new resource queue
    ///
    /// When `transfer_priority` is set, the queue's owner receives donations
    /// from its waiters.
    fn create_queue(&mut self, transfer_priority: bool) -> QueueId;

    /// Base priority of `thread`
    fn priority(&mut self, thread: ThreadHandle) -> Priority;

    /// Priority actually used for scheduling decisions
    fn effective_priority(&mut self, thread: ThreadHandle) -> SchedResult<Priority>;

    /// Set the base priority of `thread`
    fn set_priority(&mut self, thread: ThreadHandle, priority: Priority) -> SchedResult<()>;

    /// Raise the base priority of `thread` by one
    ///
    /// Returns `false` without changing anything when already at the maximum.
    fn increase_priority(&mut self, thread: ThreadHandle) -> SchedResult<bool> {
        let priority = self.priority(thread);
        if priority >= PRIORITY_MAXIMUM {
            return Ok(false);
        }
        self.set_priority(thread, priority + 1)?;
        Ok(true)
    }

    /// Lower the base priority of `thread` by one
    ///
    /// Returns `false` without changing anything when already at the minimum.
    fn decrease_priority(&mut self, thread: ThreadHandle) -> SchedResult<bool> {
        let priority = self.priority(thread);
        if priority <= PRIORITY_MINIMUM {
            return Ok(false);
        }
        self.set_priority(thread, priority - 1)?;
        Ok(true)
    }
}

/// Source of enqueue sequence stamps
///
/// Stamps must strictly increase across calls; they order equal-priority
/// waiters oldest-first.
pub trait SequenceSource {
    /// Take the next stamp
    fn next_sequence(&mut self) -> u64;
}

/// Monotonic counter owned by the scheduler
#[derive(Debug, Default)]
pub struct MonotonicCounter {
    next: u64,
}

impl MonotonicCounter {
    /// Create a counter starting at zero
    pub const fn new() -> Self {
        Self { next: 0 }
    }
}

impl SequenceSource for MonotonicCounter {
    fn next_sequence(&mut self) -> u64 {
        let sequence = self.next;
        self.next += 1;
        sequence
    }
}
