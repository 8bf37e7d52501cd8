// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Donating Lock
//!
//! A kernel lock built on a transferring resource queue: the holder owns the
//! queue, so every blocked thread donates its priority to the holder until the
//! lock changes hands.
//!
//! The lock does not block threads itself. [`DonatingLock::acquire`] tells the
//! caller whether the thread must be taken off the CPU, and
//! [`DonatingLock::release`] names the thread the caller must make runnable.
//!
//! # Usage
//!
//! ```ignore
//! let lock = DonatingLock::new(&mut sched);
//! if lock.acquire(&mut sched, current)? == LockAcquire::MustBlock {
//!     // put `current` to sleep
//! }
//! if let Some(next) = lock.release(&mut sched, current)? {
//!     // make `next` runnable
//! }
//! ```

use crate::error::{SchedResult, Violation};
use crate::sched::{PriorityScheduler, QueueId, Scheduler, SequenceSource, ThreadHandle};

/// Outcome of a lock acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAcquire {
    /// The lock was free and now belongs to the caller
    Acquired,
    /// The lock is held; the caller was queued and must block
    MustBlock,
}

/// Lock whose holder inherits the priority of its waiters
#[derive(Debug)]
pub struct DonatingLock {
    queue: QueueId,
}

impl DonatingLock {
    /// Create a lock with its own transferring queue
    pub fn new<S: SequenceSource>(sched: &mut PriorityScheduler<S>) -> Self {
        Self {
            queue: sched.create_queue(true),
        }
    }

    /// Queue backing this lock
    pub fn queue(&self) -> QueueId {
        self.queue
    }

    /// Current holder
    pub fn holder<S: SequenceSource>(&self, sched: &PriorityScheduler<S>) -> SchedResult<Option<ThreadHandle>> {
        sched.owner(self.queue)
    }

    /// Take the lock for `thread`, or queue it behind the holder
    ///
    /// Acquiring a lock already held by `thread` is a self-deadlock.
    pub fn acquire<S: SequenceSource>(
        &self,
        sched: &mut PriorityScheduler<S>,
        thread: ThreadHandle,
    ) -> SchedResult<LockAcquire> {
        if sched.owner(self.queue)?.is_none() {
            sched.acquire(self.queue, thread)?;
            return Ok(LockAcquire::Acquired);
        }
        sched.wait_for_access(self.queue, thread)?;
        Ok(LockAcquire::MustBlock)
    }

    /// Release the lock held by `thread`
    ///
    /// The highest-priority waiter becomes the new holder and is returned so
    /// the caller can make it runnable.
    pub fn release<S: SequenceSource>(
        &self,
        sched: &mut PriorityScheduler<S>,
        thread: ThreadHandle,
    ) -> SchedResult<Option<ThreadHandle>> {
        if sched.owner(self.queue)? != Some(thread) {
            return Err(Violation::NotOwner { thread, queue: self.queue }.into());
        }
        match sched.next_thread(self.queue)? {
            Some(next) => {
                sched.acquire(self.queue, next)?;
                Ok(Some(next))
            }
            None => {
                sched.release(self.queue, thread)?;
                Ok(None)
            }
        }
    }

    /// Destroy the lock's queue
    pub fn destroy<S: SequenceSource>(self, sched: &mut PriorityScheduler<S>) -> SchedResult<()> {
        sched.destroy_queue(self.queue)
    }
}
