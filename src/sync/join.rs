// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Join point
//!
//! Joining waits for another thread to finish. The joined-upon thread owns a
//! transferring queue for its whole life, so joiners donate to it and it is
//! not starved by middle-priority threads while others wait for it.

use alloc::vec::Vec;

use crate::error::{SchedResult, Violation};
use crate::sched::{PriorityScheduler, QueueId, Scheduler, SequenceSource, ThreadHandle};

/// Join point of one thread
#[derive(Debug)]
pub struct JoinPoint {
    queue: QueueId,
    joinee: ThreadHandle,
}

impl JoinPoint {
    /// Create the join point of `joinee`, which owns it until it finishes
    pub fn new<S: SequenceSource>(
        sched: &mut PriorityScheduler<S>,
        joinee: ThreadHandle,
    ) -> SchedResult<Self> {
        let queue = sched.create_queue(true);
        sched.acquire(queue, joinee)?;
        Ok(Self { queue, joinee })
    }

    /// Thread being joined
    pub fn joinee(&self) -> ThreadHandle {
        self.joinee
    }

    /// Check whether the joinee has finished
    pub fn is_finished<S: SequenceSource>(&self, sched: &PriorityScheduler<S>) -> SchedResult<bool> {
        Ok(sched.owner(self.queue)?.is_none())
    }

    /// Wait for the joinee to finish
    ///
    /// Returns `true` if `joiner` was queued and must block, `false` if the
    /// joinee already finished.
    pub fn join<S: SequenceSource>(
        &self,
        sched: &mut PriorityScheduler<S>,
        joiner: ThreadHandle,
    ) -> SchedResult<bool> {
        if joiner == self.joinee {
            return Err(Violation::JoinSelf(joiner).into());
        }
        if self.is_finished(sched)? {
            return Ok(false);
        }
        sched.wait_for_access(self.queue, joiner)?;
        Ok(true)
    }

    /// Mark the joinee finished and release every joiner
    ///
    /// Joiners are returned in selection order; the caller makes them
    /// runnable. Finishing twice releases nobody.
    pub fn finish<S: SequenceSource>(
        &self,
        sched: &mut PriorityScheduler<S>,
    ) -> SchedResult<Vec<ThreadHandle>> {
        if self.is_finished(sched)? {
            return Ok(Vec::new());
        }
        let mut joiners = Vec::with_capacity(sched.queue_len(self.queue)?);
        while let Some(joiner) = sched.next_thread(self.queue)? {
            joiners.push(joiner);
        }
        sched.release(self.queue, self.joinee)?;
        Ok(joiners)
    }

    /// Destroy the join point's queue
    pub fn destroy<S: SequenceSource>(self, sched: &mut PriorityScheduler<S>) -> SchedResult<()> {
        sched.destroy_queue(self.queue)
    }
}
