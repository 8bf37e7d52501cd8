// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! CPU run queue
//!
//! Ready threads wait on a plain (non-transferring) queue; the running thread
//! owns it. Being picked to run never donates anything, but the pick itself
//! follows effective priorities, so a lock holder boosted by its waiters is
//! picked ahead of threads it would otherwise trail.

use crate::error::SchedResult;
use crate::sched::{PriorityScheduler, QueueId, Scheduler, SequenceSource, ThreadHandle};

/// Run queue of one CPU
#[derive(Debug)]
pub struct RunQueue {
    queue: QueueId,
}

impl RunQueue {
    /// Create an empty run queue
    pub fn new<S: SequenceSource>(sched: &mut PriorityScheduler<S>) -> Self {
        Self {
            queue: sched.create_queue(false),
        }
    }

    /// Queue backing this run queue
    pub fn queue(&self) -> QueueId {
        self.queue
    }

    /// Thread currently running
    pub fn current<S: SequenceSource>(&self, sched: &PriorityScheduler<S>) -> SchedResult<Option<ThreadHandle>> {
        sched.owner(self.queue)
    }

    /// Number of ready threads
    pub fn len<S: SequenceSource>(&self, sched: &PriorityScheduler<S>) -> SchedResult<usize> {
        sched.queue_len(self.queue)
    }

    /// Make `thread` ready to run
    ///
    /// The running thread may put itself back (a yield).
    pub fn make_ready<S: SequenceSource>(
        &self,
        sched: &mut PriorityScheduler<S>,
        thread: ThreadHandle,
    ) -> SchedResult<()> {
        sched.wait_for_access(self.queue, thread)
    }

    /// Pick the next thread to run and mark it running
    pub fn next_to_run<S: SequenceSource>(
        &self,
        sched: &mut PriorityScheduler<S>,
    ) -> SchedResult<Option<ThreadHandle>> {
        let next = sched.next_thread(self.queue)?;
        if let Some(thread) = next {
            sched.acquire(self.queue, thread)?;
        }
        Ok(next)
    }
}
