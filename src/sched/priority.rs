// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Priority-donation scheduler
//!
//! [`PriorityScheduler`] owns two arenas: the per-thread scheduling state,
//! keyed by [`ThreadHandle`], and the resource queues, keyed by [`QueueId`].
//! Queues refer to threads and threads refer to queues only through these
//! keys; neither owns the other.
//!
//! # Thread lifecycle
//!
//! ```text
//! Unblocked -> (wait_for_access) -> Blocked(Q) -> (acquire) -> Owner(Q)
//! ```
//!
//! A thread may own any number of queues while blocked on at most one other.
//!
//! # Example
//! ```ignore
//! use rustux_sched::sched::{PriorityScheduler, Scheduler, ThreadHandle};
//!
//! let mut sched = PriorityScheduler::new();
//! let lock = sched.create_queue(true);
//! let (low, high) = (ThreadHandle::from_raw(1), ThreadHandle::from_raw(2));
//!
//! sched.acquire(lock, low)?;
//! sched.set_priority(high, 7)?;
//! sched.wait_for_access(lock, high)?;
//! assert_eq!(sched.effective_priority(low)?, 7);
//! ```

use alloc::vec::Vec;

use crate::error::{SchedResult, Violation};
use super::donation::{
    self, acquire_closes_cycle, invalidate_chain, state_mut, wait_closes_cycle, waiter_key,
    QueueTable, ThreadTable,
};
use super::queue::{QueueFlags, QueueId, ResourceQueue};
use super::scheduler::{check_priority, MonotonicCounter, Priority, Scheduler, SequenceSource};
use super::thread::{ThreadHandle, ThreadState};

/// Priority scheduler with donation through transferring queues
#[derive(Debug)]
pub struct PriorityScheduler<S: SequenceSource = MonotonicCounter> {
    threads: ThreadTable,
    queues: QueueTable,
    next_queue_id: u64,
    sequence: S,
}

impl PriorityScheduler<MonotonicCounter> {
    /// Create a scheduler stamping enqueues from its own counter
    pub const fn new() -> Self {
        Self {
            threads: ThreadTable::new(),
            queues: QueueTable::new(),
            next_queue_id: 1,
            sequence: MonotonicCounter::new(),
        }
    }
}

impl Default for PriorityScheduler<MonotonicCounter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SequenceSource> PriorityScheduler<S> {
    /// Create a scheduler stamping enqueues from a host-provided source
    pub fn with_sequence_source(sequence: S) -> Self {
        Self {
            threads: ThreadTable::new(),
            queues: QueueTable::new(),
            next_queue_id: 1,
            sequence,
        }
    }

    fn queue(&self, id: QueueId) -> SchedResult<&ResourceQueue> {
        self.queues.get(&id).ok_or_else(|| Violation::UnknownQueue(id).into())
    }

    fn queue_mut(&mut self, id: QueueId) -> SchedResult<&mut ResourceQueue> {
        self.queues.get_mut(&id).ok_or_else(|| Violation::UnknownQueue(id).into())
    }

    /// Scheduling state of `thread`, if the scheduler has seen it
    pub fn thread_state(&self, thread: ThreadHandle) -> Option<&ThreadState> {
        self.threads.get(&thread)
    }

    /// Queue `thread` is waiting on
    pub fn waiting_on(&self, thread: ThreadHandle) -> Option<QueueId> {
        self.threads.get(&thread).and_then(|state| state.waiting_on)
    }

    /// Current owner of `queue`
    pub fn owner(&self, queue: QueueId) -> SchedResult<Option<ThreadHandle>> {
        Ok(self.queue(queue)?.owner())
    }

    /// Number of threads waiting on `queue`
    pub fn queue_len(&self, queue: QueueId) -> SchedResult<usize> {
        Ok(self.queue(queue)?.len())
    }

    /// Whether `queue` donates to its owner
    pub fn transfers_priority(&self, queue: QueueId) -> SchedResult<bool> {
        Ok(self.queue(queue)?.transfers_priority())
    }

    /// Number of threads with scheduling state
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Number of live queues
    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    /// Waiters of `queue` in the order `next_thread` would return them
    pub fn waiters(&mut self, queue: QueueId) -> SchedResult<Vec<ThreadHandle>> {
        let queues = &self.queues;
        let threads = &mut self.threads;
        let queue = queues.get(&queue).ok_or(Violation::UnknownQueue(queue))?;
        queue.ordered(|thread| waiter_key(threads, queues, thread))
    }

    /// Queue `thread` for access to `queue`
    ///
    /// Waiting again on the queue the thread already waits on is a no-op. A
    /// thread owning a plain (non-transferring) queue gives up ownership when
    /// it waits on it again, the way a running thread re-enters the run
    /// queue; owning a transferring queue and waiting on it is a self-deadlock.
    pub fn wait_for_access(&mut self, queue: QueueId, thread: ThreadHandle) -> SchedResult<()> {
        let target = self.queue(queue)?;
        let owner = target.owner();
        let transfers = target.transfers_priority();

        if owner == Some(thread) && transfers {
            return Err(Violation::SelfDeadlock { thread, queue }.into());
        }
        match self.threads.get(&thread).and_then(|state| state.waiting_on) {
            Some(current) if current == queue => return Ok(()),
            Some(current) => {
                return Err(Violation::AlreadyWaiting { thread, queue: current }.into());
            }
            None => {}
        }
        if wait_closes_cycle(&self.threads, &self.queues, thread, target) {
            return Err(Violation::DonationCycle(thread).into());
        }

        let sequence = self.sequence.next_sequence();
        let state = state_mut(&mut self.threads, thread);
        state.enqueue_sequence = sequence;
        state.waiting_on = Some(queue);
        state.owned.remove(&queue);

        let target = self.queue_mut(queue)?;
        if owner == Some(thread) {
            target.set_owner(None);
        }
        target.push(thread);
        log::trace!("sched: {} waits on {} (seq {})", thread, queue, sequence);

        if transfers {
            if let Some(owner) = owner.filter(|&owner| owner != thread) {
                invalidate_chain(&mut self.threads, &self.queues, owner)?;
            }
        }
        Ok(())
    }

    /// Make `thread` the owner of `queue`
    ///
    /// The thread leaves the waiters if it was queued. A previous owner loses
    /// the queue along with the donations it carried.
    pub fn acquire(&mut self, queue: QueueId, thread: ThreadHandle) -> SchedResult<()> {
        if acquire_closes_cycle(&self.threads, &self.queues, thread, self.queue(queue)?) {
            return Err(Violation::DonationCycle(thread).into());
        }

        let target = self.queue_mut(queue)?;
        target.remove(thread);
        let previous = target.owner();
        let transfers = target.transfers_priority();
        target.set_owner(Some(thread));

        let state = state_mut(&mut self.threads, thread);
        if state.waiting_on == Some(queue) {
            state.waiting_on = None;
        }
        state.owned.insert(queue);
        log::trace!("sched: {} acquires {}", thread, queue);

        if let Some(previous) = previous.filter(|&previous| previous != thread) {
            if let Some(state) = self.threads.get_mut(&previous) {
                state.owned.remove(&queue);
            }
            if transfers {
                invalidate_chain(&mut self.threads, &self.queues, previous)?;
            }
        }
        if transfers {
            invalidate_chain(&mut self.threads, &self.queues, thread)?;
        }
        Ok(())
    }

    /// Give up ownership of `queue` without handing it to another thread
    pub fn release(&mut self, queue: QueueId, thread: ThreadHandle) -> SchedResult<()> {
        let target = self.queue_mut(queue)?;
        if target.owner() != Some(thread) {
            return Err(Violation::NotOwner { thread, queue }.into());
        }
        target.set_owner(None);
        let transfers = target.transfers_priority();

        if let Some(state) = self.threads.get_mut(&thread) {
            state.owned.remove(&queue);
        }
        log::trace!("sched: {} releases {}", thread, queue);

        if transfers {
            invalidate_chain(&mut self.threads, &self.queues, thread)?;
        }
        Ok(())
    }

    /// Select the waiter that should run next without removing it
    pub fn peek_next(&mut self, queue: QueueId) -> SchedResult<Option<ThreadHandle>> {
        let queues = &self.queues;
        let threads = &mut self.threads;
        let queue = queues.get(&queue).ok_or(Violation::UnknownQueue(queue))?;
        queue.select(|thread| waiter_key(threads, queues, thread))
    }

    /// Remove and return the waiter that should run next
    ///
    /// The selected thread is not made the owner; callers pair this with
    /// [`Self::acquire`] when the resource changes hands.
    pub fn next_thread(&mut self, queue: QueueId) -> SchedResult<Option<ThreadHandle>> {
        let Some(next) = self.peek_next(queue)? else {
            return Ok(None);
        };

        let target = self.queue_mut(queue)?;
        target.remove(next);
        let owner = target.owner();
        let transfers = target.transfers_priority();

        if let Some(state) = self.threads.get_mut(&next) {
            if state.waiting_on == Some(queue) {
                state.waiting_on = None;
            }
        }
        log::trace!("sched: {} selected from {}", next, queue);

        if transfers {
            if let Some(owner) = owner {
                invalidate_chain(&mut self.threads, &self.queues, owner)?;
            }
        }
        Ok(Some(next))
    }

    /// End the lifetime of `queue`
    ///
    /// Waiters are detached without being selected and the owner loses the
    /// queue.
    pub fn destroy_queue(&mut self, queue: QueueId) -> SchedResult<()> {
        let mut target = self.queues.remove(&queue).ok_or(Violation::UnknownQueue(queue))?;

        for waiter in target.drain() {
            if let Some(state) = self.threads.get_mut(&waiter) {
                if state.waiting_on == Some(queue) {
                    state.waiting_on = None;
                }
            }
        }
        if let Some(owner) = target.owner() {
            if let Some(state) = self.threads.get_mut(&owner) {
                state.owned.remove(&queue);
            }
            if target.transfers_priority() {
                invalidate_chain(&mut self.threads, &self.queues, owner)?;
            }
        }
        log::trace!("sched: {} destroyed", queue);
        Ok(())
    }

    /// Drop the scheduling state of an exiting thread
    ///
    /// The thread leaves the queue it waits on and every queue it owns is left
    /// without an owner.
    pub fn remove_thread(&mut self, thread: ThreadHandle) -> SchedResult<()> {
        let Some(state) = self.threads.remove(&thread) else {
            return Ok(());
        };

        if let Some(waiting_on) = state.waiting_on {
            if let Some(queue) = self.queues.get_mut(&waiting_on) {
                queue.remove(thread);
                if let Some(owner) = queue.owner().filter(|_| queue.transfers_priority()) {
                    invalidate_chain(&mut self.threads, &self.queues, owner)?;
                }
            }
        }
        for owned in state.owned {
            if let Some(queue) = self.queues.get_mut(&owned) {
                if queue.owner() == Some(thread) {
                    queue.set_owner(None);
                }
            }
        }
        log::trace!("sched: {} removed", thread);
        Ok(())
    }

    /// Log every queue with its owner and waiters in selection order
    pub fn dump(&mut self) -> SchedResult<()> {
        let ids: Vec<QueueId> = self.queues.keys().copied().collect();
        for id in ids {
            let order = self.waiters(id)?;
            let queue = self.queue(id)?;
            log::debug!(
                "sched: {} transfer={} owner={:?} waiters={:?}",
                id,
                queue.transfers_priority(),
                queue.owner(),
                order
            );
        }
        Ok(())
    }
}

impl<S: SequenceSource> Scheduler for PriorityScheduler<S> {
    fn create_queue(&mut self, transfer_priority: bool) -> QueueId {
        let id = QueueId::from_raw(self.next_queue_id);
        self.next_queue_id += 1;
        self.queues
            .insert(id, ResourceQueue::new(id, QueueFlags::from_transfer(transfer_priority)));
        id
    }

    fn priority(&mut self, thread: ThreadHandle) -> Priority {
        state_mut(&mut self.threads, thread).base
    }

    fn effective_priority(&mut self, thread: ThreadHandle) -> SchedResult<Priority> {
        donation::effective_priority(&mut self.threads, &self.queues, thread)
    }

    fn set_priority(&mut self, thread: ThreadHandle, priority: Priority) -> SchedResult<()> {
        check_priority(priority)?;

        let state = state_mut(&mut self.threads, thread);
        if state.base == priority {
            return Ok(());
        }
        log::debug!("sched: {} priority {} -> {}", thread, state.base, priority);
        state.base = priority;

        invalidate_chain(&mut self.threads, &self.queues, thread)
    }
}
