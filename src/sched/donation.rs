// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Priority donation
//!
//! The effective priority of a thread is the larger of its base priority and
//! the effective priority of every thread waiting on a transferring queue it
//! owns:
//!
//! ```text
//! effective(T) = max(base(T), max { effective(W) : W waits on Q, T owns Q, Q transfers })
//! ```
//!
//! Donation edges form a forest: a thread waits on at most one queue and a
//! queue has at most one owner, so each thread donates to at most one other.
//! Both walks below keep a visited set and report a revisit as a donation
//! cycle instead of looping.
//!
//! Effective priorities are cached per thread. A thread's cache is only valid
//! while every cache below it is valid, so invalidation always walks the whole
//! chain of owners above the changed thread.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec;
use alloc::vec::Vec;

use crate::error::{SchedResult, Violation};
use super::queue::{QueueId, ResourceQueue, WaiterKey};
use super::scheduler::{Priority, PRIORITY_MINIMUM};
use super::thread::{ThreadHandle, ThreadState};

/// Thread arena, keyed by host identity
pub(crate) type ThreadTable = BTreeMap<ThreadHandle, ThreadState>;

/// Queue arena
pub(crate) type QueueTable = BTreeMap<QueueId, ResourceQueue>;

/// Get the state of `thread`, creating it on first use
pub(crate) fn state_mut(threads: &mut ThreadTable, thread: ThreadHandle) -> &mut ThreadState {
    threads.entry(thread).or_insert_with(|| ThreadState::new(thread))
}

/// Threads donating directly to `thread`
fn donors(threads: &ThreadTable, queues: &QueueTable, thread: ThreadHandle) -> Vec<ThreadHandle> {
    let Some(state) = threads.get(&thread) else {
        return Vec::new();
    };
    state
        .owned
        .iter()
        .filter_map(|id| queues.get(id))
        .filter(|queue| queue.transfers_priority())
        .flat_map(|queue| queue.waiters().iter().copied())
        .collect()
}

/// The thread `thread` donates to, if any
fn donee(threads: &ThreadTable, queues: &QueueTable, thread: ThreadHandle) -> Option<ThreadHandle> {
    let waiting_on = threads.get(&thread)?.waiting_on?;
    let queue = queues.get(&waiting_on)?;
    if !queue.transfers_priority() {
        return None;
    }
    queue.owner()
}

fn cached(threads: &ThreadTable, thread: ThreadHandle) -> Option<Priority> {
    threads.get(&thread).and_then(|state| state.effective)
}

enum Frame {
    /// Visit a thread's donors
    Enter(ThreadHandle),
    /// All donors are cached; compute this thread
    Exit(ThreadHandle),
}

/// Compute (or fetch the cached) effective priority of `root`
pub(crate) fn effective_priority(
    threads: &mut ThreadTable,
    queues: &QueueTable,
    root: ThreadHandle,
) -> SchedResult<Priority> {
    if let Some(priority) = cached(threads, root) {
        return Ok(priority);
    }
    state_mut(threads, root);

    let mut visited = BTreeSet::new();
    visited.insert(root);
    let mut stack = vec![Frame::Enter(root)];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(thread) => {
                stack.push(Frame::Exit(thread));
                for donor in donors(threads, queues, thread) {
                    if !visited.insert(donor) {
                        return Err(Violation::DonationCycle(donor).into());
                    }
                    if cached(threads, donor).is_none() {
                        stack.push(Frame::Enter(donor));
                    }
                }
            }
            Frame::Exit(thread) => {
                // Donors were pushed after this frame, so they are already cached.
                let donated = donors(threads, queues, thread)
                    .into_iter()
                    .filter_map(|donor| cached(threads, donor))
                    .max()
                    .unwrap_or(PRIORITY_MINIMUM);
                let state = state_mut(threads, thread);
                state.effective = Some(state.base.max(donated));
            }
        }
    }

    let priority = cached(threads, root).unwrap_or(PRIORITY_MINIMUM);
    log::trace!("sched: effective({}) = {}", root, priority);
    Ok(priority)
}

/// Selection key of a waiter
pub(crate) fn waiter_key(
    threads: &mut ThreadTable,
    queues: &QueueTable,
    thread: ThreadHandle,
) -> SchedResult<WaiterKey> {
    let priority = effective_priority(threads, queues, thread)?;
    let sequence = state_mut(threads, thread).enqueue_sequence;
    Ok((priority, sequence))
}

/// Drop the cached effective priority of `start` and of every thread it
/// donates to, directly or transitively
pub(crate) fn invalidate_chain(
    threads: &mut ThreadTable,
    queues: &QueueTable,
    start: ThreadHandle,
) -> SchedResult<()> {
    let mut visited = BTreeSet::new();
    let mut current = Some(start);
    while let Some(thread) = current {
        if !visited.insert(thread) {
            return Err(Violation::DonationCycle(thread).into());
        }
        match threads.get_mut(&thread) {
            Some(state) => state.invalidate(),
            None => break,
        }
        current = donee(threads, queues, thread);
    }
    Ok(())
}

/// Walk from `start` up through the threads it donates to until `hit`
/// matches; an already existing cycle also counts as a match
fn climbs_to<F>(threads: &ThreadTable, queues: &QueueTable, start: Option<ThreadHandle>, mut hit: F) -> bool
where
    F: FnMut(ThreadHandle) -> bool,
{
    let mut visited = BTreeSet::new();
    let mut current = start;
    while let Some(thread) = current {
        if hit(thread) || !visited.insert(thread) {
            return true;
        }
        current = donee(threads, queues, thread);
    }
    false
}

/// Check whether `waiter` waiting on `queue` would make it donate to itself
pub(crate) fn wait_closes_cycle(
    threads: &ThreadTable,
    queues: &QueueTable,
    waiter: ThreadHandle,
    queue: &ResourceQueue,
) -> bool {
    queue.transfers_priority() && climbs_to(threads, queues, queue.owner(), |thread| thread == waiter)
}

/// Check whether `owner` acquiring `queue` would make one of the queue's
/// waiters donate to itself
pub(crate) fn acquire_closes_cycle(
    threads: &ThreadTable,
    queues: &QueueTable,
    owner: ThreadHandle,
    queue: &ResourceQueue,
) -> bool {
    if !queue.transfers_priority() {
        return false;
    }
    // An owner leaving this very queue stops donating upward
    if threads.get(&owner).and_then(|state| state.waiting_on) == Some(queue.id()) {
        return false;
    }
    climbs_to(threads, queues, donee(threads, queues, owner), |thread| queue.contains(thread))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchedError;
    use crate::sched::queue::QueueFlags;

    fn t(raw: u64) -> ThreadHandle {
        ThreadHandle::from_raw(raw)
    }

    /// Build arenas by hand: `edges` are (waiter, queue, owner) on transferring queues
    fn arenas(bases: &[(u64, Priority)], edges: &[(u64, u64, u64)]) -> (ThreadTable, QueueTable) {
        let mut threads = ThreadTable::new();
        let mut queues = QueueTable::new();
        for &(raw, base) in bases {
            state_mut(&mut threads, t(raw)).base = base;
        }
        for &(waiter, q, owner) in edges {
            let id = QueueId::from_raw(q);
            let queue = queues
                .entry(id)
                .or_insert_with(|| ResourceQueue::new(id, QueueFlags::TRANSFER_PRIORITY));
            queue.push(t(waiter));
            queue.set_owner(Some(t(owner)));
            state_mut(&mut threads, t(waiter)).waiting_on = Some(id);
            state_mut(&mut threads, t(owner)).owned.insert(id);
        }
        (threads, queues)
    }

    #[test]
    fn test_effective_without_donors_is_base() {
        let (mut threads, queues) = arenas(&[(1, 4)], &[]);
        assert_eq!(effective_priority(&mut threads, &queues, t(1)), Ok(4));
    }

    #[test]
    fn test_effective_unknown_thread_is_default() {
        let (mut threads, queues) = arenas(&[], &[]);
        assert_eq!(
            effective_priority(&mut threads, &queues, t(9)),
            Ok(crate::sched::scheduler::PRIORITY_DEFAULT)
        );
        assert!(threads.contains_key(&t(9)));
    }

    #[test]
    fn test_effective_transitive_chain() {
        // T1 -> Q1 (owned by T2) -> Q2 (owned by T3)
        let (mut threads, queues) = arenas(&[(1, 6), (2, 2), (3, 3)], &[(1, 1, 2), (2, 2, 3)]);
        assert_eq!(effective_priority(&mut threads, &queues, t(3)), Ok(6));
        assert_eq!(cached(&threads, t(2)), Some(6));
        assert_eq!(cached(&threads, t(1)), Some(6));
    }

    #[test]
    fn test_effective_takes_max_of_waiters() {
        let (mut threads, queues) = arenas(&[(1, 2), (2, 5), (3, 0)], &[(1, 1, 3), (2, 1, 3)]);
        assert_eq!(effective_priority(&mut threads, &queues, t(3)), Ok(5));
    }

    #[test]
    fn test_non_transferring_queue_does_not_donate() {
        let (mut threads, mut queues) = arenas(&[(1, 7), (2, 1)], &[]);
        let id = QueueId::from_raw(1);
        let mut queue = ResourceQueue::new(id, QueueFlags::empty());
        queue.push(t(1));
        queue.set_owner(Some(t(2)));
        queues.insert(id, queue);
        state_mut(&mut threads, t(2)).owned.insert(id);
        assert_eq!(effective_priority(&mut threads, &queues, t(2)), Ok(1));
    }

    #[test]
    fn test_cycle_is_reported() {
        // T1 owns Q2 and waits on Q1; T2 owns Q1 and waits on Q2
        let (mut threads, queues) = arenas(&[(1, 1), (2, 1)], &[(1, 1, 2), (2, 2, 1)]);
        let err = effective_priority(&mut threads, &queues, t(1)).unwrap_err();
        assert!(matches!(err, SchedError::InvariantViolation(Violation::DonationCycle(_))));
        let err = invalidate_chain(&mut threads, &queues, t(1)).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalidate_walks_every_ancestor() {
        let (mut threads, queues) = arenas(&[(1, 6), (2, 2), (3, 3)], &[(1, 1, 2), (2, 2, 3)]);
        effective_priority(&mut threads, &queues, t(3)).unwrap();
        invalidate_chain(&mut threads, &queues, t(1)).unwrap();
        assert_eq!(cached(&threads, t(1)), None);
        assert_eq!(cached(&threads, t(2)), None);
        assert_eq!(cached(&threads, t(3)), None);
    }

    #[test]
    fn test_wait_closes_cycle() {
        let (threads, queues) = arenas(&[(1, 1), (2, 1), (3, 1)], &[(1, 1, 2), (2, 2, 3)]);
        // T3 waiting on Q1 (owned by T2, which donates to T3) closes a cycle
        assert!(wait_closes_cycle(&threads, &queues, t(3), &queues[&QueueId::from_raw(1)]));
        // T4 waiting on Q1 does not
        assert!(!wait_closes_cycle(&threads, &queues, t(4), &queues[&QueueId::from_raw(1)]));
    }

    #[test]
    fn test_acquire_closes_cycle() {
        // T1 waits on Q1 (owned by T2); T2 waits on Q2 (owned by T3)
        let (threads, queues) = arenas(&[(1, 1), (2, 1), (3, 1)], &[(1, 1, 2), (2, 2, 3)]);
        let q1 = &queues[&QueueId::from_raw(1)];
        // T3 waits on nothing, so nothing above it can wait on Q1
        assert!(!acquire_closes_cycle(&threads, &queues, t(3), q1));
        // T2 taking the queue it waits on leaves that queue
        assert!(!acquire_closes_cycle(&threads, &queues, t(2), &queues[&QueueId::from_raw(2)]));
        // T1 taking Q2 would make T2 (waiter of Q2) donate to T1, which donates to T2
        assert!(acquire_closes_cycle(&threads, &queues, t(1), &queues[&QueueId::from_raw(2)]));
    }
}
