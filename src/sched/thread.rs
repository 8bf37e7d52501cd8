// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread identity and per-thread scheduling state
//!
//! [`ThreadHandle`] is the host kernel's opaque thread identity. It carries no
//! scheduling data; everything the donation scheduler knows about a thread lives
//! in a [`ThreadState`] owned by the scheduler's arena.

use alloc::collections::BTreeSet;
use core::fmt;

use super::queue::QueueId;
use super::scheduler::{Priority, PRIORITY_DEFAULT};

/// Opaque identity of a schedulable unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadHandle(u64);

impl ThreadHandle {
    /// Wrap a host thread id
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the host thread id
    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Allocate a fresh thread handle
///
/// Hosts that already number their threads can use [`ThreadHandle::from_raw`]
/// instead.
pub fn new_thread_handle() -> ThreadHandle {
    use core::sync::atomic::{AtomicU64, Ordering};

    static NEXT_THREAD_HANDLE: AtomicU64 = AtomicU64::new(1);

    ThreadHandle(NEXT_THREAD_HANDLE.fetch_add(1, Ordering::Relaxed))
}

/// Where a thread stands with respect to resource queues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// Not queued anywhere
    Unblocked,
    /// Queued on exactly one resource queue
    Blocked(QueueId),
}

/// Scheduling metadata for one thread
#[derive(Debug)]
pub struct ThreadState {
    pub(crate) handle: ThreadHandle,
    pub(crate) base: Priority,
    /// Cached effective priority; `None` once invalidated
    pub(crate) effective: Option<Priority>,
    /// Queues this thread owns (back-references into the queue arena)
    pub(crate) owned: BTreeSet<QueueId>,
    pub(crate) waiting_on: Option<QueueId>,
    /// Stamp taken from the sequence source on the most recent enqueue
    pub(crate) enqueue_sequence: u64,
}

impl ThreadState {
    /// Create the state of a thread seen for the first time
    pub(crate) fn new(handle: ThreadHandle) -> Self {
        Self {
            handle,
            base: PRIORITY_DEFAULT,
            effective: None,
            owned: BTreeSet::new(),
            waiting_on: None,
            enqueue_sequence: 0,
        }
    }

    /// The thread this state belongs to
    pub fn handle(&self) -> ThreadHandle {
        self.handle
    }

    /// Base priority, as last set
    pub fn base_priority(&self) -> Priority {
        self.base
    }

    /// Cached effective priority, if still valid
    pub fn cached_effective(&self) -> Option<Priority> {
        self.effective
    }

    /// Queues currently owned by this thread
    pub fn owned_queues(&self) -> impl Iterator<Item = QueueId> + '_ {
        self.owned.iter().copied()
    }

    /// Check whether the thread owns `queue`
    pub fn owns(&self, queue: QueueId) -> bool {
        self.owned.contains(&queue)
    }

    /// The queue this thread is waiting on, if any
    pub fn waiting_on(&self) -> Option<QueueId> {
        self.waiting_on
    }

    /// Sequence stamp of the most recent enqueue
    pub fn enqueue_sequence(&self) -> u64 {
        self.enqueue_sequence
    }

    /// Current position in the wait/acquire state machine
    pub fn block_state(&self) -> BlockState {
        match self.waiting_on {
            Some(queue) => BlockState::Blocked(queue),
            None => BlockState::Unblocked,
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.effective = None;
    }
}
