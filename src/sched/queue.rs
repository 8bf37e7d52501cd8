// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Resource queues
//!
//! A resource queue guards one resource (a lock, a join point, the CPU run
//! queue): it keeps the threads waiting for the resource and, optionally, the
//! thread that currently owns it.
//!
//! # Ordering
//!
//! Waiters are kept in arrival order and never sorted in place. Effective
//! priorities change while threads sit in the queue, so the order is computed
//! at selection time:
//!
//! - **Priority-ordered**: highest effective priority first
//! - **Fair ordering**: lowest enqueue sequence first within the same priority

use alloc::vec::Vec;
use core::fmt;

use bitflags::bitflags;

use crate::error::SchedResult;
use super::scheduler::Priority;
use super::thread::ThreadHandle;

/// Identity of a resource queue in the scheduler's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueId(u64);

impl QueueId {
    /// Wrap a raw queue id
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw queue id
    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0)
    }
}

bitflags! {
    /// Queue behaviour, fixed at creation
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct QueueFlags: u32 {
        /// Waiters donate their effective priority to the owner
        const TRANSFER_PRIORITY = 1 << 0;
    }
}

impl QueueFlags {
    /// Flags for `create_queue(transfer_priority)`
    pub fn from_transfer(transfer_priority: bool) -> Self {
        if transfer_priority {
            Self::TRANSFER_PRIORITY
        } else {
            Self::empty()
        }
    }
}

/// Selection key of a waiter: effective priority and enqueue sequence
pub type WaiterKey = (Priority, u64);

/// A resource queue
#[derive(Debug)]
pub struct ResourceQueue {
    id: QueueId,
    flags: QueueFlags,
    /// Waiting threads in arrival order
    waiters: Vec<ThreadHandle>,
    owner: Option<ThreadHandle>,
}

impl ResourceQueue {
    /// Create an empty, unowned queue
    pub fn new(id: QueueId, flags: QueueFlags) -> Self {
        Self {
            id,
            flags,
            waiters: Vec::new(),
            owner: None,
        }
    }

    /// Queue id
    pub fn id(&self) -> QueueId {
        self.id
    }

    /// Queue flags
    pub fn flags(&self) -> QueueFlags {
        self.flags
    }

    /// Whether ownership of this queue participates in donation
    pub fn transfers_priority(&self) -> bool {
        self.flags.contains(QueueFlags::TRANSFER_PRIORITY)
    }

    /// Current owner
    pub fn owner(&self) -> Option<ThreadHandle> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Option<ThreadHandle>) {
        self.owner = owner;
    }

    /// Waiting threads in arrival order
    pub fn waiters(&self) -> &[ThreadHandle] {
        &self.waiters
    }

    /// Number of waiting threads
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Check if no thread is waiting
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Check if `thread` is waiting on this queue
    pub fn contains(&self, thread: ThreadHandle) -> bool {
        self.waiters.contains(&thread)
    }

    /// Append `thread` unless it is already waiting
    ///
    /// Returns `true` if the thread was added.
    pub(crate) fn push(&mut self, thread: ThreadHandle) -> bool {
        if self.contains(thread) {
            return false;
        }
        self.waiters.push(thread);
        true
    }

    /// Remove `thread` from the waiters
    ///
    /// Returns `true` if the thread was waiting.
    pub(crate) fn remove(&mut self, thread: ThreadHandle) -> bool {
        match self.waiters.iter().position(|&t| t == thread) {
            Some(index) => {
                self.waiters.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every waiter, returning them in arrival order
    pub(crate) fn drain(&mut self) -> Vec<ThreadHandle> {
        core::mem::take(&mut self.waiters)
    }

    /// Pick the waiter `next_thread` would return, without removing it
    ///
    /// `key` supplies the current effective priority and enqueue sequence of a
    /// waiter. The highest priority wins; among equals the lowest sequence wins.
    pub fn select<F>(&self, mut key: F) -> SchedResult<Option<ThreadHandle>>
    where
        F: FnMut(ThreadHandle) -> SchedResult<WaiterKey>,
    {
        let mut best: Option<(ThreadHandle, WaiterKey)> = None;
        for &thread in &self.waiters {
            let candidate = key(thread)?;
            let better = match best {
                None => true,
                Some((_, (priority, sequence))) => {
                    candidate.0 > priority || (candidate.0 == priority && candidate.1 < sequence)
                }
            };
            if better {
                best = Some((thread, candidate));
            }
        }
        Ok(best.map(|(thread, _)| thread))
    }

    /// Waiters in the order successive `next_thread` calls would return them
    pub fn ordered<F>(&self, mut key: F) -> SchedResult<Vec<ThreadHandle>>
    where
        F: FnMut(ThreadHandle) -> SchedResult<WaiterKey>,
    {
        let mut keyed = Vec::with_capacity(self.waiters.len());
        for &thread in &self.waiters {
            keyed.push((key(thread)?, thread));
        }
        keyed.sort_by(|(a, _), (b, _)| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        Ok(keyed.into_iter().map(|(_, thread)| thread).collect())
    }
}
