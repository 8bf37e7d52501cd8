// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduler core
//!
//! This module provides the priority-donation scheduler: resource queues,
//! per-thread scheduling state and the donation rule that derives effective
//! priorities from queue ownership.
//!
//! # Example
//! ```ignore
//! use rustux_sched::sched::{PriorityScheduler, Scheduler};
//!
//! let mut scheduler = PriorityScheduler::new();
//! let lock = scheduler.create_queue(true);
//! scheduler.acquire(lock, holder)?;
//! scheduler.wait_for_access(lock, waiter)?;
//! let next = scheduler.next_thread(lock)?;
//! ```

pub mod thread;
pub mod queue;
pub mod scheduler;
pub mod priority;
mod donation;

pub use thread::{ThreadHandle, ThreadState, BlockState, new_thread_handle};
pub use queue::{QueueId, QueueFlags, ResourceQueue};
pub use scheduler::{
    Scheduler, SequenceSource, MonotonicCounter, Priority, check_priority,
    PRIORITY_MINIMUM, PRIORITY_MAXIMUM, PRIORITY_DEFAULT,
};
pub use priority::PriorityScheduler;
