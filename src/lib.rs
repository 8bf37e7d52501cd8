// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! # Rustux Sched - Priority-Donation Thread Scheduler
//!
//! The scheduler core of the Rustux kernel decides which thread runs next
//! when threads contend for locks, join targets and the CPU. It bounds
//! priority inversion by donating the priority of blocked threads to the
//! thread holding what they wait for, transitively along ownership chains.
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── sched/             # Scheduler core
//! │   ├── thread.rs      # ThreadHandle, ThreadState
//! │   ├── queue.rs       # ResourceQueue and the selection rule
//! │   ├── donation.rs    # Effective-priority computation
//! │   ├── scheduler.rs   # Scheduler policy trait, priority range
//! │   └── priority.rs    # PriorityScheduler
//! ├── sync/              # Atomic section, global instance, queue clients
//! ├── error.rs           # Error kinds
//! └── lib.rs             # This file
//! ```
//!
//! ## Concurrency
//!
//! The core does no locking of its own. Every call must happen inside the
//! kernel's atomic section (preemption disabled); [`sync::with_scheduler`]
//! enters it and locks the kernel-wide instance.
//!
//! ## Using the Scheduler
//!
//! ```ignore
//! use rustux_sched::sched::{PriorityScheduler, Scheduler};
//! use rustux_sched::sync::{DonatingLock, LockAcquire};
//!
//! let mut sched = PriorityScheduler::new();
//! let lock = DonatingLock::new(&mut sched);
//! lock.acquire(&mut sched, low)?;
//! sched.set_priority(high, 7)?;
//! assert_eq!(lock.acquire(&mut sched, high)?, LockAcquire::MustBlock);
//! assert_eq!(sched.effective_priority(low)?, 7);
//! ```

#![cfg_attr(not(test), no_std)]

// Alloc crate for heap allocations
extern crate alloc;

// Error kinds
pub mod error;

// Scheduler core
pub mod sched;

// Atomic section and queue clients
pub mod sync;

// Re-export error types
pub use error::{SchedError, SchedResult, Violation};

// Re-export scheduler types
pub use sched::{
    ThreadHandle,
    ThreadState,
    BlockState,
    QueueId,
    QueueFlags,
    ResourceQueue,
    Scheduler,
    SequenceSource,
    MonotonicCounter,
    PriorityScheduler,
    Priority,
    PRIORITY_MINIMUM,
    PRIORITY_MAXIMUM,
    PRIORITY_DEFAULT,
};

// Re-export synchronization types
pub use sync::{
    AtomicSection, SectionGuard, NoopSection, KernelSection,
    DonatingLock, LockAcquire,
    JoinPoint,
    RunQueue,
    SCHEDULER, with_scheduler, with_scheduler_checked,
};

// Integration tests (only compiled in test mode)
#[cfg(test)]
mod tests;
