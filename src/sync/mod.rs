// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Synchronization Clients
//!
//! This module connects the scheduler core to the rest of the kernel: the
//! atomic section every scheduler call runs under, the kernel-wide scheduler
//! instance, and the three users of resource queues.
//!
//! # Primitives
//!
//! - **AtomicSection**: host seam that disables and restores preemption
//! - **DonatingLock**: mutual exclusion with priority donation to the holder
//! - **JoinPoint**: wait for a thread to finish, donating to it meanwhile
//! - **RunQueue**: ready threads of one CPU, no donation

pub mod section;
pub mod global;
pub mod lock;
pub mod join;
pub mod run_queue;

// Re-exports
pub use section::{AtomicSection, SectionGuard, NoopSection, KernelSection, without_preemption};
#[cfg(all(feature = "amd64", target_arch = "x86_64"))]
pub use section::InterruptSection;
pub use global::{SCHEDULER, with_scheduler, with_scheduler_checked};
pub use lock::{DonatingLock, LockAcquire};
pub use join::JoinPoint;
pub use run_queue::RunQueue;
