// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel-wide scheduler instance
//!
//! The kernel keeps one [`PriorityScheduler`] for all of its threads. Access
//! always goes through the atomic section first, then the spin lock, so the
//! lock is never contended by an interrupt handler on the same CPU.
//!
//! # Usage
//!
//! ```ignore
//! let lock = with_scheduler(|sched| sched.create_queue(true));
//! let must_block = with_scheduler_checked(|sched| {
//!     sched.wait_for_access(lock, current)?;
//!     Ok(true)
//! })?;
//! ```

use spin::Mutex;

use crate::error::SchedResult;
use crate::sched::PriorityScheduler;
use super::section::{KernelSection, SectionGuard};

/// Global priority scheduler instance
pub static SCHEDULER: Mutex<PriorityScheduler> = Mutex::new(PriorityScheduler::new());

/// Run `f` on the kernel-wide scheduler inside the atomic section
pub fn with_scheduler<R>(f: impl FnOnce(&mut PriorityScheduler) -> R) -> R {
    let _section = SectionGuard::<KernelSection>::enter();
    let mut scheduler = SCHEDULER.lock();
    f(&mut *scheduler)
}

/// Like [`with_scheduler`], but an invariant violation halts the kernel
///
/// Range errors are handed back to the caller.
pub fn with_scheduler_checked<R>(
    f: impl FnOnce(&mut PriorityScheduler) -> SchedResult<R>,
) -> SchedResult<R> {
    match with_scheduler(f) {
        Err(err) if err.is_fatal() => panic!("sched: {}", err),
        result => result,
    }
}
