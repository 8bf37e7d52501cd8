// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Atomic section
//!
//! Every scheduler operation must run inside the kernel's atomic section:
//! preemption is off and nothing else can touch the scheduler until the
//! section is left. The scheduler never enters it by itself; the host does,
//! through an [`AtomicSection`] implementation.
//!
//! - [`InterruptSection`] masks interrupts on x86_64 (feature `amd64`)
//! - [`NoopSection`] only counts nesting, for hosted builds and tests

use core::marker::PhantomData;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Host primitive that disables and restores preemption
pub trait AtomicSection {
    /// Enter the section, returning the state to restore on exit
    fn disable() -> bool;

    /// Leave the section, restoring the state returned by `disable`
    fn restore(previous: bool);
}

/// RAII guard holding an atomic section
pub struct SectionGuard<A: AtomicSection> {
    previous: bool,
    _section: PhantomData<A>,
}

impl<A: AtomicSection> SectionGuard<A> {
    /// Enter the atomic section
    pub fn enter() -> Self {
        Self {
            previous: A::disable(),
            _section: PhantomData,
        }
    }
}

impl<A: AtomicSection> Drop for SectionGuard<A> {
    fn drop(&mut self) {
        A::restore(self.previous);
    }
}

/// Run `f` inside the atomic section
pub fn without_preemption<A: AtomicSection, R>(f: impl FnOnce() -> R) -> R {
    let _guard = SectionGuard::<A>::enter();
    f()
}

/// Nesting depth of the no-op section
static NOOP_DEPTH: AtomicUsize = AtomicUsize::new(0);

/// Atomic section for hosted builds
///
/// Single-threaded test harnesses and simulators have no preemption to turn
/// off; this section only tracks how deeply it is nested.
pub struct NoopSection;

impl NoopSection {
    /// Current nesting depth
    pub fn depth() -> usize {
        NOOP_DEPTH.load(Ordering::Relaxed)
    }
}

impl AtomicSection for NoopSection {
    fn disable() -> bool {
        NOOP_DEPTH.fetch_add(1, Ordering::Relaxed) == 0
    }

    fn restore(_previous: bool) {
        NOOP_DEPTH.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Atomic section backed by the x86_64 interrupt flag
#[cfg(all(feature = "amd64", target_arch = "x86_64"))]
pub struct InterruptSection;

#[cfg(all(feature = "amd64", target_arch = "x86_64"))]
impl AtomicSection for InterruptSection {
    fn disable() -> bool {
        use x86_64::instructions::interrupts;

        let enabled = interrupts::are_enabled();
        if enabled {
            interrupts::disable();
        }
        enabled
    }

    fn restore(previous: bool) {
        if previous {
            x86_64::instructions::interrupts::enable();
        }
    }
}

/// Section used by the kernel-wide scheduler
#[cfg(all(feature = "amd64", target_arch = "x86_64"))]
pub type KernelSection = InterruptSection;

/// Section used by the kernel-wide scheduler
#[cfg(not(all(feature = "amd64", target_arch = "x86_64")))]
pub type KernelSection = NoopSection;
