// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Donation Integration Tests
//!
//! Priority accessors, transitive donation and queue selection through the
//! public scheduler API.

use alloc::vec::Vec;

use crate::error::{SchedError, Violation};
use crate::sched::{
    PriorityScheduler, Scheduler, ThreadHandle, PRIORITY_DEFAULT, PRIORITY_MAXIMUM, PRIORITY_MINIMUM,
};

fn t(raw: u64) -> ThreadHandle {
    ThreadHandle::from_raw(raw)
}

/// Base priority is reported, not the donated one
#[test]
fn test_get_priority_returns_base() {
    let mut sched = PriorityScheduler::new();
    let q = sched.create_queue(true);
    sched.acquire(q, t(1)).unwrap();
    sched.set_priority(t(2), 6).unwrap();
    sched.wait_for_access(q, t(2)).unwrap();

    for priority in [3, 0, 5, 2] {
        sched.set_priority(t(1), priority).unwrap();
        assert_eq!(sched.priority(t(1)), priority);
        assert_eq!(sched.effective_priority(t(1)), Ok(priority.max(6)));
    }
}

/// Effective priority never drops below base across a mixed workload
#[test]
fn test_effective_never_below_base() {
    let mut sched = PriorityScheduler::new();
    let queues: Vec<_> = (0..3).map(|_| sched.create_queue(true)).collect();
    let threads: Vec<_> = (1..=6).map(t).collect();

    // Small LCG so the workload is deterministic
    let mut seed: u64 = 0x2545_f491;
    let mut next = move |bound: u64| {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (seed >> 33) % bound
    };

    for _ in 0..500 {
        let thread = threads[next(threads.len() as u64) as usize];
        let queue = queues[next(queues.len() as u64) as usize];
        // Errors are expected for illegal moves; they must leave state intact
        let _ = match next(5) {
            0 => sched.set_priority(thread, next(8) as i32),
            1 => sched.wait_for_access(queue, thread),
            2 => sched.acquire(queue, thread),
            3 => sched.next_thread(queue).map(|_| ()),
            _ => sched.release(queue, thread),
        };
        for &thread in &threads {
            let base = sched.priority(thread);
            let effective = sched.effective_priority(thread).unwrap();
            assert!(effective >= base, "{} effective {} < base {}", thread, effective, base);
        }
    }
}

/// T1 waits on Q1 (owned by T2), T2 waits on Q2 (owned by T3)
#[test]
fn test_donation_is_transitive() {
    let mut sched = PriorityScheduler::new();
    let q1 = sched.create_queue(true);
    let q2 = sched.create_queue(true);
    sched.set_priority(t(1), 2).unwrap();
    sched.set_priority(t(2), 2).unwrap();
    sched.set_priority(t(3), 4).unwrap();

    sched.acquire(q1, t(2)).unwrap();
    sched.acquire(q2, t(3)).unwrap();
    sched.wait_for_access(q1, t(1)).unwrap();
    sched.wait_for_access(q2, t(2)).unwrap();
    assert_eq!(sched.effective_priority(t(3)), Ok(4));

    sched.set_priority(t(1), 6).unwrap();
    assert_eq!(sched.effective_priority(t(3)), sched.effective_priority(t(1)));
    assert_eq!(sched.effective_priority(t(3)), Ok(6));
    assert_eq!(sched.effective_priority(t(2)), Ok(6));

    // Lowering the donor lowers the whole chain again
    sched.set_priority(t(1), 1).unwrap();
    assert_eq!(sched.effective_priority(t(2)), Ok(2));
    assert_eq!(sched.effective_priority(t(3)), Ok(4));
}

/// Waiters on a plain queue never raise its owner
#[test]
fn test_no_donation_across_plain_queue() {
    let mut sched = PriorityScheduler::new();
    let q = sched.create_queue(false);
    sched.set_priority(t(1), PRIORITY_MINIMUM).unwrap();
    sched.acquire(q, t(1)).unwrap();
    for raw in 2..6 {
        sched.set_priority(t(raw), PRIORITY_MAXIMUM).unwrap();
        sched.wait_for_access(q, t(raw)).unwrap();
        assert_eq!(sched.effective_priority(t(1)), Ok(PRIORITY_MINIMUM));
    }
}

#[test]
fn test_next_thread_on_empty_queue() {
    let mut sched = PriorityScheduler::new();
    let q = sched.create_queue(true);
    sched.acquire(q, t(1)).unwrap();
    assert_eq!(sched.next_thread(q), Ok(None));
    assert_eq!(sched.queue_len(q), Ok(0));
    assert_eq!(sched.owner(q), Ok(Some(t(1))));
}

/// Equal priorities are served oldest first
#[test]
fn test_fifo_tie_break() {
    let mut sched = PriorityScheduler::new();
    let q = sched.create_queue(true);
    let (a, b, c) = (t(10), t(11), t(12));
    for thread in [a, b, c] {
        sched.wait_for_access(q, thread).unwrap();
    }
    assert_eq!(sched.next_thread(q), Ok(Some(a)));
    assert_eq!(sched.next_thread(q), Ok(Some(b)));
    assert_eq!(sched.next_thread(q), Ok(Some(c)));
    assert_eq!(sched.next_thread(q), Ok(None));
}

/// Selection uses effective priority at selection time
#[test]
fn test_selection_sees_late_donation() {
    let mut sched = PriorityScheduler::new();
    let run = sched.create_queue(false);
    let lock = sched.create_queue(true);
    sched.set_priority(t(1), 1).unwrap();
    sched.set_priority(t(2), 3).unwrap();
    sched.wait_for_access(run, t(1)).unwrap();
    sched.wait_for_access(run, t(2)).unwrap();
    assert_eq!(sched.peek_next(run), Ok(Some(t(2))));

    // T1 already sits in the run queue when it starts receiving a donation
    sched.acquire(lock, t(1)).unwrap();
    sched.set_priority(t(3), 5).unwrap();
    sched.wait_for_access(lock, t(3)).unwrap();
    assert_eq!(sched.next_thread(run), Ok(Some(t(1))));
}

#[test]
fn test_self_deadlock_guard() {
    let mut sched = PriorityScheduler::new();
    let q = sched.create_queue(true);
    sched.acquire(q, t(1)).unwrap();
    let err = sched.wait_for_access(q, t(1)).unwrap_err();
    assert_eq!(err, SchedError::InvariantViolation(Violation::SelfDeadlock { thread: t(1), queue: q }));
    assert!(err.is_fatal());
    assert_eq!(sched.queue_len(q), Ok(0));
}

/// Closing a donation cycle is rejected before anything changes
#[test]
fn test_cycle_rejected() {
    let mut sched = PriorityScheduler::new();
    let q1 = sched.create_queue(true);
    let q2 = sched.create_queue(true);
    sched.acquire(q1, t(1)).unwrap();
    sched.acquire(q2, t(2)).unwrap();
    sched.wait_for_access(q2, t(1)).unwrap();

    let err = sched.wait_for_access(q1, t(2)).unwrap_err();
    assert_eq!(err, SchedError::InvariantViolation(Violation::DonationCycle(t(2))));
    assert_eq!(sched.queue_len(q1), Ok(0));
    assert_eq!(sched.waiting_on(t(2)), None);
    assert_eq!(sched.effective_priority(t(2)), Ok(PRIORITY_DEFAULT));
}

/// Long chains are walked without recursion
#[test]
fn test_long_chain() {
    let mut sched = PriorityScheduler::new();
    const LEN: u64 = 2_000;
    let queues: Vec<_> = (0..LEN).map(|_| sched.create_queue(true)).collect();
    // Thread i owns queue i and waits on queue i + 1
    for i in 0..LEN {
        sched.acquire(queues[i as usize], t(i)).unwrap();
    }
    for i in 0..LEN - 1 {
        sched.wait_for_access(queues[i as usize + 1], t(i)).unwrap();
    }
    assert_eq!(sched.effective_priority(t(LEN - 1)), Ok(PRIORITY_DEFAULT));

    sched.set_priority(t(0), PRIORITY_MAXIMUM).unwrap();
    assert_eq!(sched.effective_priority(t(LEN - 1)), Ok(PRIORITY_MAXIMUM));
    assert_eq!(sched.effective_priority(t(LEN / 2)), Ok(PRIORITY_MAXIMUM));
}

/// Low owns Q, High waits, then High is handed Q
#[test]
fn test_end_to_end_handoff() {
    let mut sched = PriorityScheduler::new();
    let q = sched.create_queue(true);
    let (low, high) = (t(1), t(2));
    sched.set_priority(low, 1).unwrap();
    sched.set_priority(high, 7).unwrap();
    sched.acquire(q, low).unwrap();

    sched.wait_for_access(q, high).unwrap();
    assert_eq!(sched.effective_priority(low), Ok(7));

    assert_eq!(sched.next_thread(q), Ok(Some(high)));
    sched.acquire(q, high).unwrap();
    assert_eq!(sched.effective_priority(low), Ok(1));
    assert_eq!(sched.effective_priority(high), Ok(7));
}
