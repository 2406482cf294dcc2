// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Timers for delayed and periodic actor jobs.
//!
//! A single coordinator thread keeps pending timers in a deadline heap. When a
//! timer is due its callback runs on the coordinator, which only enqueues the
//! job into the owning actor. The job itself always runs on a worker.

use std::sync::{
	Arc,
	atomic::{AtomicBool, AtomicU64, Ordering},
};

pub(crate) mod scheduler;

pub(crate) use scheduler::TimerService;

/// Handle to a scheduled timer.
///
/// Cancelling before the timer fires prevents the job from running. For a
/// periodic job, cancelling while an invocation runs lets that invocation
/// finish but prevents all later ones.
#[derive(Clone)]
pub struct TimerHandle {
	id: u64,
	cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
	pub(crate) fn new() -> Self {
		Self {
			id: next_timer_id(),
			cancelled: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Cancel this timer.
	///
	/// Returns `true` if this call cancelled the timer, `false` if it was
	/// already cancelled.
	pub fn cancel(&self) -> bool {
		self.cancelled.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}

	pub fn id(&self) -> u64 {
		self.id
	}

	pub(crate) fn cancelled_flag(&self) -> Arc<AtomicBool> {
		self.cancelled.clone()
	}
}

impl std::fmt::Debug for TimerHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TimerHandle").field("id", &self.id).field("cancelled", &self.is_cancelled()).finish()
	}
}

static TIMER_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_timer_id() -> u64 {
	TIMER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}
