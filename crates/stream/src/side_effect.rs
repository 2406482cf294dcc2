// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Deferred side effects of record processing.

use std::{
	fmt::{Debug, Formatter},
	panic::{self, AssertUnwindSafe},
};

use tracing::warn;

/// A side effect. Returns `true` once it succeeded.
pub type SideEffect = Box<dyn FnMut() -> bool + Send>;

/// Side effects collected while processing a command.
///
/// The queue is flushed only after the processing transaction committed. A
/// flush runs every pending effect once and empties the slot of each effect
/// that succeeded, so a later flush only runs the effects that failed.
#[derive(Default)]
pub struct SideEffectQueue {
	effects: Vec<Option<SideEffect>>,
}

impl SideEffectQueue {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add<F>(&mut self, effect: F)
	where
		F: FnMut() -> bool + Send + 'static,
	{
		self.effects.push(Some(Box::new(effect)));
	}

	/// Runs every pending effect once.
	///
	/// Returns `true` if all of them succeeded, in which case the queue is
	/// cleared. A panicking effect counts as failed.
	pub fn flush(&mut self) -> bool {
		let mut all_succeeded = true;

		for slot in self.effects.iter_mut() {
			let Some(effect) = slot.as_mut() else {
				continue;
			};
			match panic::catch_unwind(AssertUnwindSafe(|| effect())) {
				Ok(true) => *slot = None,
				Ok(false) => all_succeeded = false,
				Err(_) => {
					warn!("side effect panicked");
					all_succeeded = false;
				}
			}
		}

		if all_succeeded {
			self.effects.clear();
		}
		all_succeeded
	}

	pub fn clear(&mut self) {
		self.effects.clear();
	}

	/// Number of effects not yet succeeded.
	pub fn pending(&self) -> usize {
		self.effects.iter().filter(|slot| slot.is_some()).count()
	}

	pub fn is_empty(&self) -> bool {
		self.pending() == 0
	}
}

impl Debug for SideEffectQueue {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SideEffectQueue").field("pending", &self.pending()).finish()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	};

	use strata_testing::recorder::{InvocationCounter, Recorder};

	use super::*;

	#[test]
	fn test_empty_queue_flushes() {
		let mut queue = SideEffectQueue::new();
		assert!(queue.flush());
		assert!(queue.is_empty());
	}

	#[test]
	fn test_partial_flush_reruns_only_failed_effects() {
		let mut queue = SideEffectQueue::new();
		let calls = Recorder::new();
		let healthy = Arc::new(AtomicBool::new(false));

		for name in ["first", "second", "third"] {
			let calls = calls.clone();
			let healthy = healthy.clone();
			queue.add(move || {
				calls.record(name);
				name != "second" || healthy.load(Ordering::SeqCst)
			});
		}

		assert!(!queue.flush());
		assert_eq!(calls.entries(), vec!["first", "second", "third"]);
		assert_eq!(queue.pending(), 1);

		calls.clear();
		assert!(!queue.flush());
		assert_eq!(calls.entries(), vec!["second"]);

		healthy.store(true, Ordering::SeqCst);
		calls.clear();
		assert!(queue.flush());
		assert_eq!(calls.entries(), vec!["second"]);
		assert!(queue.is_empty());
	}

	#[test]
	fn test_panicking_effect_is_retried() {
		let mut queue = SideEffectQueue::new();
		let calls = InvocationCounter::new();
		let counter = calls.clone();
		queue.add(move || {
			if counter.invoke() == 1 {
				panic!("transient");
			}
			true
		});

		assert!(!queue.flush());
		assert!(queue.flush());
		assert_eq!(calls.count(), 2);
	}

	#[test]
	fn test_clear_drops_effects() {
		let mut queue = SideEffectQueue::new();
		let calls = InvocationCounter::new();
		let counter = calls.clone();
		queue.add(move || {
			counter.invoke();
			false
		});

		queue.clear();
		assert!(queue.flush());
		assert_eq!(calls.count(), 0);
	}
}
