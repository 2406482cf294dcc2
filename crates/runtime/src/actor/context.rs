// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Execution context of the current thread.
//!
//! While a worker runs an actor's turn, the actor's id is stored in a
//! thread-local. This lets [`ActorControl::run`](crate::actor::ActorControl::run)
//! tell re-entrant submissions apart from external ones, and lets
//! [`ActorFuture::join`](crate::future::ActorFuture::join) refuse to block a
//! worker thread.

use std::{
	cell::Cell,
	sync::atomic::{AtomicU64, Ordering},
};

thread_local! {
	static CURRENT_ACTOR: Cell<u64> = const { Cell::new(0) };
}

static ACTOR_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_actor_id() -> u64 {
	ACTOR_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Returns `true` when called from inside a job of any actor.
pub fn is_actor_thread() -> bool {
	CURRENT_ACTOR.with(|current| current.get() != 0)
}

pub(crate) fn is_current_actor(id: u64) -> bool {
	CURRENT_ACTOR.with(|current| current.get() == id)
}

/// Marks the current thread as running the given actor until dropped.
pub(crate) struct ActorTurnGuard {
	previous: u64,
}

impl ActorTurnGuard {
	pub(crate) fn enter(id: u64) -> Self {
		let previous = CURRENT_ACTOR.with(|current| current.replace(id));
		Self {
			previous,
		}
	}
}

impl Drop for ActorTurnGuard {
	fn drop(&mut self) {
		CURRENT_ACTOR.with(|current| current.set(self.previous));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_guard_restores_previous() {
		assert!(!is_actor_thread());
		{
			let _outer = ActorTurnGuard::enter(7);
			assert!(is_current_actor(7));
			{
				let _inner = ActorTurnGuard::enter(9);
				assert!(is_current_actor(9));
			}
			assert!(is_current_actor(7));
		}
		assert!(!is_actor_thread());
	}
}
