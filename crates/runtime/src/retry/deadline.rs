// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::{Duration, Instant};

/// A point in time after which a retry sequence gives up.
///
/// ```ignore
/// let deadline = Deadline::after(Duration::from_secs(5));
/// strategy.run_with_retry_until(op, deadline.terminate_condition());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
	at: Instant,
}

impl Deadline {
	pub fn after(timeout: Duration) -> Self {
		Self {
			at: Instant::now() + timeout,
		}
	}

	pub fn at(at: Instant) -> Self {
		Self {
			at,
		}
	}

	pub fn is_expired(&self) -> bool {
		Instant::now() >= self.at
	}

	pub fn remaining(&self) -> Duration {
		self.at.saturating_duration_since(Instant::now())
	}

	/// A terminate condition that holds once the deadline passed.
	pub fn terminate_condition<A: 'static>(self) -> impl FnMut(&mut A) -> bool + Send + 'static {
		move |_: &mut A| self.is_expired()
	}

	/// A terminate condition that holds once the deadline passed or
	/// `condition` holds.
	pub fn or<A, T>(self, mut condition: T) -> impl FnMut(&mut A) -> bool + Send + 'static
	where
		A: 'static,
		T: FnMut(&mut A) -> bool + Send + 'static,
	{
		move |actor: &mut A| self.is_expired() || condition(actor)
	}
}
