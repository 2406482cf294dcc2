// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Polling waits.
//!
//! Actor jobs run on worker threads, so tests observe their effects by
//! polling instead of sleeping for a fixed time.

use std::{
	thread,
	time::{Duration, Instant},
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polls `probe` until it yields a value.
///
/// # Panics
/// When `timeout` elapses first, with `message` in the panic.
pub fn wait_for_value_within<T, F>(probe: F, timeout: Duration, poll_interval: Duration, message: &str) -> T
where
	F: Fn() -> Option<T>,
{
	let deadline = Instant::now() + timeout;
	loop {
		if let Some(value) = probe() {
			return value;
		}
		if Instant::now() >= deadline {
			panic!("Timeout after {:?}: {}", timeout, message);
		}
		thread::sleep(poll_interval);
	}
}

pub fn wait_for_condition<F>(condition: F, timeout: Duration, poll_interval: Duration, message: &str)
where
	F: Fn() -> bool,
{
	wait_for_value_within(|| condition().then_some(()), timeout, poll_interval, message)
}

pub fn wait_for<F>(condition: F, message: &str)
where
	F: Fn() -> bool,
{
	wait_for_condition(condition, DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL, message);
}

/// Polls `probe` with the default timeout and returns its first value.
pub fn wait_for_value<T, F>(probe: F, message: &str) -> T
where
	F: Fn() -> Option<T>,
{
	wait_for_value_within(probe, DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL, message)
}

#[cfg(test)]
mod tests {
	use std::sync::{
		Arc,
		atomic::{AtomicU32, Ordering},
	};

	use super::*;

	#[test]
	fn test_condition_already_true() {
		wait_for(|| true, "never waits");
	}

	#[test]
	fn test_condition_set_by_other_thread() {
		let flag = Arc::new(AtomicU32::new(0));
		let writer = flag.clone();
		thread::spawn(move || {
			thread::sleep(Duration::from_millis(20));
			writer.store(5, Ordering::SeqCst);
		});

		wait_for(|| flag.load(Ordering::SeqCst) == 5, "flag was not set");
	}

	#[test]
	fn test_value_is_returned() {
		let polls = AtomicU32::new(0);
		let value = wait_for_value(
			|| {
				let n = polls.fetch_add(1, Ordering::SeqCst);
				(n >= 3).then_some(n * 10)
			},
			"value never appeared",
		);
		assert_eq!(value, 30);
	}

	#[test]
	#[should_panic(expected = "Timeout after")]
	fn test_timeout_panics() {
		wait_for_condition(|| false, Duration::from_millis(10), Duration::from_millis(1), "never true");
	}
}
