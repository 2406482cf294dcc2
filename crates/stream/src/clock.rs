// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	sync::Arc,
	time::{Duration, SystemTime, UNIX_EPOCH},
};

use parking_lot::Mutex;

/// Source of record timestamps.
///
/// Timestamps are taken once, when a record is appended, and stored in the
/// record. Processors read the time from the command instead of asking the
/// clock, which keeps processing deterministic under replay.
pub trait StreamClock: Send + Sync {
	/// Milliseconds since the unix epoch.
	fn millis(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl StreamClock for SystemClock {
	fn millis(&self) -> u64 {
		SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
	}
}

#[derive(Debug, Clone, Copy)]
enum Modification {
	None,
	Pinned(u64),
	Offset(i64),
}

/// A clock that can be pinned to an instant or shifted by an offset.
///
/// Clones share the same modification.
#[derive(Debug, Clone)]
pub struct ControllableClock {
	modification: Arc<Mutex<Modification>>,
}

impl Default for ControllableClock {
	fn default() -> Self {
		Self::new()
	}
}

impl ControllableClock {
	pub fn new() -> Self {
		Self {
			modification: Arc::new(Mutex::new(Modification::None)),
		}
	}

	/// Stops the clock at `millis`.
	pub fn pin_at(&self, millis: u64) {
		*self.modification.lock() = Modification::Pinned(millis);
	}

	/// Shifts the system time forward by `offset`. Replaces a pin.
	pub fn offset_by(&self, offset: Duration) {
		*self.modification.lock() = Modification::Offset(offset.as_millis() as i64);
	}

	/// Advances a pinned clock, or adds to the current offset.
	pub fn advance(&self, by: Duration) {
		let mut modification = self.modification.lock();
		*modification = match *modification {
			Modification::None => Modification::Offset(by.as_millis() as i64),
			Modification::Pinned(at) => Modification::Pinned(at + by.as_millis() as u64),
			Modification::Offset(offset) => Modification::Offset(offset + by.as_millis() as i64),
		};
	}

	pub fn reset(&self) {
		*self.modification.lock() = Modification::None;
	}
}

impl StreamClock for ControllableClock {
	fn millis(&self) -> u64 {
		match *self.modification.lock() {
			Modification::None => SystemClock.millis(),
			Modification::Pinned(at) => at,
			Modification::Offset(offset) => SystemClock.millis().saturating_add_signed(offset),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_pinned_clock_does_not_move() {
		let clock = ControllableClock::new();
		clock.pin_at(1_000);
		assert_eq!(clock.millis(), 1_000);
		clock.advance(Duration::from_millis(500));
		assert_eq!(clock.millis(), 1_500);
	}

	#[test]
	fn test_offset_shifts_system_time() {
		let clock = ControllableClock::new();
		let before = SystemClock.millis();
		clock.offset_by(Duration::from_secs(3600));
		assert!(clock.millis() >= before + 3_600_000);
		clock.reset();
		assert!(clock.millis() < before + 3_600_000);
	}

	#[test]
	fn test_clones_share_modification() {
		let clock = ControllableClock::new();
		let other = clock.clone();
		clock.pin_at(7);
		assert_eq!(other.millis(), 7);
	}
}
