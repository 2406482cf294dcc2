// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Shared recorders for observing what happened on other threads.

use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use parking_lot::Mutex;

/// Records values in the order they were pushed. Clones share the same log.
#[derive(Debug)]
pub struct Recorder<T> {
	entries: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
	fn clone(&self) -> Self {
		Self {
			entries: self.entries.clone(),
		}
	}
}

impl<T> Default for Recorder<T> {
	fn default() -> Self {
		Self {
			entries: Arc::new(Mutex::new(Vec::new())),
		}
	}
}

impl<T: Clone> Recorder<T> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record(&self, value: T) {
		self.entries.lock().push(value);
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	pub fn entries(&self) -> Vec<T> {
		self.entries.lock().clone()
	}

	pub fn clear(&self) {
		self.entries.lock().clear();
	}
}

/// Counts invocations. Clones share the same count.
#[derive(Debug, Clone, Default)]
pub struct InvocationCounter {
	count: Arc<AtomicUsize>,
}

impl InvocationCounter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Increments the count and returns the number of invocations so far,
	/// including this one.
	pub fn invoke(&self) -> usize {
		self.count.fetch_add(1, Ordering::SeqCst) + 1
	}

	pub fn count(&self) -> usize {
		self.count.load(Ordering::SeqCst)
	}
}
