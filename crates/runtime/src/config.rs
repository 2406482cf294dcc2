// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

/// Configuration of the actor scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
	/// Number of worker threads executing actor jobs.
	///
	/// Default: number of logical CPUs
	pub worker_threads: usize,

	/// Maximum number of jobs an actor runs before it is requeued behind
	/// other ready actors.
	///
	/// Default: 32
	pub jobs_per_turn: usize,

	/// Prefix for worker thread names, suffixed with the worker index.
	///
	/// Default: "strata-worker"
	pub thread_name_prefix: String,
}

impl Default for SchedulerConfig {
	fn default() -> Self {
		Self {
			worker_threads: num_cpus::get().max(1),
			jobs_per_turn: 32,
			thread_name_prefix: "strata-worker".to_string(),
		}
	}
}

impl SchedulerConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn worker_threads(mut self, threads: usize) -> Self {
		self.worker_threads = threads.max(1);
		self
	}

	pub fn jobs_per_turn(mut self, jobs: usize) -> Self {
		self.jobs_per_turn = jobs.max(1);
		self
	}

	pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.thread_name_prefix = prefix.into();
		self
	}
}
