// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

use strata_runtime::SchedulerConfig;
use strata_stream::{PartitionId, StreamProcessorConfig};

pub const DEFAULT_PARTITIONS: u32 = 1;

/// Configuration of an [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
	/// Number of partitions, numbered from 1.
	///
	/// Default: 1
	pub partitions: u32,

	pub scheduler: SchedulerConfig,

	/// Template for every partition's processor. The partition id is
	/// replaced per partition.
	pub processing: StreamProcessorConfig,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			partitions: DEFAULT_PARTITIONS,
			scheduler: SchedulerConfig::default(),
			processing: StreamProcessorConfig::default(),
		}
	}
}

impl EngineConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn partitions(mut self, partitions: u32) -> Self {
		self.partitions = partitions;
		self
	}

	pub fn scheduler(mut self, scheduler: SchedulerConfig) -> Self {
		self.scheduler = scheduler;
		self
	}

	pub fn worker_threads(mut self, threads: usize) -> Self {
		self.scheduler = self.scheduler.worker_threads(threads);
		self
	}

	pub fn max_commands_in_batch(mut self, commands: usize) -> Self {
		self.processing = self.processing.max_commands_in_batch(commands);
		self
	}

	pub fn processing_retry_delay(mut self, delay: Duration) -> Self {
		self.processing = self.processing.processing_retry_delay(delay);
		self
	}

	pub fn partition_ids(&self) -> impl Iterator<Item = PartitionId> {
		1..=self.partitions
	}

	pub fn contains(&self, partition: PartitionId) -> bool {
		partition >= 1 && partition <= self.partitions
	}
}
