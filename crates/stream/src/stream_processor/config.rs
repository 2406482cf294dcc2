// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

use crate::record::PartitionId;

pub const DEFAULT_MAX_COMMANDS_IN_BATCH: usize = 100;
pub const DEFAULT_PROCESSING_RETRY_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct StreamProcessorConfig {
	pub partition_id: PartitionId,
	/// Upper bound of commands processed in one transaction, the command read
	/// from the log included.
	pub max_commands_in_batch: usize,
	/// Delay before a command that failed with a recoverable error is
	/// processed again.
	pub processing_retry_delay: Duration,
}

impl Default for StreamProcessorConfig {
	fn default() -> Self {
		Self {
			partition_id: 1,
			max_commands_in_batch: DEFAULT_MAX_COMMANDS_IN_BATCH,
			processing_retry_delay: DEFAULT_PROCESSING_RETRY_DELAY,
		}
	}
}

impl StreamProcessorConfig {
	pub fn new(partition_id: PartitionId) -> Self {
		Self {
			partition_id,
			..Self::default()
		}
	}

	pub fn max_commands_in_batch(mut self, commands: usize) -> Self {
		self.max_commands_in_batch = commands.max(1);
		self
	}

	pub fn processing_retry_delay(mut self, delay: Duration) -> Self {
		self.processing_retry_delay = delay;
		self
	}
}
