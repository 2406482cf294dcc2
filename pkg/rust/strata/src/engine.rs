// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use strata_runtime::ActorScheduler;
use strata_stream::{LogAppendEntry, PartitionId, Position, StreamProcessorHandle};
use strata_type::{Error, Result, error::diagnostic::engine::unknown_partition, return_error};
use tracing::{info, warn};

use crate::{EngineBuilder, EngineConfig};

/// A set of partitions, each with its own log, state and stream processor,
/// sharing one actor scheduler.
///
/// Dropping the engine shuts it down.
pub struct Engine {
	config: EngineConfig,
	scheduler: ActorScheduler,
	partitions: Vec<StreamProcessorHandle>,
	round_robin: AtomicUsize,
	stopped: AtomicBool,
}

impl Engine {
	pub(crate) fn new(config: EngineConfig, scheduler: ActorScheduler, partitions: Vec<StreamProcessorHandle>) -> Self {
		Self {
			config,
			scheduler,
			partitions,
			round_robin: AtomicUsize::new(0),
			stopped: AtomicBool::new(false),
		}
	}

	pub fn builder() -> EngineBuilder {
		EngineBuilder::new()
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	pub fn scheduler(&self) -> &ActorScheduler {
		&self.scheduler
	}

	pub fn partition_count(&self) -> u32 {
		self.config.partitions
	}

	pub fn partitions(&self) -> &[StreamProcessorHandle] {
		&self.partitions
	}

	pub fn partition(&self, partition: PartitionId) -> Result<&StreamProcessorHandle> {
		if !self.config.contains(partition) {
			return_error!(unknown_partition(partition, self.config.partitions));
		}
		Ok(&self.partitions[(partition - 1) as usize])
	}

	/// Commands on an existing entity go to the partition encoded in the key,
	/// new ones are spread round robin.
	pub fn partition_for(&self, entry: &LogAppendEntry) -> Result<PartitionId> {
		match entry.key {
			Some(key) => {
				let partition = key.partition();
				if !self.config.contains(partition) {
					return_error!(unknown_partition(partition, self.config.partitions));
				}
				Ok(partition)
			}
			None => {
				let next = self.round_robin.fetch_add(1, Ordering::Relaxed);
				Ok((next % self.partitions.len()) as PartitionId + 1)
			}
		}
	}

	/// Appends a client command to the partition chosen by
	/// [`partition_for`](Self::partition_for).
	pub fn write_command(&self, entry: LogAppendEntry) -> Result<(PartitionId, Position)> {
		let partition = self.partition_for(&entry)?;
		let position = self.write_command_to(partition, entry)?;
		Ok((partition, position))
	}

	pub fn write_command_to(&self, partition: PartitionId, entry: LogAppendEntry) -> Result<Position> {
		self.partition(partition)?.writer().write_command(entry)
	}

	/// Blocks until every partition's processor started.
	pub fn wait_started(&self) -> Result<()> {
		for handle in &self.partitions {
			handle.started().join()?;
		}
		Ok(())
	}

	pub fn pause(&self) -> Result<()> {
		for handle in &self.partitions {
			handle.pause().join()?;
		}
		Ok(())
	}

	pub fn resume(&self) -> Result<()> {
		for handle in &self.partitions {
			handle.resume().join()?;
		}
		Ok(())
	}

	/// Partitions whose processing halted, with the reason.
	pub fn failures(&self) -> Result<Vec<(PartitionId, Error)>> {
		let mut failures = Vec::new();
		for handle in &self.partitions {
			if let Some(failure) = handle.failure().join()? {
				failures.push((handle.partition(), failure));
			}
		}
		Ok(failures)
	}

	/// Closes all processors and stops the scheduler. Logs and state stay
	/// readable through the partition handles.
	pub fn shutdown(&self) -> Result<()> {
		if self.stopped.swap(true, Ordering::SeqCst) {
			return Ok(());
		}
		self.scheduler.shutdown()?;
		info!(partitions = self.partitions.len(), "engine stopped");
		Ok(())
	}

	pub fn is_stopped(&self) -> bool {
		self.stopped.load(Ordering::SeqCst)
	}
}

impl Drop for Engine {
	fn drop(&mut self) {
		if let Err(err) = self.shutdown() {
			warn!(code = %err.code(), "engine did not shut down cleanly");
		}
	}
}
