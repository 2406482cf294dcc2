// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashMap, sync::Arc, time::Duration};

use strata_runtime::{ActorScheduler, SchedulerConfig};
use strata_stream::{
	Command, CommandProcessor, CommandResponseWriter, EventApplier, Intent, Key, LogStream, NoopResponseWriter,
	PartitionId, ProcessingContext, RecordValue, StateDb, StreamClock, StreamProcessorBuilder,
	StreamProcessorListener, SystemClock, Transaction, ValueType,
};
use strata_sub_tracing::{TracingBuilder, TracingConfigurator};
use strata_type::{
	Error, Result,
	error::diagnostic::engine::{no_partitions, partition_storage_conflict, unknown_partition},
	return_error,
};
use tracing::{debug, warn};

use crate::{Engine, EngineConfig};

/// Applied to the processor builder of every partition.
type Registration = Box<dyn Fn(StreamProcessorBuilder) -> StreamProcessorBuilder + Send>;

/// Assembles an [`Engine`].
///
/// Processors and appliers are registered once and instantiated for each
/// partition, so every partition owns its own processor state.
pub struct EngineBuilder {
	config: EngineConfig,
	registrations: Vec<Registration>,
	storage: HashMap<PartitionId, (LogStream, StateDb)>,
	clock: Arc<dyn StreamClock>,
	response_writer: Arc<dyn CommandResponseWriter>,
	listener: Option<Arc<dyn StreamProcessorListener>>,
	tracing: Option<TracingConfigurator>,
	errors: Vec<Error>,
}

impl Default for EngineBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl EngineBuilder {
	pub fn new() -> Self {
		Self {
			config: EngineConfig::default(),
			registrations: Vec::new(),
			storage: HashMap::new(),
			clock: Arc::new(SystemClock),
			response_writer: Arc::new(NoopResponseWriter),
			listener: None,
			tracing: None,
			errors: Vec::new(),
		}
	}

	pub fn config(mut self, config: EngineConfig) -> Self {
		self.config = config;
		self
	}

	pub fn partitions(mut self, partitions: u32) -> Self {
		self.config = self.config.partitions(partitions);
		self
	}

	pub fn scheduler(mut self, scheduler: SchedulerConfig) -> Self {
		self.config = self.config.scheduler(scheduler);
		self
	}

	pub fn worker_threads(mut self, threads: usize) -> Self {
		self.config = self.config.worker_threads(threads);
		self
	}

	pub fn max_commands_in_batch(mut self, commands: usize) -> Self {
		self.config = self.config.max_commands_in_batch(commands);
		self
	}

	pub fn processing_retry_delay(mut self, delay: Duration) -> Self {
		self.config = self.config.processing_retry_delay(delay);
		self
	}

	/// Registers a processor created per partition by `factory`.
	pub fn processor<P, F>(mut self, value_type: ValueType, intent: Intent, factory: F) -> Self
	where
		P: CommandProcessor + 'static,
		F: Fn(PartitionId) -> P + Send + 'static,
	{
		self.registrations.push(Box::new(move |builder| {
			let partition = builder.partition();
			builder.processor(value_type, intent, factory(partition))
		}));
		self
	}

	/// Registers a processor function; each partition gets its own clone.
	pub fn processor_fn<F>(mut self, value_type: ValueType, intent: Intent, f: F) -> Self
	where
		F: FnMut(&Command, &mut ProcessingContext<'_>) -> Result<()> + Clone + Send + 'static,
	{
		self.registrations.push(Box::new(move |builder| builder.processor_fn(value_type, intent, f.clone())));
		self
	}

	pub fn applier<A, F>(mut self, value_type: ValueType, intent: Intent, factory: F) -> Self
	where
		A: EventApplier + 'static,
		F: Fn(PartitionId) -> A + Send + 'static,
	{
		self.registrations.push(Box::new(move |builder| {
			let partition = builder.partition();
			builder.applier(value_type, intent, factory(partition))
		}));
		self
	}

	pub fn applier_fn<F>(mut self, value_type: ValueType, intent: Intent, f: F) -> Self
	where
		F: FnMut(Key, &RecordValue, &mut Transaction) -> Result<()> + Clone + Send + 'static,
	{
		self.registrations.push(Box::new(move |builder| builder.applier_fn(value_type, intent, f.clone())));
		self
	}

	/// Clock stamping records appended to newly created logs.
	pub fn clock(mut self, clock: Arc<dyn StreamClock>) -> Self {
		self.clock = clock;
		self
	}

	/// Shared by all partitions.
	pub fn response_writer(mut self, writer: Arc<dyn CommandResponseWriter>) -> Self {
		self.response_writer = writer;
		self
	}

	/// Shared by all partitions.
	pub fn listener(mut self, listener: Arc<dyn StreamProcessorListener>) -> Self {
		self.listener = Some(listener);
		self
	}

	/// Reuses an existing log and state for the log's partition. The state is
	/// rebuilt from the log by replay when the engine starts.
	pub fn attach(mut self, log: LogStream, state: StateDb) -> Self {
		let partition = log.partition();
		if self.storage.insert(partition, (log, state)).is_some() {
			self.errors.push(strata_type::error!(partition_storage_conflict(partition)));
		}
		self
	}

	/// Installs a tracing subscriber when the engine is built. An already
	/// installed subscriber is kept.
	pub fn with_tracing<F>(mut self, configurator: F) -> Self
	where
		F: FnOnce(TracingBuilder) -> TracingBuilder + Send + 'static,
	{
		self.tracing = Some(Box::new(configurator));
		self
	}

	/// Starts the scheduler and one stream processor per partition.
	pub fn build(mut self) -> Result<Engine> {
		if !self.errors.is_empty() {
			return Err(self.errors.remove(0));
		}
		if self.config.partitions == 0 {
			return_error!(no_partitions());
		}
		if let Some(partition) = self.storage.keys().copied().find(|p| !self.config.contains(*p)) {
			return_error!(unknown_partition(partition, self.config.partitions));
		}

		if let Some(configurator) = self.tracing.take() {
			if let Err(err) = strata_sub_tracing::install(Some(configurator)) {
				if err.code() != "TRACING_002" {
					return Err(err);
				}
				debug!("tracing subscriber already installed");
			}
		}

		let scheduler = ActorScheduler::new(self.config.scheduler.clone())?;
		let mut partitions = Vec::with_capacity(self.config.partitions as usize);

		for partition in self.config.partition_ids() {
			let (log, state) = self
				.storage
				.remove(&partition)
				.unwrap_or_else(|| (LogStream::with_clock(partition, self.clock.clone()), StateDb::new()));

			let mut builder = StreamProcessorBuilder::new(log, state)
				.config(self.config.processing.clone())
				.response_writer(self.response_writer.clone());
			if let Some(listener) = &self.listener {
				builder = builder.listener(listener.clone());
			}
			for registration in &self.registrations {
				builder = registration(builder);
			}

			match builder.open(&scheduler) {
				Ok(handle) => partitions.push(handle),
				Err(err) => {
					warn!(partition, code = %err.code(), "partition failed to open");
					if let Err(shutdown) = scheduler.shutdown() {
						warn!(code = %shutdown.code(), "scheduler did not shut down cleanly");
					}
					return Err(err);
				}
			}
		}

		debug!(partitions = partitions.len(), "engine started");
		Ok(Engine::new(self.config, scheduler, partitions))
	}
}
