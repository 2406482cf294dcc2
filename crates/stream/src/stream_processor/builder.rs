// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{sync::Arc, time::Duration};

use strata_runtime::ActorScheduler;
use strata_type::{Error, Result};
use tracing::debug;

use super::{StreamProcessor, StreamProcessorConfig, StreamProcessorHandle, StreamProcessorListener};
use crate::{
	log::LogStream,
	processor::{
		Command, CommandProcessor, EventApplier, EventApplierRegistry, FnApplier, FnProcessor, ProcessingContext,
		ProcessorRegistry,
	},
	record::{Intent, Key, PartitionId, RecordValue, ValueType},
	response::{CommandResponseWriter, NoopResponseWriter},
	state::{StateDb, Transaction},
};

/// Assembles a [`StreamProcessor`] for one partition.
///
/// Registration errors are collected and reported by [`build`](Self::build).
pub struct StreamProcessorBuilder {
	config: StreamProcessorConfig,
	log: LogStream,
	state: StateDb,
	processors: ProcessorRegistry,
	appliers: EventApplierRegistry,
	response_writer: Arc<dyn CommandResponseWriter>,
	listener: Option<Arc<dyn StreamProcessorListener>>,
	errors: Vec<Error>,
}

impl StreamProcessorBuilder {
	pub fn new(log: LogStream, state: StateDb) -> Self {
		Self {
			config: StreamProcessorConfig::new(log.partition()),
			log,
			state,
			processors: ProcessorRegistry::new(),
			appliers: EventApplierRegistry::new(),
			response_writer: Arc::new(NoopResponseWriter),
			listener: None,
			errors: Vec::new(),
		}
	}

	pub fn partition(&self) -> PartitionId {
		self.log.partition()
	}

	/// The partition is always taken from the log. A zero batch limit is
	/// raised to one.
	pub fn config(mut self, config: StreamProcessorConfig) -> Self {
		self.config = StreamProcessorConfig {
			partition_id: self.log.partition(),
			max_commands_in_batch: config.max_commands_in_batch.max(1),
			..config
		};
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

	pub fn processor<P>(mut self, value_type: ValueType, intent: Intent, processor: P) -> Self
	where
		P: CommandProcessor + 'static,
	{
		if let Err(err) = self.processors.register(value_type, intent, processor) {
			self.errors.push(err);
		}
		self
	}

	pub fn processor_fn<F>(self, value_type: ValueType, intent: Intent, f: F) -> Self
	where
		F: FnMut(&Command, &mut ProcessingContext<'_>) -> Result<()> + Send + 'static,
	{
		self.processor(value_type, intent, FnProcessor(f))
	}

	pub fn applier<A>(mut self, value_type: ValueType, intent: Intent, applier: A) -> Self
	where
		A: EventApplier + 'static,
	{
		if let Err(err) = self.appliers.register(value_type, intent, applier) {
			self.errors.push(err);
		}
		self
	}

	pub fn applier_fn<F>(self, value_type: ValueType, intent: Intent, f: F) -> Self
	where
		F: FnMut(Key, &RecordValue, &mut Transaction) -> Result<()> + Send + 'static,
	{
		self.applier(value_type, intent, FnApplier(f))
	}

	pub fn response_writer(mut self, writer: Arc<dyn CommandResponseWriter>) -> Self {
		self.response_writer = writer;
		self
	}

	pub fn listener(mut self, listener: Arc<dyn StreamProcessorListener>) -> Self {
		self.listener = Some(listener);
		self
	}

	pub fn build(mut self) -> Result<StreamProcessor> {
		if !self.errors.is_empty() {
			return Err(self.errors.remove(0));
		}
		Ok(StreamProcessor::new(
			self.config,
			self.log,
			&self.state,
			self.processors,
			self.appliers,
			self.response_writer,
			self.listener,
		))
	}

	/// Builds the processor and starts it on `scheduler`. Replay begins as
	/// soon as the actor started.
	pub fn open(self, scheduler: &ActorScheduler) -> Result<StreamProcessorHandle> {
		let log = self.log.clone();
		let state = self.state.clone();
		let processor = self.build()?;
		debug!(partition = log.partition(), "opening stream processor");
		let control = scheduler.submit_actor(processor)?;
		Ok(StreamProcessorHandle::new(control, log, state))
	}
}
