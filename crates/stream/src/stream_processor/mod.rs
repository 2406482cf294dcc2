// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! The stream processor of a partition.
//!
//! On start the processor replays the partition log into state, then reads
//! unprocessed commands one at a time. Each command is processed in a batch
//! together with the follow-up commands it produces. A batch goes through
//! these steps, each one a retried job on the processor's actor:
//!
//! ```text
//! read -> process -> write records -> update state -> side effects -> read
//!            |            |                |
//!            +------------+----------------+--> on error -> error handling
//! ```
//!
//! Records are written before the state transaction commits. Responses and
//! side effects run only after the commit.

mod builder;
mod config;
mod handle;
mod listener;
mod phase;
mod processing;
mod replay;

use std::sync::Arc;

pub use builder::StreamProcessorBuilder;
pub use config::{DEFAULT_MAX_COMMANDS_IN_BATCH, DEFAULT_PROCESSING_RETRY_DELAY, StreamProcessorConfig};
pub use handle::StreamProcessorHandle;
pub use listener::StreamProcessorListener;
pub use phase::{ErrorHandlingPhase, StreamProcessorPhase};
use strata_runtime::{
	Actor, ActorControl, FailureAction,
	retry::{AbortableRetryStrategy, RecoverableRetryStrategy},
};
use strata_type::{Error, Result};
use tracing::{debug, info};

use crate::{
	log::{ListenerId, LogStream, LogStreamReader, LogStreamWriter},
	processor::{Command, EventApplierRegistry, ProcessingResult, ProcessorRegistry},
	record::{Position, Record},
	response::CommandResponseWriter,
	state::{StateDb, Transaction},
};

type Control = ActorControl<StreamProcessor>;

struct Retries {
	write: AbortableRetryStrategy<StreamProcessor>,
	side_effects: AbortableRetryStrategy<StreamProcessor>,
	update_state: RecoverableRetryStrategy<StreamProcessor>,
}

/// Replays and processes one partition log. Runs as an actor; use
/// [`StreamProcessorBuilder::open`] to start it.
pub struct StreamProcessor {
	config: StreamProcessorConfig,
	log: LogStream,
	writer: LogStreamWriter,
	reader: LogStreamReader,
	txn: Transaction,
	processors: ProcessorRegistry,
	appliers: EventApplierRegistry,
	response_writer: Arc<dyn CommandResponseWriter>,
	listener: Option<Arc<dyn StreamProcessorListener>>,

	phase: StreamProcessorPhase,
	pause_requested: bool,
	closing: bool,
	log_listener: Option<ListenerId>,
	retries: Option<Retries>,
	failure: Option<Error>,

	replay: replay::ReplayProgress,

	current: Option<Record>,
	command: Option<Command>,
	result: ProcessingResult,
	in_processing: bool,
	responses_sent: usize,
	written_position: Option<Position>,
	last_processed: Option<Position>,
	last_written: Option<Position>,

	on_error_retries: u32,
	error_phase: ErrorHandlingPhase,
}

impl StreamProcessor {
	pub(crate) fn new(
		config: StreamProcessorConfig,
		log: LogStream,
		state: &StateDb,
		processors: ProcessorRegistry,
		appliers: EventApplierRegistry,
		response_writer: Arc<dyn CommandResponseWriter>,
		listener: Option<Arc<dyn StreamProcessorListener>>,
	) -> Self {
		Self {
			writer: log.writer(),
			reader: log.new_reader(),
			txn: state.transaction(),
			config,
			log,
			processors,
			appliers,
			response_writer,
			listener,
			phase: StreamProcessorPhase::Initializing,
			pause_requested: false,
			closing: false,
			log_listener: None,
			retries: None,
			failure: None,
			replay: replay::ReplayProgress::default(),
			current: None,
			command: None,
			result: ProcessingResult::new(),
			in_processing: false,
			responses_sent: 0,
			written_position: None,
			last_processed: None,
			last_written: None,
			on_error_retries: 0,
			error_phase: ErrorHandlingPhase::NoError,
		}
	}

	pub fn partition(&self) -> u32 {
		self.config.partition_id
	}

	pub fn phase(&self) -> StreamProcessorPhase {
		self.phase
	}

	pub fn last_processed_position(&self) -> Option<Position> {
		self.last_processed
	}

	pub fn last_written_position(&self) -> Option<Position> {
		self.last_written
	}

	pub fn error_handling_phase(&self) -> ErrorHandlingPhase {
		self.error_phase
	}

	/// `false` once the processor gave up escalating the error of the current
	/// command and keeps retrying it.
	pub fn is_making_progress(&self) -> bool {
		self.error_phase != ErrorHandlingPhase::EndlessErrorLoop
	}

	pub fn failure(&self) -> Option<&Error> {
		self.failure.as_ref()
	}

	fn should_process_next(&self) -> bool {
		self.phase == StreamProcessorPhase::Processing && !self.closing
	}

	fn should_abort(&self) -> bool {
		self.closing || self.phase == StreamProcessorPhase::Failed
	}

	pub(crate) fn pause(&mut self) -> Result<()> {
		match self.phase {
			StreamProcessorPhase::Processing | StreamProcessorPhase::Paused => {
				self.phase = StreamProcessorPhase::Paused;
			}
			StreamProcessorPhase::Initializing => self.pause_requested = true,
			phase => return Err(self.invalid_phase(phase, "pause")),
		}
		info!(partition = self.partition(), "stream processor paused");
		Ok(())
	}

	pub(crate) fn resume(&mut self, control: &Control) -> Result<()> {
		match self.phase {
			StreamProcessorPhase::Paused | StreamProcessorPhase::Processing => {
				self.phase = StreamProcessorPhase::Processing;
				control.submit(|processor, control| processor.try_read_next(control));
			}
			StreamProcessorPhase::Initializing => self.pause_requested = false,
			phase => return Err(self.invalid_phase(phase, "resume")),
		}
		info!(partition = self.partition(), "stream processor resumed");
		Ok(())
	}

	fn invalid_phase(&self, phase: StreamProcessorPhase, operation: &str) -> Error {
		strata_type::error!(strata_type::error::diagnostic::processing::invalid_phase(
			self.partition(),
			&phase.to_string(),
			operation
		))
	}

	fn remove_log_listener(&mut self) {
		if let Some(id) = self.log_listener.take() {
			self.log.remove_record_available_listener(id);
		}
	}
}

impl Actor for StreamProcessor {
	fn name(&self) -> String {
		format!("stream-processor-{}", self.config.partition_id)
	}

	fn on_actor_starting(&mut self, control: &Control) -> Result<()> {
		self.retries = Some(Retries {
			write: AbortableRetryStrategy::new(control.clone()),
			side_effects: AbortableRetryStrategy::new(control.clone()),
			update_state: RecoverableRetryStrategy::new(control.clone()),
		});
		debug!(partition = self.partition(), "stream processor starting");
		Ok(())
	}

	fn on_actor_started(&mut self, control: &Control) {
		self.start_replay(control);
	}

	fn on_actor_closing(&mut self, _control: &Control) {
		self.closing = true;
		if self.phase != StreamProcessorPhase::Failed {
			self.phase = StreamProcessorPhase::Closing;
		}
		self.remove_log_listener();
		debug!(partition = self.partition(), "stream processor closing");
	}

	fn on_actor_closed(&mut self) {
		if self.phase != StreamProcessorPhase::Failed {
			self.phase = StreamProcessorPhase::Closed;
		}
		self.txn.rollback();
		self.retries = None;
		info!(partition = self.partition(), last_processed = ?self.last_processed, "stream processor closed");
	}

	fn on_actor_failed(&mut self, error: &Error) {
		self.phase = StreamProcessorPhase::Failed;
		self.remove_log_listener();
		self.retries = None;
		tracing::error!(partition = self.partition(), error = %error, "stream processor failed");
	}

	fn handle_failure(&mut self, error: &Error, _control: &Control) -> FailureAction {
		self.halt(error.clone());
		FailureAction::Continue
	}
}
