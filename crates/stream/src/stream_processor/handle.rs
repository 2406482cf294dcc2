// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_runtime::{ActorControl, ActorFuture};
use strata_type::{Error, Result};

use super::{ErrorHandlingPhase, StreamProcessor, StreamProcessorPhase};
use crate::{
	log::{LogStream, LogStreamWriter},
	record::{PartitionId, Position},
	state::{StateDb, StateSnapshot},
};

/// Handle to a running [`StreamProcessor`].
///
/// Queries are answered by the processor's actor and reflect its state
/// between two jobs.
#[derive(Clone)]
pub struct StreamProcessorHandle {
	partition: PartitionId,
	control: ActorControl<StreamProcessor>,
	log: LogStream,
	state: StateDb,
}

impl StreamProcessorHandle {
	pub(crate) fn new(control: ActorControl<StreamProcessor>, log: LogStream, state: StateDb) -> Self {
		Self {
			partition: log.partition(),
			control,
			log,
			state,
		}
	}

	pub fn partition(&self) -> PartitionId {
		self.partition
	}

	pub fn log(&self) -> &LogStream {
		&self.log
	}

	pub fn state(&self) -> &StateDb {
		&self.state
	}

	/// Writer for client commands.
	pub fn writer(&self) -> LogStreamWriter {
		self.log.writer()
	}

	/// Completes once the actor started. Replay may still be running.
	pub fn started(&self) -> ActorFuture<()> {
		self.control.started()
	}

	pub fn phase(&self) -> ActorFuture<StreamProcessorPhase> {
		self.control.call(|processor, _| processor.phase())
	}

	/// Stops reading new commands. A command in processing still completes.
	///
	/// Requested during replay, processing starts paused.
	pub fn pause(&self) -> ActorFuture<()> {
		flatten(self.control.call(|processor, _| processor.pause()))
	}

	pub fn resume(&self) -> ActorFuture<()> {
		flatten(self.control.call(|processor, control| processor.resume(control)))
	}

	pub fn last_processed_position(&self) -> ActorFuture<Option<Position>> {
		self.control.call(|processor, _| processor.last_processed_position())
	}

	pub fn last_written_position(&self) -> ActorFuture<Option<Position>> {
		self.control.call(|processor, _| processor.last_written_position())
	}

	pub fn is_making_progress(&self) -> ActorFuture<bool> {
		self.control.call(|processor, _| processor.is_making_progress())
	}

	pub fn error_handling_phase(&self) -> ActorFuture<ErrorHandlingPhase> {
		self.control.call(|processor, _| processor.error_handling_phase())
	}

	/// The error that halted processing, if any.
	pub fn failure(&self) -> ActorFuture<Option<Error>> {
		self.control.call(|processor, _| processor.failure().cloned())
	}

	/// Committed state. Never includes a batch in processing.
	pub fn state_snapshot(&self) -> StateSnapshot {
		self.state.snapshot()
	}

	pub fn close(&self) -> ActorFuture<()> {
		self.control.close()
	}

	pub fn closed(&self) -> ActorFuture<()> {
		self.control.closed()
	}
}

fn flatten<T: Clone + Send + 'static>(future: ActorFuture<Result<T>>) -> ActorFuture<T> {
	future.and_then(|result| match result {
		Ok(value) => ActorFuture::completed(value),
		Err(err) => ActorFuture::failed(err),
	})
}
