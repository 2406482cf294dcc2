// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	collections::VecDeque,
	panic::{self, AssertUnwindSafe},
};

use strata_runtime::{ActorFuture, retry::RetryStrategy};
use strata_type::{Error, Result, error::diagnostic::processing, return_error, return_internal_error};
use tracing::{debug, trace, warn};

use super::{Control, ErrorHandlingPhase, StreamProcessor, StreamProcessorPhase};
use crate::{
	processor::{Command, ProcessingContext, ProcessingResult},
	record::{
		ErrorRecord, Intent, LogAppendEntry, Position, RecordMetadata, RecordType, RecordValue, Rejection,
		RejectionType, ValueType,
	},
	response::CommandResponse,
	state::LastProcessedPositionState,
};

/// What to retry after the error handling rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextStep {
	/// Run the processor's error handling in a fresh transaction, then write
	/// its records.
	HandleErrorThenWrite,
	/// Commit the already written batch again.
	RetryUpdateState,
}

impl StreamProcessor {
	pub(super) fn try_read_next(&mut self, control: &Control) {
		if !self.should_process_next() || self.in_processing {
			return;
		}
		let Some(record) = self.reader.next() else {
			return;
		};

		let skip = !record.is_command() || record.processed;
		self.current = Some(record);
		if skip {
			self.skip_record(control);
		} else {
			self.process_command(control);
		}
	}

	fn skip_record(&mut self, control: &Control) {
		if let (Some(listener), Some(record)) = (&self.listener, &self.current) {
			listener.on_skipped(record);
		}
		self.mark_processing_completed();
		control.submit(|processor, control| processor.try_read_next(control));
	}

	fn process_command(&mut self, control: &Control) {
		if self.should_abort() {
			return;
		}
		let Some(record) = self.current.as_ref() else {
			return;
		};
		let command = Command::from_record(record);
		trace!(partition = self.partition(), command = %record, "processing command");
		self.in_processing = true;
		self.command = Some(command.clone());

		let outcome = self.batch_processing(&command).and_then(|()| self.finalize_command(&command));
		match outcome {
			Ok(()) => self.write_records(control),
			Err(err) if err.is_recoverable() => {
				warn!(
					partition = self.partition(),
					command = %command.metadata,
					error = %err,
					"processing failed with a recoverable error, retrying"
				);
				self.txn.rollback();
				self.result = ProcessingResult::new();
				control.schedule(self.config.processing_retry_delay, |processor, control| {
					processor.process_command(control)
				});
			}
			Err(err) if err.is_unrecoverable() => self.halt(err),
			Err(err) => self.on_error(err, NextStep::HandleErrorThenWrite, control),
		}
	}

	/// Processes `initial` and the follow-up commands it produces, up to the
	/// batch limit, in the current transaction.
	fn batch_processing(&mut self, initial: &Command) -> Result<()> {
		let partition = self.partition();
		let limit = self.config.max_commands_in_batch.max(1);
		self.result = ProcessingResult::new();

		let mut pending = VecDeque::from([initial.clone()]);
		let mut processed = 0;
		let mut last_size = 0;

		while processed < limit {
			let Some(command) = pending.pop_front() else {
				break;
			};
			let (value_type, intent) = (command.value_type(), command.intent());
			let Some(processor) = self.processors.get_mut(value_type, intent) else {
				return_error!(processing::no_processor(value_type.as_str(), intent.as_str()));
			};

			let mut ctx = ProcessingContext::new(
				partition,
				&command,
				&mut self.txn,
				&mut self.appliers,
				&mut self.result,
			);
			guarded(value_type, intent, || processor.process(&command, &mut ctx))?;

			let batch_size = pending.len() + processed + 1;
			let mut queued = 0;
			for entry in self.result.records[last_size..].iter_mut() {
				if entry.record_type() == RecordType::Command && batch_size + queued < limit {
					pending.push_back(Command::unwritten(entry, initial.timestamp));
					entry.processed = true;
					queued += 1;
				}
			}

			last_size = self.result.records.len();
			processed += 1;
		}

		trace!(partition, commands = processed, records = last_size, "batch processed");
		Ok(())
	}

	fn finalize_command(&mut self, command: &Command) -> Result<()> {
		match command.position {
			Some(position) => LastProcessedPositionState::mark_as_processed(&mut self.txn, position),
			None => Ok(()),
		}
	}

	fn write_records(&mut self, control: &Control) {
		let future = if self.result.is_empty() {
			if let (Some(listener), Some(record)) = (&self.listener, &self.current) {
				listener.on_skipped(record);
			}
			ActorFuture::completed(true)
		} else if self.result.records.is_empty() {
			ActorFuture::completed(true)
		} else {
			let Some(retries) = self.retries.as_ref() else {
				return;
			};
			let source = self.command.as_ref().and_then(|command| command.position);
			retries.write.run_with_retry_until(
				move |processor: &mut StreamProcessor| processor.try_write(source),
				|processor: &mut StreamProcessor| processor.should_abort(),
			)
		};

		control.run_on_completion(&future, |processor, control, result| match result {
			Ok(true) => processor.update_state(control),
			Ok(false) => debug!(partition = processor.partition(), "writing records aborted"),
			Err(err) => {
				tracing::error!(
					partition = processor.partition(),
					error = %err,
					"writing records failed"
				);
				processor.on_error(err, NextStep::HandleErrorThenWrite, control);
			}
		});
	}

	fn try_write(&mut self, source: Option<Position>) -> Result<bool> {
		match self.writer.try_write(&self.result.records, source) {
			Ok(position) => {
				self.written_position = Some(position);
				Ok(true)
			}
			Err(err) if err.is_recoverable() => {
				debug!(partition = self.partition(), error = %err, "log refused batch, retrying");
				Ok(false)
			}
			Err(err) => Err(err),
		}
	}

	fn update_state(&mut self, control: &Control) {
		let Some(retries) = self.retries.as_ref() else {
			return;
		};
		let future = retries.update_state.run_with_retry_until(
			|processor: &mut StreamProcessor| processor.commit_state(),
			|processor: &mut StreamProcessor| processor.should_abort(),
		);

		control.run_on_completion(&future, |processor, control, result| match result {
			Ok(true) => processor.execute_side_effects(control),
			Ok(false) => debug!(partition = processor.partition(), "state update aborted"),
			Err(err) => {
				tracing::error!(
					partition = processor.partition(),
					error = %err,
					"updating state failed"
				);
				processor.on_error(err, NextStep::RetryUpdateState, control);
			}
		});
	}

	fn commit_state(&mut self) -> Result<bool> {
		self.txn.commit()?;
		if let Some(position) = self.command.as_ref().and_then(|command| command.position) {
			self.last_processed = Some(position);
		}
		if let Some(position) = self.written_position {
			self.last_written = Some(position);
		}
		Ok(true)
	}

	fn execute_side_effects(&mut self, control: &Control) {
		let Some(retries) = self.retries.as_ref() else {
			return;
		};
		self.responses_sent = 0;
		let future = retries.side_effects.run_with_retry_until(
			|processor: &mut StreamProcessor| Ok(processor.try_side_effects()),
			|processor: &mut StreamProcessor| processor.should_abort(),
		);

		control.run_on_completion(&future, |processor, control, result| {
			if let Err(err) = result {
				tracing::error!(
					partition = processor.partition(),
					error = %err,
					"executing side effects failed"
				);
			}
			if let (Some(listener), Some(command)) = (&processor.listener, &processor.command) {
				listener.on_processed(command);
			}
			processor.mark_processing_completed();
			control.submit(|processor, control| processor.try_read_next(control));
		});
	}

	/// Sends each response once and in order, then flushes the side effects.
	/// Returns `true` once both succeeded.
	fn try_side_effects(&mut self) -> bool {
		while let Some(response) = self.result.responses.get(self.responses_sent) {
			if !self.response_writer.try_write_response(response) {
				return false;
			}
			self.responses_sent += 1;
		}
		self.result.side_effects.flush()
	}

	fn mark_processing_completed(&mut self) {
		self.in_processing = false;
		self.result = ProcessingResult::new();
		self.written_position = None;
		self.command = None;
		if self.on_error_retries > 0 {
			self.on_error_retries = 0;
			self.error_phase = ErrorHandlingPhase::NoError;
		}
	}

	fn on_error(&mut self, error: Error, next: NextStep, control: &Control) {
		if error.is_unrecoverable() {
			return self.halt(error);
		}
		self.on_error_retries += 1;
		self.switch_error_phase();
		let Some(retries) = self.retries.as_ref() else {
			return;
		};

		let rollback = next == NextStep::HandleErrorThenWrite;
		let future = retries.update_state.run_with_retry_until(
			move |processor: &mut StreamProcessor| {
				if rollback {
					processor.txn.rollback();
				}
				Ok(true)
			},
			|processor: &mut StreamProcessor| processor.should_abort(),
		);

		control.run_on_completion(&future, move |processor, control, result| {
			if let Err(err) = result {
				tracing::error!(partition = processor.partition(), error = %err, "rollback failed");
			}
			if processor.should_abort() {
				return;
			}
			if processor.error_phase == ErrorHandlingPhase::EndlessErrorLoop {
				control.schedule(processor.config.processing_retry_delay, move |processor, control| {
					processor.continue_after_error(error, next, control)
				});
			} else {
				processor.continue_after_error(error, next, control);
			}
		});
	}

	fn continue_after_error(&mut self, error: Error, next: NextStep, control: &Control) {
		if self.should_abort() {
			return;
		}
		if self.try_exit_out_of_error_loop(&error, control) {
			return;
		}
		let outcome = match next {
			NextStep::HandleErrorThenWrite => match self.error_handling_in_transaction(&error) {
				Ok(()) => {
					self.write_records(control);
					Ok(())
				}
				Err(err) => Err(err),
			},
			NextStep::RetryUpdateState => {
				// the batch is already written, so it is never rejected
				self.start_error_loop(false);
				self.update_state(control);
				Ok(())
			}
		};
		if let Err(err) = outcome {
			debug!(partition = self.partition(), error = %err, "error handling failed");
			self.on_error(err, next, control);
		}
	}

	fn switch_error_phase(&mut self) {
		let next = self.error_phase.escalate();
		if next == ErrorHandlingPhase::EndlessErrorLoop && self.error_phase != next {
			tracing::error!(
				partition = self.partition(),
				command = ?self.current.as_ref().map(|record| record.position),
				"failed to process command, entering endless error loop"
			);
		}
		self.error_phase = next;
	}

	fn start_error_loop(&mut self, user_command: bool) {
		if self.error_phase == ErrorHandlingPhase::NoError {
			self.error_phase = if user_command {
				ErrorHandlingPhase::UserCommandProcessingFailed
			} else {
				ErrorHandlingPhase::ProcessingFailed
			};
		}
	}

	/// Gives the processor of the failed command a chance to handle the error,
	/// in a fresh transaction. Commands without a processor are rejected.
	fn error_handling_in_transaction(&mut self, error: &Error) -> Result<()> {
		let Some(command) = self.command.clone() else {
			return_internal_error!("error handling without a command in processing");
		};
		self.start_error_loop(command.is_user_command());

		let partition = self.partition();
		self.result = ProcessingResult::new();
		let (value_type, intent) = (command.value_type(), command.intent());
		let mut ctx =
			ProcessingContext::new(partition, &command, &mut self.txn, &mut self.appliers, &mut self.result);
		match self.processors.get_mut(value_type, intent) {
			Some(processor) => {
				guarded(value_type, intent, || processor.on_processing_error(error, &command, &mut ctx))?
			}
			None => ctx.reject(RejectionType::ProcessingError, error.message.clone())?,
		}
		self.finalize_command(&command)
	}

	fn try_exit_out_of_error_loop(&mut self, error: &Error, control: &Control) -> bool {
		let reason = match self.error_phase {
			ErrorHandlingPhase::UserCommandProcessingErrorFailed => {
				debug!(partition = self.partition(), error = %error, "error handling failed, rejecting command");
				error.message.clone()
			}
			ErrorHandlingPhase::UserCommandRejectFailed => {
				warn!(partition = self.partition(), error = %error, "rejection failed, rejecting with generic reason");
				format!(
					"Expected to process command, but caught an exception. Check logs (partition {}) for details.",
					self.partition()
				)
			}
			_ => return false,
		};

		match self.reject_with_error_record(reason) {
			Ok(()) => {
				self.write_records(control);
				true
			}
			Err(err) => {
				tracing::error!(partition = self.partition(), error = %err, "writing rejection failed");
				self.result = ProcessingResult::new();
				false
			}
		}
	}

	/// Replaces the result with an error event and a rejection response for
	/// the command in processing.
	fn reject_with_error_record(&mut self, reason: String) -> Result<()> {
		let Some(command) = self.command.clone() else {
			return_internal_error!("rejection without a command in processing");
		};

		let record = ErrorRecord {
			message: reason.clone(),
			error_event_position: command.position.map(|position| position.0).unwrap_or_default(),
		};
		let value = RecordValue::encode(&record)?;

		let mut result = ProcessingResult::new();
		result.records.push(LogAppendEntry::new(
			command.key,
			RecordMetadata::event(ValueType::ERROR, Intent::ERROR_CREATED),
			value.clone(),
		));
		if let Some(request) = command.request() {
			result.responses.push(CommandResponse {
				partition: self.partition(),
				request,
				key: command.key,
				record_type: RecordType::CommandRejection,
				value_type: ValueType::ERROR,
				intent: command.intent(),
				rejection: Some(Rejection {
					rejection_type: RejectionType::ProcessingError,
					reason,
				}),
				value,
			});
		}
		self.result = result;
		self.finalize_command(&command)
	}

	/// Stops processing for good. The actor stays alive so its state can be
	/// inspected.
	pub(super) fn halt(&mut self, error: Error) {
		let partition = self.partition();
		tracing::error!(partition, error = %error, "stream processing halted");
		self.phase = StreamProcessorPhase::Failed;
		self.failure = Some(Error::unrecoverable(processing::processing_halted(partition).with_cause(error.diagnostic())));
		self.txn.rollback();
		self.result = ProcessingResult::new();
		self.remove_log_listener();
	}
}

/// Runs a processor callback, turning a panic into an error.
fn guarded<T>(value_type: ValueType, intent: Intent, f: impl FnOnce() -> Result<T>) -> Result<T> {
	match panic::catch_unwind(AssertUnwindSafe(f)) {
		Ok(result) => result,
		Err(payload) => {
			let reason = payload
				.downcast_ref::<&str>()
				.map(|s| s.to_string())
				.or_else(|| payload.downcast_ref::<String>().cloned())
				.unwrap_or_else(|| "unknown panic".to_string());
			Err(Error::new(processing::processor_panicked(value_type.as_str(), intent.as_str(), &reason)))
		}
	}
}
