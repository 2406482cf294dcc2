// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Command processors and event appliers.
//!
//! State is event sourced: a [`CommandProcessor`] never writes state itself.
//! It appends follow-up events, and each event is applied to state right away
//! by the [`EventApplier`] registered for its value type and intent. Replay
//! runs the same appliers over the events in the log, which reconstructs the
//! state processing produced.

mod context;
mod registry;

pub use context::{ProcessingContext, ProcessingResult};
pub use registry::{EventApplierRegistry, ProcessorRegistry};
use strata_type::{Error, Result};

use crate::{
	record::{
		Intent, Key, LogAppendEntry, Position, Record, RecordMetadata, RecordValue, RejectionType,
		RequestMetadata, TypedValue, ValueType,
	},
	state::Transaction,
};

/// A command as seen by a processor.
///
/// Commands read from the log carry their position. Follow-up commands that
/// are processed in the batch that produced them are not written yet and have
/// none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
	pub position: Option<Position>,
	pub key: Option<Key>,
	/// Milliseconds of the stream clock when the command was appended.
	pub timestamp: u64,
	pub metadata: RecordMetadata,
	pub value: RecordValue,
}

impl Command {
	pub fn from_record(record: &Record) -> Self {
		Self {
			position: Some(record.position),
			key: record.key,
			timestamp: record.timestamp,
			metadata: record.metadata.clone(),
			value: record.value.clone(),
		}
	}

	pub(crate) fn unwritten(entry: &LogAppendEntry, timestamp: u64) -> Self {
		Self {
			position: None,
			key: entry.key,
			timestamp,
			metadata: entry.metadata.clone(),
			value: entry.value.clone(),
		}
	}

	pub fn value_type(&self) -> ValueType {
		self.metadata.value_type
	}

	pub fn intent(&self) -> Intent {
		self.metadata.intent
	}

	pub fn request(&self) -> Option<RequestMetadata> {
		self.metadata.request
	}

	/// Commands sent by a client carry request metadata.
	pub fn is_user_command(&self) -> bool {
		self.metadata.request.is_some()
	}

	pub fn value<V: TypedValue>(&self) -> Result<V> {
		self.value.decode()
	}
}

/// Handles one kind of command.
pub trait CommandProcessor: Send {
	/// Processes `command`. Returning an error rolls back everything the
	/// processor wrote.
	///
	/// Recoverable errors are retried after a delay, unrecoverable errors halt
	/// the partition, any other error is handed to
	/// [`on_processing_error`](Self::on_processing_error).
	fn process(&mut self, command: &Command, ctx: &mut ProcessingContext<'_>) -> Result<()>;

	/// Called in a fresh transaction after [`process`](Self::process) failed.
	///
	/// Default: reject the command with [`RejectionType::ProcessingError`].
	#[allow(unused_variables)]
	fn on_processing_error(&mut self, error: &Error, command: &Command, ctx: &mut ProcessingContext<'_>) -> Result<()> {
		ctx.reject(RejectionType::ProcessingError, error.message.clone())
	}
}

/// Applies one kind of event to state.
///
/// Appliers must be deterministic: the same event on the same state always
/// produces the same writes.
pub trait EventApplier: Send {
	fn apply(&mut self, key: Key, value: &RecordValue, state: &mut Transaction) -> Result<()>;
}

/// An [`EventApplier`] backed by a closure.
pub struct FnApplier<F>(pub F);

impl<F> EventApplier for FnApplier<F>
where
	F: FnMut(Key, &RecordValue, &mut Transaction) -> Result<()> + Send,
{
	fn apply(&mut self, key: Key, value: &RecordValue, state: &mut Transaction) -> Result<()> {
		(self.0)(key, value, state)
	}
}

/// A [`CommandProcessor`] backed by a closure. Errors are handled the default
/// way.
pub struct FnProcessor<F>(pub F);

impl<F> CommandProcessor for FnProcessor<F>
where
	F: FnMut(&Command, &mut ProcessingContext<'_>) -> Result<()> + Send,
{
	fn process(&mut self, command: &Command, ctx: &mut ProcessingContext<'_>) -> Result<()> {
		(self.0)(command, ctx)
	}
}
