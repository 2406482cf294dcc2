// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_type::Result;

use super::{Command, EventApplierRegistry};
use crate::{
	record::{
		Intent, Key, LogAppendEntry, PartitionId, RecordMetadata, RecordType, RecordValue, Rejection, RejectionType,
		TypedValue,
	},
	response::CommandResponse,
	side_effect::SideEffectQueue,
	state::{KeyGenerator, Transaction},
};

/// Everything a command batch produced.
///
/// Records are written to the log before the transaction commits; the
/// responses and the side effects run only after it committed.
#[derive(Debug, Default)]
pub struct ProcessingResult {
	pub(crate) records: Vec<LogAppendEntry>,
	pub(crate) responses: Vec<CommandResponse>,
	pub(crate) side_effects: SideEffectQueue,
}

impl ProcessingResult {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn records(&self) -> &[LogAppendEntry] {
		&self.records
	}

	/// Responses in the order they were written.
	pub fn responses(&self) -> &[CommandResponse] {
		&self.responses
	}

	/// Nothing to write, respond or run.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty() && self.responses.is_empty() && self.side_effects.is_empty()
	}
}

/// Access to state and writers while processing one command.
pub struct ProcessingContext<'a> {
	partition: PartitionId,
	command: &'a Command,
	state: &'a mut Transaction,
	keys: KeyGenerator,
	appliers: &'a mut EventApplierRegistry,
	result: &'a mut ProcessingResult,
}

impl<'a> ProcessingContext<'a> {
	pub(crate) fn new(
		partition: PartitionId,
		command: &'a Command,
		state: &'a mut Transaction,
		appliers: &'a mut EventApplierRegistry,
		result: &'a mut ProcessingResult,
	) -> Self {
		Self {
			partition,
			command,
			state,
			keys: KeyGenerator::new(partition),
			appliers,
			result,
		}
	}

	pub fn partition(&self) -> PartitionId {
		self.partition
	}

	/// Read access to state, including events appended so far.
	pub fn state(&self) -> &Transaction {
		self.state
	}

	/// Time of the command being processed.
	pub fn timestamp(&self) -> u64 {
		self.command.timestamp
	}

	pub fn next_key(&mut self) -> Result<Key> {
		self.keys.next_key(self.state)
	}

	/// Appends an event and applies it to state.
	///
	/// The event is written with the command's batch, atomically with the
	/// transaction commit.
	pub fn append_follow_up_event<V: TypedValue>(&mut self, key: Key, intent: Intent, value: &V) -> Result<()> {
		let value = RecordValue::encode(value)?;
		self.appliers.apply(V::VALUE_TYPE, intent, key, &value, self.state)?;
		self.result.records.push(LogAppendEntry::new(
			Some(key),
			RecordMetadata::event(V::VALUE_TYPE, intent),
			value,
		));
		Ok(())
	}

	/// Appends a command. It is processed in the same batch while the batch
	/// limit allows it, and read back from the log otherwise.
	pub fn append_follow_up_command<V: TypedValue>(&mut self, key: Option<Key>, intent: Intent, value: &V) -> Result<()> {
		self.result.records.push(LogAppendEntry::command(key, intent, value)?);
		Ok(())
	}

	/// Responds to `source` with an event. Sent only once the transaction
	/// committed, and only if `source` came from a client. Every call adds a
	/// response.
	pub fn write_event_on_command<V: TypedValue>(
		&mut self,
		key: Key,
		intent: Intent,
		value: &V,
		source: &Command,
	) -> Result<()> {
		let Some(request) = source.request() else {
			return Ok(());
		};
		self.result.responses.push(CommandResponse {
			partition: self.partition,
			request,
			key: Some(key),
			record_type: RecordType::Event,
			value_type: V::VALUE_TYPE,
			intent,
			rejection: None,
			value: RecordValue::encode(value)?,
		});
		Ok(())
	}

	/// Rejects the command being processed.
	///
	/// Writes a rejection record and, for client commands, a rejection
	/// response.
	pub fn reject(&mut self, rejection_type: RejectionType, reason: impl Into<String>) -> Result<()> {
		let command = self.command;
		let rejection = Rejection {
			rejection_type,
			reason: reason.into(),
		};

		self.result.records.push(LogAppendEntry::new(
			command.key,
			RecordMetadata::rejection(command.value_type(), command.intent(), rejection.clone()),
			command.value.clone(),
		));
		if let Some(request) = command.request() {
			self.result.responses.push(CommandResponse {
				partition: self.partition,
				request,
				key: command.key,
				record_type: RecordType::CommandRejection,
				value_type: command.value_type(),
				intent: command.intent(),
				rejection: Some(rejection),
				value: command.value.clone(),
			});
		}
		Ok(())
	}

	/// Runs `effect` after the transaction committed, until it returns `true`.
	pub fn append_side_effect<F>(&mut self, effect: F)
	where
		F: FnMut() -> bool + Send + 'static,
	{
		self.result.side_effects.add(effect);
	}

	pub fn side_effects(&mut self) -> &mut SideEffectQueue {
		&mut self.result.side_effects
	}
}
