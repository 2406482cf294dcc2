// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Responses to client commands.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::record::{Intent, Key, PartitionId, RecordType, RecordValue, Rejection, RequestMetadata, ValueType};

/// Response to a command that carried [`RequestMetadata`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
	pub partition: PartitionId,
	pub request: RequestMetadata,
	pub key: Option<Key>,
	pub record_type: RecordType,
	pub value_type: ValueType,
	pub intent: Intent,
	pub rejection: Option<Rejection>,
	pub value: RecordValue,
}

impl CommandResponse {
	pub fn is_rejection(&self) -> bool {
		self.record_type == RecordType::CommandRejection
	}
}

/// Delivers responses to clients.
///
/// Responses are only handed to the writer after the processing transaction
/// committed.
pub trait CommandResponseWriter: Send + Sync {
	/// Returns `false` if the response could not be delivered right now; it
	/// is offered again later.
	fn try_write_response(&self, response: &CommandResponse) -> bool;
}

/// Drops every response.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResponseWriter;

impl CommandResponseWriter for NoopResponseWriter {
	fn try_write_response(&self, _response: &CommandResponse) -> bool {
		true
	}
}

/// Sends responses over a channel.
#[derive(Debug, Clone)]
pub struct ChannelResponseWriter {
	tx: Sender<CommandResponse>,
}

impl ChannelResponseWriter {
	pub fn new() -> (Self, Receiver<CommandResponse>) {
		let (tx, rx) = unbounded();
		(
			Self {
				tx,
			},
			rx,
		)
	}
}

impl CommandResponseWriter for ChannelResponseWriter {
	fn try_write_response(&self, response: &CommandResponse) -> bool {
		self.tx.send(response.clone()).is_ok()
	}
}
