// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Records stored in a partition log.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use strata_type::Result;

/// Partition identifier.
pub type PartitionId = u32;

/// Position of a record in its partition log.
///
/// Positions start at 1 and grow by one per record, batches included. A
/// position is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position(pub u64);

impl Position {
	pub const FIRST: Position = Position(1);

	pub fn next(self) -> Position {
		Position(self.0 + 1)
	}
}

impl Display for Position {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

const PARTITION_BITS: u32 = 13;
const KEY_BITS: u32 = 64 - PARTITION_BITS - 1;
const LOCAL_MASK: u64 = (1 << KEY_BITS) - 1;

/// Entity key. The upper bits carry the partition that generated the key,
/// so keys are unique across partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key(pub u64);

impl Key {
	pub fn new(partition: PartitionId, local: u64) -> Self {
		Key(((partition as u64) << KEY_BITS) | (local & LOCAL_MASK))
	}

	pub fn partition(self) -> PartitionId {
		(self.0 >> KEY_BITS) as PartitionId
	}

	pub fn local(self) -> u64 {
		self.0 & LOCAL_MASK
	}

	pub fn to_be_bytes(self) -> [u8; 8] {
		self.0.to_be_bytes()
	}
}

impl Display for Key {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
	Command,
	Event,
	CommandRejection,
}

impl Display for RecordType {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			RecordType::Command => f.write_str("COMMAND"),
			RecordType::Event => f.write_str("EVENT"),
			RecordType::CommandRejection => f.write_str("COMMAND_REJECTION"),
		}
	}
}

/// The kind of entity a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueType(pub &'static str);

impl ValueType {
	/// Events describing a command that could not be processed.
	pub const ERROR: ValueType = ValueType("ERROR");

	pub fn as_str(&self) -> &'static str {
		self.0
	}
}

impl Display for ValueType {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.0)
	}
}

/// What a command asks for, or what an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Intent(pub &'static str);

impl Intent {
	/// Intent of the [`ErrorRecord`] event written when a command is rejected
	/// after its error handling failed.
	pub const ERROR_CREATED: Intent = Intent("CREATED");

	pub fn as_str(&self) -> &'static str {
		self.0
	}
}

impl Display for Intent {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionType {
	InvalidArgument,
	NotFound,
	AlreadyExists,
	InvalidState,
	ProcessingError,
}

impl Display for RejectionType {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			RejectionType::InvalidArgument => "INVALID_ARGUMENT",
			RejectionType::NotFound => "NOT_FOUND",
			RejectionType::AlreadyExists => "ALREADY_EXISTS",
			RejectionType::InvalidState => "INVALID_STATE",
			RejectionType::ProcessingError => "PROCESSING_ERROR",
		};
		f.write_str(s)
	}
}

/// Identifies the client request a command came from. Only commands with
/// request metadata receive a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestMetadata {
	pub request_id: u64,
	pub request_stream_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMetadata {
	pub record_type: RecordType,
	pub value_type: ValueType,
	pub intent: Intent,
	pub rejection: Option<Rejection>,
	pub request: Option<RequestMetadata>,
}

impl RecordMetadata {
	pub fn command(value_type: ValueType, intent: Intent) -> Self {
		Self {
			record_type: RecordType::Command,
			value_type,
			intent,
			rejection: None,
			request: None,
		}
	}

	pub fn event(value_type: ValueType, intent: Intent) -> Self {
		Self {
			record_type: RecordType::Event,
			..Self::command(value_type, intent)
		}
	}

	pub fn rejection(value_type: ValueType, intent: Intent, rejection: Rejection) -> Self {
		Self {
			record_type: RecordType::CommandRejection,
			rejection: Some(rejection),
			..Self::command(value_type, intent)
		}
	}

	pub fn with_request(mut self, request: RequestMetadata) -> Self {
		self.request = Some(request);
		self
	}
}

impl Display for RecordMetadata {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {}.{}", self.record_type, self.value_type, self.intent)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
	pub rejection_type: RejectionType,
	pub reason: String,
}

/// Encoded record payload.
///
/// Values are encoded with postcard, so the same value always yields the same
/// bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecordValue(Vec<u8>);

impl RecordValue {
	pub fn encode<V: Serialize>(value: &V) -> Result<Self> {
		Ok(Self(postcard::to_stdvec(value)?))
	}

	pub fn decode<V: DeserializeOwned>(&self) -> Result<V> {
		Ok(postcard::from_bytes(&self.0)?)
	}

	pub fn from_bytes(bytes: Vec<u8>) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// A value that knows the [`ValueType`] of the records carrying it.
pub trait TypedValue: Serialize + DeserializeOwned {
	const VALUE_TYPE: ValueType;
}

/// Payload of the event written when a command had to be rejected because
/// its error handling failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
	pub message: String,
	pub error_event_position: u64,
}

impl TypedValue for ErrorRecord {
	const VALUE_TYPE: ValueType = ValueType::ERROR;
}

/// A record that was appended to a partition log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
	pub position: Position,
	/// Position of the command this record was written for.
	pub source_position: Option<Position>,
	pub key: Option<Key>,
	/// Milliseconds of the stream clock when the record was appended.
	pub timestamp: u64,
	pub metadata: RecordMetadata,
	pub value: RecordValue,
	/// Set on commands that were already processed in the batch that wrote
	/// them.
	pub processed: bool,
}

impl Record {
	pub fn record_type(&self) -> RecordType {
		self.metadata.record_type
	}

	pub fn value_type(&self) -> ValueType {
		self.metadata.value_type
	}

	pub fn intent(&self) -> Intent {
		self.metadata.intent
	}

	pub fn is_command(&self) -> bool {
		self.metadata.record_type == RecordType::Command
	}

	pub fn is_event(&self) -> bool {
		self.metadata.record_type == RecordType::Event
	}

	pub fn is_event_or_rejection(&self) -> bool {
		matches!(self.metadata.record_type, RecordType::Event | RecordType::CommandRejection)
	}

	pub fn value<V: TypedValue>(&self) -> Result<V> {
		self.value.decode()
	}
}

impl Display for Record {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}@{}", self.metadata, self.position)
	}
}

/// A record to be appended to a partition log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogAppendEntry {
	pub key: Option<Key>,
	pub metadata: RecordMetadata,
	pub value: RecordValue,
	pub processed: bool,
}

impl LogAppendEntry {
	pub fn new(key: Option<Key>, metadata: RecordMetadata, value: RecordValue) -> Self {
		Self {
			key,
			metadata,
			value,
			processed: false,
		}
	}

	/// A command entry for `value`.
	pub fn command<V: TypedValue>(key: Option<Key>, intent: Intent, value: &V) -> Result<Self> {
		Ok(Self::new(key, RecordMetadata::command(V::VALUE_TYPE, intent), RecordValue::encode(value)?))
	}

	pub fn with_request(mut self, request: RequestMetadata) -> Self {
		self.metadata.request = Some(request);
		self
	}

	/// Marks the entry as already processed by the batch that writes it.
	pub fn into_processed(mut self) -> Self {
		self.processed = true;
		self
	}

	pub fn record_type(&self) -> RecordType {
		self.metadata.record_type
	}
}
