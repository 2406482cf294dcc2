// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Event-sourced record processing over a partitioned append-only log.
//!
//! Each partition has one [`LogStream`](log::LogStream), one
//! [`StateDb`](state::StateDb) and one
//! [`StreamProcessor`](stream_processor::StreamProcessor) actor that is the
//! only writer of processing results to both:
//!
//! - [`record`]: positions, keys, metadata and encoded values
//! - [`log`]: the append-only log with its readers and writer
//! - [`state`]: transactional key-value state
//! - [`processor`]: command processors and event appliers
//! - [`side_effect`]: work deferred until a batch committed
//! - [`response`]: responses to client commands
//! - [`stream_processor`]: replay and the processing state machine

pub mod clock;
pub mod log;
pub mod processor;
pub mod record;
pub mod response;
pub mod side_effect;
pub mod state;
pub mod stream_processor;

pub use clock::{ControllableClock, StreamClock, SystemClock};
pub use log::{LogStream, LogStreamReader, LogStreamWriter};
pub use processor::{
	Command, CommandProcessor, EventApplier, FnApplier, FnProcessor, ProcessingContext, ProcessingResult,
};
pub use record::{
	ErrorRecord, Intent, Key, LogAppendEntry, PartitionId, Position, Record, RecordMetadata, RecordType,
	RecordValue, Rejection, RejectionType, RequestMetadata, TypedValue, ValueType,
};
pub use response::{ChannelResponseWriter, CommandResponse, CommandResponseWriter, NoopResponseWriter};
pub use side_effect::SideEffectQueue;
pub use state::{ColumnFamily, KeyGenerator, LastProcessedPositionState, StateDb, StateSnapshot, Transaction};
pub use stream_processor::{
	ErrorHandlingPhase, StreamProcessor, StreamProcessorBuilder, StreamProcessorConfig, StreamProcessorHandle,
	StreamProcessorListener, StreamProcessorPhase,
};
