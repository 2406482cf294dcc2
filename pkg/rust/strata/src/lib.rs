// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Runs several stream processing partitions on one actor scheduler.
//!
//! ```ignore
//! let engine = Engine::builder()
//! 	.partitions(3)
//! 	.processor_fn(Order::VALUE_TYPE, CREATE, create_order)
//! 	.applier_fn(Order::VALUE_TYPE, CREATED, apply_created)
//! 	.build()?;
//! let (partition, position) = engine.write_command(entry)?;
//! ```

mod builder;
mod config;
mod engine;

pub use builder::EngineBuilder;
pub use config::EngineConfig;
pub use engine::Engine;
pub use strata_runtime as runtime;
pub use strata_stream as stream;
pub use strata_stream::{
	Command, CommandProcessor, CommandResponse, CommandResponseWriter, EventApplier, Intent, Key, LogAppendEntry,
	LogStream, PartitionId, Position, ProcessingContext, Record, RecordValue, StateDb, StateSnapshot,
	StreamProcessorHandle, StreamProcessorPhase, Transaction, TypedValue, ValueType,
};
pub use strata_sub_tracing::{TracingBuilder, TracingConfigurator};
pub use strata_type::{Error, Result};
