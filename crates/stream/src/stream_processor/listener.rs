// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::{
	processor::Command,
	record::{Position, Record},
};

/// Observes a stream processor. Callbacks run on the processor's actor and
/// must return quickly.
#[allow(unused_variables)]
pub trait StreamProcessorListener: Send + Sync {
	/// A command and its batch were committed and their side effects ran.
	fn on_processed(&self, command: &Command) {}

	/// A record was read but not processed, or processing produced nothing.
	fn on_skipped(&self, record: &Record) {}

	/// Replay finished. `last_processed` is the position processing resumes
	/// after.
	fn on_replayed(&self, last_processed: Option<Position>) {}
}
