// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Rebuilds state from the log before processing starts.
//!
//! Only events written for commands after the last processed position in
//! state are applied; everything up to that position is already reflected in
//! state. Replay runs in batches, one actor job each, so a long log never
//! holds a worker.

use std::sync::Arc;

use strata_type::Result;
use tracing::{debug, info};

use super::{Control, StreamProcessor, StreamProcessorPhase};
use crate::{
	record::Position,
	state::{KeyGenerator, LastProcessedPositionState},
};

const REPLAY_BATCH_SIZE: usize = 256;

#[derive(Debug, Default)]
pub(super) struct ReplayProgress {
	/// Last processed position found in state when replay started.
	snapshot: Option<Position>,
	/// Highest source position seen so far.
	last_source: Option<Position>,
	replayed: usize,
}

impl StreamProcessor {
	pub(super) fn start_replay(&mut self, control: &Control) {
		let snapshot = match LastProcessedPositionState::get(&self.txn) {
			Ok(position) => position,
			Err(err) => return self.halt(err),
		};
		debug!(partition = self.partition(), snapshot = ?snapshot, "replay started");

		self.replay = ReplayProgress {
			snapshot,
			last_source: snapshot,
			replayed: 0,
		};
		self.reader.seek_to_first();
		control.submit(|processor, control| processor.replay_next_batch(control));
	}

	fn replay_next_batch(&mut self, control: &Control) {
		if self.should_abort() {
			return;
		}
		match self.replay_batch() {
			Ok(true) => {
				control.submit(|processor, control| processor.replay_next_batch(control));
			}
			Ok(false) => self.finish_replay(control),
			Err(err) => {
				self.txn.rollback();
				self.halt(err);
			}
		}
	}

	/// Applies the next batch of events and commits them. Returns `true` if
	/// more records follow.
	fn replay_batch(&mut self) -> Result<bool> {
		let keys = KeyGenerator::new(self.partition());

		for _ in 0..REPLAY_BATCH_SIZE {
			let Some(record) = self.reader.next() else {
				break;
			};
			let Some(source) = record.source_position else {
				continue;
			};
			self.last_written = Some(record.position);
			if self.replay.snapshot.is_some_and(|snapshot| source <= snapshot) {
				continue;
			}

			if record.is_event() {
				if let Some(key) = record.key {
					self.appliers.apply(
						record.value_type(),
						record.intent(),
						key,
						&record.value,
						&mut self.txn,
					)?;
					keys.set_key_if_higher(&mut self.txn, key)?;
				}
				self.replay.replayed += 1;
			}
			if self.replay.last_source.is_none_or(|last| source > last) {
				self.replay.last_source = Some(source);
			}
		}

		if let Some(position) = self.replay.last_source {
			LastProcessedPositionState::mark_as_processed(&mut self.txn, position)?;
		}
		self.txn.commit()?;
		Ok(self.reader.has_next())
	}

	fn finish_replay(&mut self, control: &Control) {
		let last_processed = self.replay.last_source;
		self.last_processed = last_processed;
		info!(
			partition = self.partition(),
			last_processed = ?last_processed,
			events = self.replay.replayed,
			"replay finished"
		);
		if let Some(listener) = &self.listener {
			listener.on_replayed(last_processed);
		}

		self.reader.seek_to_next(last_processed);
		debug!(partition = self.partition(), from = %self.reader.next_position(), "processing resumes");
		self.phase = if self.pause_requested {
			StreamProcessorPhase::Paused
		} else {
			StreamProcessorPhase::Processing
		};

		let notify = control.clone();
		self.log_listener = Some(self.log.register_record_available_listener(Arc::new(move || {
			notify.run(|processor, control| processor.try_read_next(control));
		})));
		control.submit(|processor, control| processor.try_read_next(control));
	}
}
