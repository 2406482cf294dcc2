// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! In-memory partition log.
//!
//! A [`LogStream`] is an append-only sequence of [`Record`]s. Batches are
//! appended atomically: a reader sees either every record of a batch or none.

use std::sync::{
	Arc,
	atomic::{AtomicBool, AtomicU64, Ordering},
};

use parking_lot::{Mutex, RwLock};
use strata_type::{Result, error, error::diagnostic::log, return_error};
use tracing::trace;

use crate::{
	clock::{StreamClock, SystemClock},
	record::{LogAppendEntry, PartitionId, Position, Record},
};

/// Called after records were appended.
pub type RecordAvailableListener = Arc<dyn Fn() + Send + Sync>;

/// Identifies a registered [`RecordAvailableListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct LogInner {
	partition: PartitionId,
	clock: Arc<dyn StreamClock>,
	records: RwLock<Vec<Record>>,
	closed: AtomicBool,
	listeners: Mutex<Vec<(ListenerId, RecordAvailableListener)>>,
	next_listener: AtomicU64,
}

/// Handle to a partition log. Clones share the same records.
#[derive(Clone)]
pub struct LogStream {
	inner: Arc<LogInner>,
}

impl LogStream {
	pub fn new(partition: PartitionId) -> Self {
		Self::with_clock(partition, Arc::new(SystemClock))
	}

	pub fn with_clock(partition: PartitionId, clock: Arc<dyn StreamClock>) -> Self {
		Self {
			inner: Arc::new(LogInner {
				partition,
				clock,
				records: RwLock::new(Vec::new()),
				closed: AtomicBool::new(false),
				listeners: Mutex::new(Vec::new()),
				next_listener: AtomicU64::new(0),
			}),
		}
	}

	pub fn partition(&self) -> PartitionId {
		self.inner.partition
	}

	pub fn writer(&self) -> LogStreamWriter {
		LogStreamWriter {
			inner: self.inner.clone(),
		}
	}

	/// A reader positioned before the first record.
	pub fn new_reader(&self) -> LogStreamReader {
		LogStreamReader {
			inner: self.inner.clone(),
			next_index: 0,
		}
	}

	pub fn last_position(&self) -> Option<Position> {
		self.inner.records.read().last().map(|record| record.position)
	}

	pub fn len(&self) -> usize {
		self.inner.records.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns the record at `position`, if written.
	pub fn record(&self, position: Position) -> Option<Record> {
		let index = position.0.checked_sub(1)? as usize;
		self.inner.records.read().get(index).cloned()
	}

	/// Copies every record currently in the log.
	pub fn records(&self) -> Vec<Record> {
		self.inner.records.read().clone()
	}

	pub fn register_record_available_listener(&self, listener: RecordAvailableListener) -> ListenerId {
		let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
		self.inner.listeners.lock().push((id, listener));
		id
	}

	pub fn remove_record_available_listener(&self, id: ListenerId) {
		self.inner.listeners.lock().retain(|(listener, _)| *listener != id);
	}

	/// Refuses every following write. Records already written stay readable.
	pub fn close(&self) {
		self.inner.closed.store(true, Ordering::SeqCst);
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}
}

/// Appends batches to a [`LogStream`].
#[derive(Clone)]
pub struct LogStreamWriter {
	inner: Arc<LogInner>,
}

impl LogStreamWriter {
	/// Appends `entries` as one batch and returns the position of its last
	/// record.
	///
	/// `source_position` is the command the entries were produced for. It
	/// must already be written.
	pub fn try_write(&self, entries: &[LogAppendEntry], source_position: Option<Position>) -> Result<Position> {
		let inner = &self.inner;
		if inner.closed.load(Ordering::SeqCst) {
			return_error!(log::log_closed(inner.partition));
		}
		if entries.is_empty() {
			return_error!(log::write_rejected(inner.partition, "batch is empty"));
		}

		let last = {
			let mut records = inner.records.write();
			let head = records.last().map(|record| record.position.0).unwrap_or(0);
			if let Some(source) = source_position {
				if source.0 > head {
					return Err(error!(log::source_position_not_written(source.0, head)));
				}
			}

			let timestamp = inner.clock.millis();
			let mut position = Position(head);
			for entry in entries {
				position = position.next();
				records.push(Record {
					position,
					source_position,
					key: entry.key,
					timestamp,
					metadata: entry.metadata.clone(),
					value: entry.value.clone(),
					processed: entry.processed,
				});
			}
			position
		};

		trace!(partition = inner.partition, last = %last, count = entries.len(), "records appended");

		let listeners: Vec<RecordAvailableListener> =
			inner.listeners.lock().iter().map(|(_, listener)| listener.clone()).collect();
		for listener in listeners {
			listener();
		}

		Ok(last)
	}

	/// Appends a single command without source.
	pub fn write_command(&self, entry: LogAppendEntry) -> Result<Position> {
		self.try_write(std::slice::from_ref(&entry), None)
	}
}

/// Reads a [`LogStream`] in position order.
pub struct LogStreamReader {
	inner: Arc<LogInner>,
	next_index: usize,
}

impl LogStreamReader {
	pub fn has_next(&self) -> bool {
		self.next_index < self.inner.records.read().len()
	}

	/// Moves the reader so that the next record is the one at `position`, or
	/// the first one after it.
	pub fn seek(&mut self, position: Position) {
		self.next_index = position.0.saturating_sub(1) as usize;
	}

	/// Moves the reader so that the next record is the one after `position`.
	/// `None` rewinds to the first record.
	pub fn seek_to_next(&mut self, position: Option<Position>) {
		self.next_index = position.map(|p| p.0 as usize).unwrap_or(0);
	}

	pub fn seek_to_first(&mut self) {
		self.next_index = 0;
	}

	/// Position of the record the next call to [`next`](Iterator::next)
	/// returns.
	pub fn next_position(&self) -> Position {
		Position(self.next_index as u64 + 1)
	}
}

impl Iterator for LogStreamReader {
	type Item = Record;

	fn next(&mut self) -> Option<Self::Item> {
		let record = self.inner.records.read().get(self.next_index).cloned()?;
		self.next_index += 1;
		Some(record)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::AtomicUsize;

	use super::*;
	use crate::{
		clock::ControllableClock,
		record::{Intent, RecordMetadata, RecordValue, ValueType},
	};

	fn entry(intent: &'static str) -> LogAppendEntry {
		LogAppendEntry::new(
			None,
			RecordMetadata::command(ValueType("TEST"), Intent(intent)),
			RecordValue::from_bytes(vec![1]),
		)
	}

	#[test]
	fn test_positions_increase_by_one_per_record() {
		let log = LogStream::new(1);
		let writer = log.writer();

		assert_eq!(writer.write_command(entry("A")).unwrap(), Position(1));
		assert_eq!(writer.try_write(&[entry("B"), entry("C")], Some(Position(1))).unwrap(), Position(3));

		let records = log.records();
		let positions: Vec<u64> = records.iter().map(|r| r.position.0).collect();
		assert_eq!(positions, vec![1, 2, 3]);
		assert_eq!(records[1].source_position, Some(Position(1)));
		assert_eq!(log.last_position(), Some(Position(3)));
	}

	#[test]
	fn test_source_position_must_be_written() {
		let log = LogStream::new(1);
		let err = log.writer().try_write(&[entry("A")], Some(Position(5))).unwrap_err();
		assert_eq!(err.code(), "LOG_002");
		assert!(log.is_empty());
	}

	#[test]
	fn test_closed_log_refuses_writes() {
		let log = LogStream::new(2);
		log.close();
		let err = log.writer().write_command(entry("A")).unwrap_err();
		assert_eq!(err.code(), "LOG_001");
	}

	#[test]
	fn test_empty_batch_is_rejected() {
		let log = LogStream::new(1);
		assert_eq!(log.writer().try_write(&[], None).unwrap_err().code(), "LOG_003");
	}

	#[test]
	fn test_timestamp_taken_from_clock() {
		let clock = ControllableClock::new();
		clock.pin_at(42);
		let log = LogStream::with_clock(1, Arc::new(clock));
		log.writer().write_command(entry("A")).unwrap();
		assert_eq!(log.record(Position(1)).unwrap().timestamp, 42);
	}

	#[test]
	fn test_reader_seek() {
		let log = LogStream::new(1);
		let writer = log.writer();
		for intent in ["A", "B", "C"] {
			writer.write_command(entry(intent)).unwrap();
		}

		let mut reader = log.new_reader();
		assert_eq!(reader.next_position(), Position(1));
		reader.seek_to_next(Some(Position(1)));
		assert_eq!(reader.next_position(), Position(2));
		assert_eq!(reader.next().unwrap().position, Position(2));
		assert_eq!(reader.next_position(), Position(3));

		reader.seek(Position(3));
		assert!(reader.has_next());
		assert_eq!(reader.next().unwrap().intent(), Intent("C"));
		assert!(!reader.has_next());
		assert!(reader.next().is_none());

		reader.seek_to_first();
		assert_eq!(reader.count(), 3);
	}

	#[test]
	fn test_listener_notified_until_removed() {
		let log = LogStream::new(1);
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let id = log.register_record_available_listener(Arc::new(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		}));

		log.writer().write_command(entry("A")).unwrap();
		log.remove_record_available_listener(id);
		log.writer().write_command(entry("B")).unwrap();

		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
