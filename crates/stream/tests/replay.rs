// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

mod common;

use std::{sync::Arc, time::Duration};

use common::*;
use strata_runtime::ActorScheduler;
use strata_stream::{ChannelResponseWriter, Key, LogStream, Position, StateDb, StreamProcessorHandle};

/// Processes a few commands on a fresh processor and closes it. Returns the
/// position of the last command.
fn run_commands(log: &LogStream, state: &StateDb) -> Position {
	let scheduler = scheduler();
	let handle = accounts(log, state).open(&scheduler).unwrap();
	wait_until_processing(&handle);

	let writer = handle.writer();
	writer.write_command(open_command("alice", 5)).unwrap();
	writer.write_command(open_command("bob", 0)).unwrap();
	writer.write_command(deposit_command(Key::new(1, 2), 7)).unwrap();
	let last = writer.write_command(deposit_command(Key::new(1, 9), 1)).unwrap();
	wait_until_processed(&handle, last);

	handle.close().join().unwrap();
	last
}

fn reopen(
	log: &LogStream,
	state: &StateDb,
	listener: Arc<RecordingListener>,
) -> (ActorScheduler, StreamProcessorHandle) {
	let scheduler = scheduler();
	let handle = accounts(log, state).listener(listener).open(&scheduler).unwrap();
	wait_until_processing(&handle);
	(scheduler, handle)
}

#[test]
fn test_replay_rebuilds_identical_state() {
	let log = LogStream::new(1);
	let state = StateDb::new();
	let last = run_commands(&log, &state);
	let processed = state.snapshot();
	let written = log.len();

	let replayed = StateDb::new();
	let listener = RecordingListener::new();
	let (_scheduler, handle) = reopen(&log, &replayed, listener.clone());

	assert_eq!(replayed.snapshot(), processed);
	assert!(replayed.snapshot().same_content_except(&processed, &[]));
	assert_eq!(account(&replayed.snapshot(), Key::new(1, 1)).unwrap().balance, 5);
	assert_eq!(account(&replayed.snapshot(), Key::new(1, 2)).unwrap().balance, 7);

	assert_eq!(listener.replayed.entries(), vec![Some(last)]);
	assert_eq!(handle.last_processed_position().join().unwrap(), Some(last));
	assert_eq!(handle.last_written_position().join().unwrap(), Some(Position(written as u64)));

	handle.close().join().unwrap();
}

#[test]
fn test_replay_does_not_process_commands_again() {
	let log = LogStream::new(1);
	let state = StateDb::new();
	run_commands(&log, &state);
	let written = log.len();

	let listener = RecordingListener::new();
	let (_scheduler, handle) = reopen(&log, &StateDb::new(), listener.clone());
	std::thread::sleep(Duration::from_millis(50));

	assert_eq!(log.len(), written);
	assert!(listener.processed.is_empty());

	handle.close().join().unwrap();
}

#[test]
fn test_restart_on_existing_state_continues_keys() {
	let log = LogStream::new(1);
	let state = StateDb::new();
	run_commands(&log, &state);

	let scheduler = scheduler();
	let (responses, rx) = ChannelResponseWriter::new();
	let handle = accounts(&log, &state).response_writer(Arc::new(responses)).open(&scheduler).unwrap();
	wait_until_processing(&handle);

	handle.writer().write_command(open_command("carol", 0).with_request(request(1))).unwrap();
	let response = rx.recv_timeout(Duration::from_secs(5)).unwrap();
	assert_eq!(response.key, Some(Key::new(1, 3)));

	handle.close().join().unwrap();
}

#[test]
fn test_commands_written_while_stopped_are_processed_after_replay() {
	let log = LogStream::new(1);
	let state = StateDb::new();
	let last = run_commands(&log, &state);

	let pending = log.writer().write_command(open_command("dave", 0)).unwrap();
	assert!(pending > last);

	let listener = RecordingListener::new();
	let (_scheduler, handle) = reopen(&log, &state, listener.clone());
	wait_until_processed(&handle, pending);

	assert_eq!(listener.replayed.entries(), vec![Some(last)]);
	assert_eq!(listener.processed.entries(), vec![Some(pending)]);
	assert_eq!(account(&handle.state_snapshot(), Key::new(1, 3)).unwrap().owner, "dave");

	handle.close().join().unwrap();
}
