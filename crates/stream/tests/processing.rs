// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

mod common;

use std::{sync::Arc, thread, time::Duration};

use common::*;
use strata_stream::{
	ChannelResponseWriter, Command, Key, LogStream, Position, ProcessingContext, RecordType, RejectionType,
	StateDb, StreamProcessorConfig, StreamProcessorPhase, TypedValue,
};
use strata_testing::{recorder::Recorder, util::wait::wait_for};

#[test]
fn test_command_produces_event_state_and_response() {
	let scheduler = scheduler();
	let log = LogStream::new(1);
	let state = StateDb::new();
	let (responses, rx) = ChannelResponseWriter::new();
	let handle = accounts(&log, &state).response_writer(Arc::new(responses)).open(&scheduler).unwrap();
	wait_until_processing(&handle);

	let position = handle.writer().write_command(open_command("alice", 0).with_request(request(7))).unwrap();

	let response = rx.recv_timeout(Duration::from_secs(5)).unwrap();
	assert_eq!(response.request.request_id, 7);
	assert_eq!(response.record_type, RecordType::Event);
	assert_eq!(response.intent, OPENED);
	let key = response.key.unwrap();
	assert_eq!(key, Key::new(1, 1));

	wait_until_processed(&handle, position);
	let events: Vec<_> = log.records().into_iter().filter(|record| record.is_event()).collect();
	assert_eq!(events.len(), 1);
	assert_eq!(events[0].source_position, Some(position));
	assert_eq!(events[0].key, Some(key));
	assert_eq!(account(&handle.state_snapshot(), key).unwrap().owner, "alice");
	assert_eq!(handle.last_written_position().join().unwrap(), Some(events[0].position));

	handle.close().join().unwrap();
}

#[test]
fn test_rejection_is_written_and_returned() {
	let scheduler = scheduler();
	let log = LogStream::new(1);
	let state = StateDb::new();
	let (responses, rx) = ChannelResponseWriter::new();
	let handle = accounts(&log, &state).response_writer(Arc::new(responses)).open(&scheduler).unwrap();
	wait_until_processing(&handle);

	let position =
		handle.writer().write_command(deposit_command(Key::new(1, 42), 5).with_request(request(3))).unwrap();

	let response = rx.recv_timeout(Duration::from_secs(5)).unwrap();
	assert!(response.is_rejection());
	let rejection = response.rejection.unwrap();
	assert_eq!(rejection.rejection_type, RejectionType::NotFound);
	assert!(rejection.reason.contains("does not exist"));

	wait_until_processed(&handle, position);
	let rejections: Vec<_> =
		log.records().into_iter().filter(|record| record.record_type() == RecordType::CommandRejection).collect();
	assert_eq!(rejections.len(), 1);
	assert_eq!(rejections[0].source_position, Some(position));
	assert!(handle.state_snapshot().scan(ACCOUNTS).is_empty());

	handle.close().join().unwrap();
}

#[test]
fn test_follow_up_commands_are_processed_in_the_same_batch() {
	let scheduler = scheduler();
	let log = LogStream::new(1);
	let state = StateDb::new();
	let listener = RecordingListener::new();
	let handle = accounts(&log, &state).listener(listener.clone()).open(&scheduler).unwrap();
	wait_until_processing(&handle);

	let position = handle.writer().write_command(open_command("bob", 10)).unwrap();
	wait_until_processed(&handle, position);
	wait_for(|| listener.skipped.len() == 3, "written batch was not skipped");

	let records = log.records();
	assert_eq!(records.len(), 4);
	assert!(records[1].is_event());
	assert!(records[2].is_command());
	assert!(records[2].processed);
	assert_eq!(records[3].intent(), DEPOSITED);
	assert!(records[1..].iter().all(|record| record.source_position == Some(position)));

	assert_eq!(account(&handle.state_snapshot(), Key::new(1, 1)).unwrap().balance, 10);
	assert_eq!(listener.processed.entries(), vec![Some(position)]);
	assert_eq!(listener.skipped.entries(), vec![Position(2), Position(3), Position(4)]);

	handle.close().join().unwrap();
}

#[test]
fn test_follow_up_commands_beyond_batch_limit_are_read_back() {
	let scheduler = scheduler();
	let log = LogStream::new(1);
	let state = StateDb::new();
	let listener = RecordingListener::new();
	let handle =
		accounts(&log, &state).max_commands_in_batch(1).listener(listener.clone()).open(&scheduler).unwrap();
	wait_until_processing(&handle);

	handle.writer().write_command(open_command("carol", 10)).unwrap();
	wait_until_processed(&handle, Position(3));

	let records = log.records();
	assert_eq!(records.len(), 4);
	assert!(records[2].is_command());
	assert!(!records[2].processed);
	assert_eq!(records[3].source_position, Some(Position(3)));

	assert_eq!(account(&handle.state_snapshot(), Key::new(1, 1)).unwrap().balance, 10);
	assert_eq!(listener.processed.entries(), vec![Some(Position(1)), Some(Position(3))]);

	handle.close().join().unwrap();
}

#[test]
fn test_side_effects_run_after_commit_until_they_succeed() {
	let scheduler = scheduler();
	let log = LogStream::new(1);
	let state = StateDb::new();
	let observed: Recorder<usize> = Recorder::new();

	let effects = observed.clone();
	let db = state.clone();
	let handle = with_appliers(&log, &state)
		.processor_fn(Account::VALUE_TYPE, OPEN, move |command: &Command, ctx: &mut ProcessingContext<'_>| {
			open_account(command, ctx)?;
			let effects = effects.clone();
			let db = db.clone();
			let mut attempts = 0;
			ctx.append_side_effect(move || {
				attempts += 1;
				effects.record(db.snapshot().scan(ACCOUNTS).len());
				attempts > 1
			});
			Ok(())
		})
		.open(&scheduler)
		.unwrap();
	wait_until_processing(&handle);

	let position = handle.writer().write_command(open_command("dave", 0)).unwrap();
	wait_until_processed(&handle, position);
	wait_for(|| observed.len() == 2, "side effect was not retried");

	assert_eq!(observed.entries(), vec![1, 1]);
	handle.close().join().unwrap();
}

#[test]
fn test_pause_stops_reading_until_resumed() {
	let scheduler = scheduler();
	let log = LogStream::new(1);
	let state = StateDb::new();
	let handle = accounts(&log, &state).open(&scheduler).unwrap();

	handle.pause().join().unwrap();
	wait_for(|| handle.phase().join().unwrap() == StreamProcessorPhase::Paused, "processor did not pause");

	let position = handle.writer().write_command(open_command("erin", 0)).unwrap();
	thread::sleep(Duration::from_millis(100));
	assert_eq!(handle.last_processed_position().join().unwrap(), None);

	handle.resume().join().unwrap();
	wait_until_processed(&handle, position);
	assert_eq!(handle.phase().join().unwrap(), StreamProcessorPhase::Processing);
	assert!(account(&handle.state_snapshot(), Key::new(1, 1)).is_some());

	handle.close().join().unwrap();
}

#[test]
fn test_closed_processor_refuses_queries() {
	let scheduler = scheduler();
	let log = LogStream::new(1);
	let state = StateDb::new();
	let handle = accounts(&log, &state).open(&scheduler).unwrap();
	wait_until_processing(&handle);

	handle.close().join().unwrap();

	let err = handle.phase().join().unwrap_err();
	assert_eq!(err.code(), "ACTOR_002");
}

#[test]
fn test_duplicate_registration_fails_build() {
	let log = LogStream::new(1);
	let state = StateDb::new();
	let err = accounts(&log, &state).processor_fn(Account::VALUE_TYPE, OPEN, open_account).build().err().unwrap();
	assert_eq!(err.code(), "PROCESSING_003");
}

#[test]
fn test_every_response_of_a_command_is_sent_in_order() {
	let scheduler = scheduler();
	let log = LogStream::new(1);
	let state = StateDb::new();
	let (responses, rx) = ChannelResponseWriter::new();
	let handle = with_appliers(&log, &state)
		.processor_fn(Account::VALUE_TYPE, OPEN, |command: &Command, ctx: &mut ProcessingContext<'_>| {
			let account: Account = command.value()?;
			let key = ctx.next_key()?;
			ctx.append_follow_up_event(key, OPENED, &account)?;
			ctx.write_event_on_command(key, OPENED, &account, command)?;
			let deposit = Deposit {
				amount: 5,
			};
			ctx.append_follow_up_event(key, DEPOSITED, &deposit)?;
			ctx.write_event_on_command(key, DEPOSITED, &deposit, command)
		})
		.response_writer(Arc::new(responses))
		.open(&scheduler)
		.unwrap();
	wait_until_processing(&handle);

	let position = handle.writer().write_command(open_command("erin", 0).with_request(request(11))).unwrap();

	let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
	let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
	assert_eq!(first.intent, OPENED);
	assert_eq!(second.intent, DEPOSITED);
	assert_eq!(first.request.request_id, 11);
	assert_eq!(second.request.request_id, 11);

	wait_until_processed(&handle, position);
	assert!(rx.try_recv().is_err());
	assert_eq!(account(&handle.state_snapshot(), Key::new(1, 1)).unwrap().balance, 5);
	handle.close().join().unwrap();
}

#[test]
fn test_zero_batch_limit_from_config_still_processes_commands() {
	let scheduler = scheduler();
	let log = LogStream::new(1);
	let state = StateDb::new();
	let handle = accounts(&log, &state)
		.config(StreamProcessorConfig {
			max_commands_in_batch: 0,
			..StreamProcessorConfig::default()
		})
		.open(&scheduler)
		.unwrap();
	wait_until_processing(&handle);

	let position = handle.writer().write_command(open_command("frank", 0)).unwrap();
	wait_until_processed(&handle, position);

	assert_eq!(log.len(), 2);
	assert!(log.records()[1].is_event());
	assert_eq!(account(&handle.state_snapshot(), Key::new(1, 1)).unwrap().owner, "frank");
	handle.close().join().unwrap();
}
