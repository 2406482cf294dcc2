// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![allow(dead_code)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strata_runtime::{ActorScheduler, SchedulerBuilder};
use strata_stream::{
	ColumnFamily, Command, Intent, Key, LogAppendEntry, LogStream, Position, ProcessingContext, Record,
	RecordValue, RejectionType, RequestMetadata, StateDb, StateSnapshot, StreamProcessorBuilder,
	StreamProcessorHandle, StreamProcessorListener, StreamProcessorPhase, Transaction, TypedValue, ValueType,
};
use strata_testing::{recorder::Recorder, util::wait::wait_for};
use strata_type::Result;

pub const ACCOUNTS: ColumnFamily = ColumnFamily("accounts");

pub const OPEN: Intent = Intent("OPEN");
pub const OPENED: Intent = Intent("OPENED");
pub const DEPOSIT: Intent = Intent("DEPOSIT");
pub const DEPOSITED: Intent = Intent("DEPOSITED");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
	pub owner: String,
	pub balance: u64,
	/// Deposit made right after opening, as a follow-up command.
	pub bonus: u64,
}

impl TypedValue for Account {
	const VALUE_TYPE: ValueType = ValueType("ACCOUNT");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
	pub amount: u64,
}

impl TypedValue for Deposit {
	const VALUE_TYPE: ValueType = ValueType("DEPOSIT");
}

pub fn scheduler() -> ActorScheduler {
	SchedulerBuilder::new().worker_threads(2).build().unwrap()
}

pub fn open_account(command: &Command, ctx: &mut ProcessingContext<'_>) -> Result<()> {
	let account: Account = command.value()?;
	let key = ctx.next_key()?;
	ctx.append_follow_up_event(key, OPENED, &account)?;
	if account.bonus > 0 {
		ctx.append_follow_up_command(
			Some(key),
			DEPOSIT,
			&Deposit {
				amount: account.bonus,
			},
		)?;
	}
	ctx.write_event_on_command(key, OPENED, &account, command)
}

pub fn deposit(command: &Command, ctx: &mut ProcessingContext<'_>) -> Result<()> {
	let deposit: Deposit = command.value()?;
	let Some(key) = command.key else {
		return ctx.reject(RejectionType::InvalidArgument, "deposit without account key");
	};
	if ctx.state().get::<Account>(ACCOUNTS, key.to_be_bytes())?.is_none() {
		return ctx.reject(RejectionType::NotFound, format!("account {} does not exist", key));
	}
	ctx.append_follow_up_event(key, DEPOSITED, &deposit)?;
	ctx.write_event_on_command(key, DEPOSITED, &deposit, command)
}

pub fn apply_opened(key: Key, value: &RecordValue, state: &mut Transaction) -> Result<()> {
	let account: Account = value.decode()?;
	state.put(ACCOUNTS, key.to_be_bytes(), &account)
}

pub fn apply_deposited(key: Key, value: &RecordValue, state: &mut Transaction) -> Result<()> {
	let deposit: Deposit = value.decode()?;
	let mut account: Account = state.get(ACCOUNTS, key.to_be_bytes())?.unwrap_or(Account {
		owner: String::new(),
		balance: 0,
		bonus: 0,
	});
	account.balance += deposit.amount;
	state.put(ACCOUNTS, key.to_be_bytes(), &account)
}

/// A builder with the account appliers but no processors.
pub fn with_appliers(log: &LogStream, state: &StateDb) -> StreamProcessorBuilder {
	StreamProcessorBuilder::new(log.clone(), state.clone())
		.applier_fn(Account::VALUE_TYPE, OPENED, apply_opened)
		.applier_fn(Deposit::VALUE_TYPE, DEPOSITED, apply_deposited)
}

/// A builder with the account processors and appliers registered.
pub fn accounts(log: &LogStream, state: &StateDb) -> StreamProcessorBuilder {
	with_appliers(log, state)
		.processor_fn(Account::VALUE_TYPE, OPEN, open_account)
		.processor_fn(Deposit::VALUE_TYPE, DEPOSIT, deposit)
}

pub fn request(id: u64) -> RequestMetadata {
	RequestMetadata {
		request_id: id,
		request_stream_id: 1,
	}
}

pub fn open_command(owner: &str, bonus: u64) -> LogAppendEntry {
	LogAppendEntry::command(
		None,
		OPEN,
		&Account {
			owner: owner.to_string(),
			balance: 0,
			bonus,
		},
	)
	.unwrap()
}

pub fn deposit_command(key: Key, amount: u64) -> LogAppendEntry {
	LogAppendEntry::command(
		Some(key),
		DEPOSIT,
		&Deposit {
			amount,
		},
	)
	.unwrap()
}

pub fn account(snapshot: &StateSnapshot, key: Key) -> Option<Account> {
	snapshot.get(ACCOUNTS, key.to_be_bytes()).unwrap()
}

pub fn wait_until_processing(handle: &StreamProcessorHandle) {
	wait_for(|| handle.phase().join().unwrap() == StreamProcessorPhase::Processing, "processing did not start");
}

pub fn wait_until_processed(handle: &StreamProcessorHandle, position: Position) {
	wait_for(
		|| handle.last_processed_position().join().unwrap() >= Some(position),
		&format!("command at {} was not processed", position),
	);
}

/// Records every listener callback.
#[derive(Clone, Default)]
pub struct RecordingListener {
	pub processed: Recorder<Option<Position>>,
	pub skipped: Recorder<Position>,
	pub replayed: Recorder<Option<Position>>,
}

impl RecordingListener {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			processed: Recorder::new(),
			skipped: Recorder::new(),
			replayed: Recorder::new(),
		})
	}
}

impl StreamProcessorListener for RecordingListener {
	fn on_processed(&self, command: &Command) {
		self.processed.record(command.position);
	}

	fn on_skipped(&self, record: &Record) {
		self.skipped.record(record.position);
	}

	fn on_replayed(&self, last_processed: Option<Position>) {
		self.replayed.record(last_processed);
	}
}
