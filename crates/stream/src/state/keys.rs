// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_type::Result;

use super::{ColumnFamily, Transaction};
use crate::record::{Key, PartitionId};

const NEXT_KEY: &[u8] = b"next";

/// Generates entity keys for one partition.
///
/// The counter lives in state and is advanced inside the processing
/// transaction, so a rolled back command releases its keys and replay
/// continues with the same keys processing would have produced.
#[derive(Debug, Clone, Copy)]
pub struct KeyGenerator {
	partition: PartitionId,
}

impl KeyGenerator {
	pub fn new(partition: PartitionId) -> Self {
		Self {
			partition,
		}
	}

	pub fn partition(&self) -> PartitionId {
		self.partition
	}

	pub fn next_key(&self, txn: &mut Transaction) -> Result<Key> {
		let next = self.current(txn)? + 1;
		txn.put(ColumnFamily::KEY, NEXT_KEY, &next)?;
		Ok(Key::new(self.partition, next))
	}

	/// Local part of the last generated key, `0` if none was generated.
	pub fn current(&self, txn: &Transaction) -> Result<u64> {
		Ok(txn.get::<u64>(ColumnFamily::KEY, NEXT_KEY)?.unwrap_or(0))
	}

	/// Moves the counter past `key` if the key belongs to this partition
	/// and is higher than every key generated so far.
	pub fn set_key_if_higher(&self, txn: &mut Transaction, key: Key) -> Result<()> {
		if key.partition() != self.partition {
			return Ok(());
		}
		if key.local() > self.current(txn)? {
			txn.put(ColumnFamily::KEY, NEXT_KEY, &key.local())?;
		}
		Ok(())
	}
}
