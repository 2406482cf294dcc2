// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Transactional partition state.
//!
//! State is a sorted key-value map split into column families. It is only
//! mutated by the partition's processing actor, through a [`Transaction`]
//! whose writes stay pending until [`Transaction::commit`]. Other threads read
//! through a [`StateSnapshot`], which never observes a partial commit.

mod keys;
mod position;

use std::{
	collections::BTreeMap,
	fmt::{Display, Formatter},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};

pub use keys::KeyGenerator;
use parking_lot::RwLock;
pub use position::LastProcessedPositionState;
use serde::{Serialize, de::DeserializeOwned};
use strata_type::{Result, error, error::diagnostic::state, return_error};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnFamily(pub &'static str);

impl ColumnFamily {
	pub const DEFAULT: ColumnFamily = ColumnFamily("default");
	pub const KEY: ColumnFamily = ColumnFamily("key");
	pub const LAST_PROCESSED_POSITION: ColumnFamily = ColumnFamily("last_processed_position");
}

impl Display for ColumnFamily {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.0)
	}
}

type StateKey = (ColumnFamily, Vec<u8>);
type Store = BTreeMap<StateKey, Vec<u8>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
	Set(Vec<u8>),
	Remove,
}

struct StateInner {
	data: RwLock<Arc<Store>>,
	frozen: AtomicBool,
}

/// Partition state. Clones share the same data.
#[derive(Clone)]
pub struct StateDb {
	inner: Arc<StateInner>,
}

impl Default for StateDb {
	fn default() -> Self {
		Self::new()
	}
}

impl StateDb {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(StateInner {
				data: RwLock::new(Arc::new(Store::new())),
				frozen: AtomicBool::new(false),
			}),
		}
	}

	pub fn transaction(&self) -> Transaction {
		Transaction {
			db: self.clone(),
			pending: BTreeMap::new(),
		}
	}

	/// A consistent view of the last committed state.
	pub fn snapshot(&self) -> StateSnapshot {
		StateSnapshot {
			data: self.inner.data.read().clone(),
		}
	}

	/// While frozen, commits fail with a recoverable `STATE_002`.
	pub fn freeze(&self) {
		self.inner.frozen.store(true, Ordering::SeqCst);
	}

	pub fn unfreeze(&self) {
		self.inner.frozen.store(false, Ordering::SeqCst);
	}

	pub fn is_frozen(&self) -> bool {
		self.inner.frozen.load(Ordering::SeqCst)
	}

	fn committed(&self, key: &StateKey) -> Option<Vec<u8>> {
		self.inner.data.read().get(key).cloned()
	}
}

/// A read-write transaction on [`StateDb`].
///
/// Reads see the transaction's own pending writes. Dropping an uncommitted
/// transaction discards its writes.
pub struct Transaction {
	db: StateDb,
	pending: BTreeMap<StateKey, Pending>,
}

impl Transaction {
	pub fn get<V: DeserializeOwned>(&self, cf: ColumnFamily, key: impl AsRef<[u8]>) -> Result<Option<V>> {
		match self.get_raw(cf, key) {
			Some(bytes) => decode(cf, &bytes).map(Some),
			None => Ok(None),
		}
	}

	pub fn get_raw(&self, cf: ColumnFamily, key: impl AsRef<[u8]>) -> Option<Vec<u8>> {
		let key = (cf, key.as_ref().to_vec());
		match self.pending.get(&key) {
			Some(Pending::Set(value)) => Some(value.clone()),
			Some(Pending::Remove) => None,
			None => self.db.committed(&key),
		}
	}

	pub fn exists(&self, cf: ColumnFamily, key: impl AsRef<[u8]>) -> bool {
		self.get_raw(cf, key).is_some()
	}

	pub fn put<V: Serialize>(&mut self, cf: ColumnFamily, key: impl AsRef<[u8]>, value: &V) -> Result<()> {
		let bytes = postcard::to_stdvec(value)?;
		self.put_raw(cf, key, bytes);
		Ok(())
	}

	pub fn put_raw(&mut self, cf: ColumnFamily, key: impl AsRef<[u8]>, value: Vec<u8>) {
		self.pending.insert((cf, key.as_ref().to_vec()), Pending::Set(value));
	}

	pub fn delete(&mut self, cf: ColumnFamily, key: impl AsRef<[u8]>) {
		self.pending.insert((cf, key.as_ref().to_vec()), Pending::Remove);
	}

	/// Every entry of `cf` in key order, including pending writes.
	pub fn scan(&self, cf: ColumnFamily) -> Vec<(Vec<u8>, Vec<u8>)> {
		let mut entries: BTreeMap<Vec<u8>, Vec<u8>> = {
			let data = self.db.inner.data.read();
			data.iter().filter(|((family, _), _)| *family == cf).map(|((_, k), v)| (k.clone(), v.clone())).collect()
		};
		for ((family, key), pending) in &self.pending {
			if *family != cf {
				continue;
			}
			match pending {
				Pending::Set(value) => {
					entries.insert(key.clone(), value.clone());
				}
				Pending::Remove => {
					entries.remove(key);
				}
			}
		}
		entries.into_iter().collect()
	}

	pub fn is_dirty(&self) -> bool {
		!self.pending.is_empty()
	}

	/// Applies every pending write atomically.
	///
	/// The transaction stays usable and starts empty after a successful
	/// commit. On failure the pending writes are kept.
	pub fn commit(&mut self) -> Result<()> {
		if self.db.is_frozen() {
			return_error!(state::commit_failed("state is frozen"));
		}
		if self.pending.is_empty() {
			return Ok(());
		}

		let pending = std::mem::take(&mut self.pending);
		let count = pending.len();
		{
			let mut data = self.db.inner.data.write();
			let store = Arc::make_mut(&mut *data);
			for (key, change) in pending {
				match change {
					Pending::Set(value) => {
						store.insert(key, value);
					}
					Pending::Remove => {
						store.remove(&key);
					}
				}
			}
		}
		trace!(writes = count, "state committed");
		Ok(())
	}

	pub fn rollback(&mut self) {
		self.pending.clear();
	}
}

/// Read-only view of committed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
	data: Arc<Store>,
}

impl StateSnapshot {
	pub fn get<V: DeserializeOwned>(&self, cf: ColumnFamily, key: impl AsRef<[u8]>) -> Result<Option<V>> {
		match self.data.get(&(cf, key.as_ref().to_vec())) {
			Some(bytes) => decode(cf, bytes).map(Some),
			None => Ok(None),
		}
	}

	pub fn scan(&self, cf: ColumnFamily) -> Vec<(Vec<u8>, Vec<u8>)> {
		self.data
			.iter()
			.filter(|((family, _), _)| *family == cf)
			.map(|((_, key), value)| (key.clone(), value.clone()))
			.collect()
	}

	pub fn len(&self) -> usize {
		self.data.len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// Compares every column family except `excluded`.
	pub fn same_content_except(&self, other: &StateSnapshot, excluded: &[ColumnFamily]) -> bool {
		retained(&self.data, excluded).eq(retained(&other.data, excluded))
	}
}

fn retained<'a>(store: &'a Store, excluded: &'a [ColumnFamily]) -> impl Iterator<Item = (&'a StateKey, &'a Vec<u8>)> + 'a {
	store.iter().filter(move |((family, _), _)| !excluded.contains(family))
}

fn decode<V: DeserializeOwned>(cf: ColumnFamily, bytes: &[u8]) -> Result<V> {
	postcard::from_bytes(bytes).map_err(|_| error!(state::corrupt_value(cf.0)))
}

#[cfg(test)]
mod tests {
	use super::*;

	const ACCOUNTS: ColumnFamily = ColumnFamily("accounts");

	#[test]
	fn test_reads_see_own_writes() {
		let db = StateDb::new();
		let mut txn = db.transaction();
		txn.put(ACCOUNTS, b"a", &10u64).unwrap();

		assert_eq!(txn.get::<u64>(ACCOUNTS, b"a").unwrap(), Some(10));
		assert_eq!(db.snapshot().get::<u64>(ACCOUNTS, b"a").unwrap(), None);
	}

	#[test]
	fn test_commit_publishes_writes() {
		let db = StateDb::new();
		let mut txn = db.transaction();
		txn.put(ACCOUNTS, b"a", &10u64).unwrap();
		txn.commit().unwrap();

		assert!(!txn.is_dirty());
		assert_eq!(db.snapshot().get::<u64>(ACCOUNTS, b"a").unwrap(), Some(10));
	}

	#[test]
	fn test_rollback_discards_writes() {
		let db = StateDb::new();
		let mut txn = db.transaction();
		txn.put(ACCOUNTS, b"a", &10u64).unwrap();
		txn.rollback();
		txn.commit().unwrap();

		assert!(db.snapshot().is_empty());
	}

	#[test]
	fn test_snapshot_is_stable() {
		let db = StateDb::new();
		let mut txn = db.transaction();
		txn.put(ACCOUNTS, b"a", &1u64).unwrap();
		txn.commit().unwrap();

		let before = db.snapshot();
		txn.put(ACCOUNTS, b"a", &2u64).unwrap();
		txn.delete(ACCOUNTS, b"a");
		txn.put(ACCOUNTS, b"b", &3u64).unwrap();
		txn.commit().unwrap();

		assert_eq!(before.get::<u64>(ACCOUNTS, b"a").unwrap(), Some(1));
		assert_eq!(before.len(), 1);
		let after = db.snapshot();
		assert_eq!(after.get::<u64>(ACCOUNTS, b"a").unwrap(), None);
		assert_eq!(after.get::<u64>(ACCOUNTS, b"b").unwrap(), Some(3));
	}

	#[test]
	fn test_scan_merges_pending() {
		let db = StateDb::new();
		let mut txn = db.transaction();
		txn.put(ACCOUNTS, b"a", &1u64).unwrap();
		txn.put(ACCOUNTS, b"b", &2u64).unwrap();
		txn.put(ColumnFamily::DEFAULT, b"x", &0u64).unwrap();
		txn.commit().unwrap();

		txn.delete(ACCOUNTS, b"a");
		txn.put(ACCOUNTS, b"c", &3u64).unwrap();

		let keys: Vec<Vec<u8>> = txn.scan(ACCOUNTS).into_iter().map(|(k, _)| k).collect();
		assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec()]);
	}

	#[test]
	fn test_frozen_commit_is_recoverable() {
		let db = StateDb::new();
		let mut txn = db.transaction();
		txn.put(ACCOUNTS, b"a", &1u64).unwrap();

		db.freeze();
		let err = txn.commit().unwrap_err();
		assert_eq!(err.code(), "STATE_002");
		assert!(err.is_recoverable());

		db.unfreeze();
		txn.commit().unwrap();
		assert_eq!(db.snapshot().get::<u64>(ACCOUNTS, b"a").unwrap(), Some(1));
	}

	#[test]
	fn test_corrupt_value() {
		let db = StateDb::new();
		let mut txn = db.transaction();
		txn.put_raw(ACCOUNTS, b"a", vec![0xff, 0xff]);
		let err = txn.get::<String>(ACCOUNTS, b"a").unwrap_err();
		assert_eq!(err.code(), "STATE_003");
	}

	#[test]
	fn test_same_content_except() {
		let left = StateDb::new();
		let right = StateDb::new();
		for (db, marker) in [(&left, 1u64), (&right, 2u64)] {
			let mut txn = db.transaction();
			txn.put(ACCOUNTS, b"a", &5u64).unwrap();
			txn.put(ColumnFamily::KEY, b"k", &marker).unwrap();
			txn.commit().unwrap();
		}

		assert!(!left.snapshot().same_content_except(&right.snapshot(), &[]));
		assert!(left.snapshot().same_content_except(&right.snapshot(), &[ColumnFamily::KEY]));
	}
}
