// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_type::Result;

use super::{ColumnFamily, StateSnapshot, Transaction};
use crate::record::Position;

const LAST_PROCESSED: &[u8] = b"last_processed";

/// Position of the last command whose effects are part of the state.
///
/// Written in the same transaction as the command's effects, so state and
/// position never disagree.
pub struct LastProcessedPositionState;

impl LastProcessedPositionState {
	pub fn get(txn: &Transaction) -> Result<Option<Position>> {
		Ok(txn.get::<u64>(ColumnFamily::LAST_PROCESSED_POSITION, LAST_PROCESSED)?.map(Position))
	}

	pub fn get_from_snapshot(snapshot: &StateSnapshot) -> Result<Option<Position>> {
		Ok(snapshot.get::<u64>(ColumnFamily::LAST_PROCESSED_POSITION, LAST_PROCESSED)?.map(Position))
	}

	pub fn mark_as_processed(txn: &mut Transaction, position: Position) -> Result<()> {
		txn.put(ColumnFamily::LAST_PROCESSED_POSITION, LAST_PROCESSED, &position.0)
	}
}
