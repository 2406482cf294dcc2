// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::HashMap;

use strata_type::{Result, error::diagnostic::processing, return_error};
use tracing::trace;

use super::{CommandProcessor, EventApplier};
use crate::{
	record::{Intent, Key, RecordValue, ValueType},
	state::Transaction,
};

/// Exactly one processor per command value type and intent.
#[derive(Default)]
pub struct ProcessorRegistry {
	processors: HashMap<(ValueType, Intent), Box<dyn CommandProcessor>>,
}

impl ProcessorRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register<P>(&mut self, value_type: ValueType, intent: Intent, processor: P) -> Result<()>
	where
		P: CommandProcessor + 'static,
	{
		if self.processors.contains_key(&(value_type, intent)) {
			return_error!(processing::processor_already_registered(value_type.as_str(), intent.as_str()));
		}
		self.processors.insert((value_type, intent), Box::new(processor));
		Ok(())
	}

	pub fn get_mut(&mut self, value_type: ValueType, intent: Intent) -> Option<&mut (dyn CommandProcessor + 'static)> {
		self.processors.get_mut(&(value_type, intent)).map(|processor| processor.as_mut())
	}

	pub fn contains(&self, value_type: ValueType, intent: Intent) -> bool {
		self.processors.contains_key(&(value_type, intent))
	}

	pub fn len(&self) -> usize {
		self.processors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.processors.is_empty()
	}
}

/// Event appliers by event value type and intent.
///
/// Events without an applier do not change state.
#[derive(Default)]
pub struct EventApplierRegistry {
	appliers: HashMap<(ValueType, Intent), Box<dyn EventApplier>>,
}

impl EventApplierRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register<A>(&mut self, value_type: ValueType, intent: Intent, applier: A) -> Result<()>
	where
		A: EventApplier + 'static,
	{
		if self.appliers.contains_key(&(value_type, intent)) {
			return_error!(processing::applier_already_registered(value_type.as_str(), intent.as_str()));
		}
		self.appliers.insert((value_type, intent), Box::new(applier));
		Ok(())
	}

	pub fn apply(
		&mut self,
		value_type: ValueType,
		intent: Intent,
		key: Key,
		value: &RecordValue,
		state: &mut Transaction,
	) -> Result<()> {
		match self.appliers.get_mut(&(value_type, intent)) {
			Some(applier) => applier.apply(key, value, state),
			None => {
				trace!(%value_type, %intent, "no applier registered, event leaves state unchanged");
				Ok(())
			}
		}
	}

	pub fn contains(&self, value_type: ValueType, intent: Intent) -> bool {
		self.appliers.contains_key(&(value_type, intent))
	}
}
