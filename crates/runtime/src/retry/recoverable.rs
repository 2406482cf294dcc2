// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::{Arc, atomic::AtomicBool};

use super::{OperationToRetry, RetryPolicy, RetryStrategy, TerminateCondition, start_sequence};
use crate::{
	actor::{Actor, ActorControl},
	future::ActorFuture,
};

/// Retries unsuccessful attempts and recoverable errors. Any other error
/// aborts the sequence.
pub struct RecoverableRetryStrategy<A: Actor> {
	control: ActorControl<A>,
	in_flight: Arc<AtomicBool>,
}

impl<A: Actor> RecoverableRetryStrategy<A> {
	pub fn new(control: ActorControl<A>) -> Self {
		Self {
			control,
			in_flight: Arc::new(AtomicBool::new(false)),
		}
	}
}

impl<A: Actor> RetryStrategy<A> for RecoverableRetryStrategy<A> {
	fn run_with_retry_until<Op, T>(&self, op: Op, terminate: T) -> ActorFuture<bool>
	where
		Op: OperationToRetry<A>,
		T: TerminateCondition<A>,
	{
		start_sequence(&self.control, &self.in_flight, RetryPolicy::Recoverable, op, terminate)
	}
}
