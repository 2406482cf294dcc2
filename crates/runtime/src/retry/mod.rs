// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Retry strategies.
//!
//! A strategy repeatedly runs an operation on its actor until the operation
//! reports success, a terminate condition holds, or an error aborts the
//! sequence. A panicking operation or terminate condition aborts the sequence
//! with `ACTOR_003`. Every retry is a freshly submitted job, so other jobs of the
//! actor interleave between attempts and the worker thread is never held.
//!
//! One strategy instance runs one sequence at a time. Starting a second
//! sequence while one is in flight fails with `RETRY_001`.

use std::{
	any::Any,
	panic::{self, AssertUnwindSafe},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};

use strata_type::{Error, Result, error, error::diagnostic::retry};
use tracing::{debug, trace, warn};

use crate::{
	actor::{Actor, ActorControl, ActorError, panic_message},
	future::ActorFuture,
};

mod abortable;
mod backoff;
mod deadline;
mod recoverable;

pub use abortable::AbortableRetryStrategy;
pub use backoff::{BackoffConfig, BackoffRetryStrategy};
pub use deadline::Deadline;
pub use recoverable::RecoverableRetryStrategy;

/// An operation run by a strategy. Returns `Ok(true)` on success and
/// `Ok(false)` to be retried.
pub trait OperationToRetry<A>: FnMut(&mut A) -> Result<bool> + Send + 'static {}

impl<A, F> OperationToRetry<A> for F where F: FnMut(&mut A) -> Result<bool> + Send + 'static {}

/// Checked after an attempt did not succeed. Returning `true` ends the
/// sequence with `false`.
pub trait TerminateCondition<A>: FnMut(&mut A) -> bool + Send + 'static {}

impl<A, F> TerminateCondition<A> for F where F: FnMut(&mut A) -> bool + Send + 'static {}

pub trait RetryStrategy<A: Actor> {
	/// Retries `op` until it succeeds or fails with an error that aborts the
	/// sequence.
	fn run_with_retry<Op>(&self, op: Op) -> ActorFuture<bool>
	where
		Op: OperationToRetry<A>,
	{
		self.run_with_retry_until(op, |_: &mut A| false)
	}

	/// Retries `op` until it succeeds, `terminate` holds after an
	/// unsuccessful attempt, or an error aborts the sequence.
	///
	/// The future resolves to `true` on success, to `false` when terminated
	/// and fails with the aborting error otherwise.
	fn run_with_retry_until<Op, T>(&self, op: Op, terminate: T) -> ActorFuture<bool>
	where
		Op: OperationToRetry<A>,
		T: TerminateCondition<A>;
}

/// How a sequence reacts to errors and how it schedules the next attempt.
#[derive(Debug, Clone)]
pub(crate) enum RetryPolicy {
	/// Recoverable errors are retried, everything else aborts.
	Recoverable,
	/// Every error aborts.
	Abortable,
	/// Like `Recoverable`, with a growing delay between attempts.
	Backoff(BackoffConfig),
}

impl RetryPolicy {
	fn name(&self) -> &'static str {
		match self {
			RetryPolicy::Recoverable => "recoverable",
			RetryPolicy::Abortable => "abortable",
			RetryPolicy::Backoff(_) => "backoff",
		}
	}

	fn retries_recoverable_errors(&self) -> bool {
		!matches!(self, RetryPolicy::Abortable)
	}
}

/// Starts a retry sequence guarded by `in_flight`.
pub(crate) fn start_sequence<A, Op, T>(
	control: &ActorControl<A>,
	in_flight: &Arc<AtomicBool>,
	policy: RetryPolicy,
	op: Op,
	terminate: T,
) -> ActorFuture<bool>
where
	A: Actor,
	Op: OperationToRetry<A>,
	T: TerminateCondition<A>,
{
	if in_flight.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
		return ActorFuture::failed(error!(retry::sequence_in_flight()));
	}

	let result = ActorFuture::new();
	let run = RetryRun {
		op: Box::new(op),
		terminate: Box::new(terminate),
		result: result.clone(),
		in_flight: in_flight.clone(),
		policy,
		attempts: 0,
		actor: control.name().to_string(),
		finished: false,
	};
	control.run(move |actor, control| run.attempt(actor, control));
	result
}

/// State of one retry sequence. It moves from job to job and is dropped when
/// the sequence ends.
struct RetryRun<A> {
	op: Box<dyn FnMut(&mut A) -> Result<bool> + Send>,
	terminate: Box<dyn FnMut(&mut A) -> bool + Send>,
	result: ActorFuture<bool>,
	in_flight: Arc<AtomicBool>,
	policy: RetryPolicy,
	attempts: u32,
	actor: String,
	finished: bool,
}

impl<A: Actor> RetryRun<A> {
	fn attempt(mut self, actor: &mut A, control: &ActorControl<A>) {
		self.attempts += 1;

		let outcome = match panic::catch_unwind(AssertUnwindSafe(|| (self.op)(actor))) {
			Ok(outcome) => outcome,
			Err(payload) => {
				let err = self.panicked(payload.as_ref());
				return self.finish(Err(err));
			}
		};

		match outcome {
			Ok(true) => self.finish(Ok(true)),
			Ok(false) => self.retry_or_terminate(actor, control),
			Err(err) if err.is_recoverable() && self.policy.retries_recoverable_errors() => {
				debug!(
					actor = %self.actor,
					strategy = self.policy.name(),
					attempt = self.attempts,
					code = %err.code,
					"recoverable failure, retrying"
				);
				self.retry_or_terminate(actor, control);
			}
			Err(err) => {
				debug!(
					actor = %self.actor,
					strategy = self.policy.name(),
					attempt = self.attempts,
					code = %err.code,
					"retry aborted"
				);
				self.finish(Err(err));
			}
		}
	}

	fn retry_or_terminate(mut self, actor: &mut A, control: &ActorControl<A>) {
		match panic::catch_unwind(AssertUnwindSafe(|| (self.terminate)(actor))) {
			Ok(true) => self.finish(Ok(false)),
			Ok(false) => self.retry(control),
			Err(payload) => {
				let err = self.panicked(payload.as_ref());
				self.finish(Err(err));
			}
		}
	}

	fn panicked(&self, payload: &(dyn Any + Send)) -> Error {
		let reason = panic_message(payload);
		warn!(actor = %self.actor, attempt = self.attempts, reason = %reason, "retry operation panicked");
		ActorError::Panicked {
			name: self.actor.clone(),
			reason,
		}
		.into()
	}

	fn retry(self, control: &ActorControl<A>) {
		trace!(actor = %self.actor, attempt = self.attempts, "scheduling next attempt");
		let delay = match &self.policy {
			RetryPolicy::Backoff(config) => Some(config.delay_for(self.attempts)),
			RetryPolicy::Recoverable | RetryPolicy::Abortable => None,
		};
		match delay {
			Some(delay) => {
				control.schedule(delay, move |actor, control| self.attempt(actor, control));
			}
			None => {
				control.submit(move |actor, control| self.attempt(actor, control));
			}
		}
	}

	fn finish(mut self, result: Result<bool>) {
		self.finished = true;
		self.in_flight.store(false, Ordering::SeqCst);
		self.result.complete_with(result);
	}
}

impl<A> Drop for RetryRun<A> {
	fn drop(&mut self) {
		if self.finished {
			return;
		}
		// the actor refused or dropped the next attempt
		self.in_flight.store(false, Ordering::SeqCst);
		self.result.complete_exceptionally(
			ActorError::Closed {
				name: std::mem::take(&mut self.actor),
			}
			.into(),
		);
	}
}
