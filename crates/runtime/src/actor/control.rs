// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! The handle through which code submits work to an actor.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use strata_type::{Error, Result};

use crate::{
	actor::{
		cell::ActorCore,
		error::ActorError,
		timers::TimerHandle,
		traits::{Actor, ActorPhase},
	},
	future::ActorFuture,
};

/// Handle to a running actor.
///
/// Every job submitted through a control runs on the actor's own execution
/// context with exclusive access to the actor. Controls are cheap to clone and
/// can be used from any thread.
pub struct ActorControl<A: Actor> {
	pub(crate) core: Arc<ActorCore<A>>,
}

impl<A: Actor> Clone for ActorControl<A> {
	fn clone(&self) -> Self {
		Self {
			core: self.core.clone(),
		}
	}
}

impl<A: Actor> ActorControl<A> {
	pub(crate) fn from_core(core: Arc<ActorCore<A>>) -> Self {
		Self {
			core,
		}
	}

	pub fn name(&self) -> &str {
		&self.core.name
	}

	pub fn phase(&self) -> ActorPhase {
		self.core.phase()
	}

	/// Returns `true` once a close was requested, even before the actor
	/// reached [`ActorPhase::Closing`].
	pub fn is_closing(&self) -> bool {
		self.core.is_close_requested() || self.core.phase().is_terminal()
	}

	/// Returns `true` when called from a job of this actor.
	pub fn is_current_actor(&self) -> bool {
		self.core.is_current()
	}

	/// Runs `job` on the actor.
	///
	/// From inside the actor, the job runs right after the current job, ahead
	/// of jobs queued with [`submit`](Self::submit). From anywhere else it
	/// behaves like `submit`. Returns `false` if the actor refused the job
	/// because it is closing or closed.
	pub fn run<F>(&self, job: F) -> bool
	where
		F: FnOnce(&mut A, &ActorControl<A>) + Send + 'static,
	{
		self.core.submit(Box::new(job), true)
	}

	/// Appends `job` to the actor's queue.
	///
	/// Jobs submitted from the same thread run in submission order. Returns
	/// `false` if the actor refused the job because it is closing or closed.
	pub fn submit<F>(&self, job: F) -> bool
	where
		F: FnOnce(&mut A, &ActorControl<A>) + Send + 'static,
	{
		self.core.submit(Box::new(job), false)
	}

	/// Runs `f` on the actor and completes the returned future with its
	/// result.
	///
	/// The future fails with `ACTOR_002` if the actor refuses the job or
	/// terminates before running it.
	pub fn call<T, F>(&self, f: F) -> ActorFuture<T>
	where
		T: Clone + Send + 'static,
		F: FnOnce(&mut A, &ActorControl<A>) -> T + Send + 'static,
	{
		let future = ActorFuture::new();
		let pending = PendingCall {
			future: future.clone(),
			name: self.core.name.clone(),
		};
		self.core.submit(
			Box::new(move |actor, control| {
				pending.future.complete(f(actor, control));
			}),
			false,
		);
		future
	}

	/// Runs `job` on the actor once `delay` has elapsed.
	///
	/// Cancelling the returned handle before the job started prevents it.
	pub fn schedule<F>(&self, delay: Duration, job: F) -> TimerHandle
	where
		F: FnOnce(&mut A, &ActorControl<A>) + Send + 'static,
	{
		self.core.schedule(delay, Box::new(job))
	}

	/// Runs `job` on the actor every `period` until the handle is cancelled
	/// or the actor closes.
	///
	/// The next invocation is scheduled once the previous one finished, so
	/// invocations never overlap and never pile up behind a busy actor.
	pub fn run_at_fixed_rate<F>(&self, period: Duration, job: F) -> TimerHandle
	where
		F: FnMut(&mut A, &ActorControl<A>) + Send + 'static,
	{
		self.core.schedule_at_fixed_rate(period, job)
	}

	/// Runs `callback` on the actor once `future` completed.
	///
	/// The callback runs exactly once, as a job of this actor, even if the
	/// future was already completed. It is dropped if the actor closes first.
	pub fn run_on_completion<T, F>(&self, future: &ActorFuture<T>, callback: F)
	where
		T: Clone + Send + 'static,
		F: FnOnce(&mut A, &ActorControl<A>, Result<T>) + Send + 'static,
	{
		let core = self.core.clone();
		future.on_complete(move |result| {
			core.submit_internal(Box::new(move |actor, control| callback(actor, control, result)));
		});
	}

	/// Runs `callback` on the actor once every future in `futures` completed.
	///
	/// The callback receives the first error by completion order, if any.
	pub fn run_on_completion_all<T, F>(&self, futures: Vec<ActorFuture<T>>, callback: F)
	where
		T: Clone + Send + 'static,
		F: FnOnce(&mut A, &ActorControl<A>, Result<()>) + Send + 'static,
	{
		let waiter = ActorFuture::<()>::new();
		self.run_on_completion(&waiter, callback);

		if futures.is_empty() {
			waiter.complete(());
			return;
		}

		let progress: Arc<Mutex<(usize, Option<Error>)>> = Arc::new(Mutex::new((futures.len(), None)));
		for future in futures {
			let progress = progress.clone();
			let waiter = waiter.clone();
			future.on_complete(move |result| {
				let outcome = {
					let mut guard = progress.lock();
					if let Err(err) = result {
						guard.1.get_or_insert(err);
					}
					guard.0 -= 1;
					if guard.0 > 0 {
						return;
					}
					guard.1.take()
				};
				match outcome {
					None => waiter.complete(()),
					Some(err) => waiter.complete_exceptionally(err),
				};
			});
		}
	}

	/// Ends the actor's current turn after the running job, giving other
	/// actors a chance to run on this worker. No-op outside the actor.
	pub fn yield_now(&self) {
		self.core.request_yield();
	}

	/// Moves the actor into [`ActorPhase::Failed`] once the current job
	/// finished. Pending jobs are dropped.
	pub fn fail(&self, error: Error) {
		self.core.request_failure(error);
	}

	/// Requests the actor to close.
	///
	/// Jobs queued before the request still run. The returned future
	/// completes once the actor is closed; repeated calls return the same
	/// future.
	pub fn close(&self) -> ActorFuture<()> {
		self.core.close()
	}

	/// Completes once the actor finished starting, or fails if startup failed.
	pub fn started(&self) -> ActorFuture<()> {
		self.core.started()
	}

	/// Completes once the actor is closed or failed.
	pub fn closed(&self) -> ActorFuture<()> {
		self.core.closed()
	}
}

/// Fails the call's future if its job is dropped without running.
struct PendingCall<T: Clone + Send + 'static> {
	future: ActorFuture<T>,
	name: String,
}

impl<T: Clone + Send + 'static> Drop for PendingCall<T> {
	fn drop(&mut self) {
		if !self.future.is_done() {
			self.future.complete_exceptionally(
				ActorError::Closed {
					name: std::mem::take(&mut self.name),
				}
				.into(),
			);
		}
	}
}
