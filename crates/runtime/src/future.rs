// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Completion handles for asynchronous actor results.
//!
//! An [`ActorFuture`] starts pending and is completed exactly once, either with
//! a value or with an error. Continuations registered with
//! [`on_complete`](ActorFuture::on_complete) run exactly once with the final
//! result. Actors never wait on a future directly; they register a
//! continuation through
//! [`ActorControl::run_on_completion`](crate::actor::ActorControl::run_on_completion),
//! which runs it as a job on the registering actor.

use std::{
	fmt::{Debug, Formatter},
	sync::Arc,
	time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use strata_type::{Error, Result, error, error::diagnostic::future};
use tracing::warn;

use crate::actor::context::is_actor_thread;

type Callback<T> = Box<dyn FnOnce(Result<T>) + Send>;

enum State<T> {
	Pending(Vec<Callback<T>>),
	Completed(Result<T>),
}

struct Inner<T> {
	state: Mutex<State<T>>,
	completed: Condvar,
}

/// A result that becomes available asynchronously.
///
/// Cloning yields another handle to the same result.
pub struct ActorFuture<T> {
	inner: Arc<Inner<T>>,
}

/// The completing side of an [`ActorFuture`]. Both sides share one type.
pub type CompletableActorFuture<T> = ActorFuture<T>;

impl<T> Clone for ActorFuture<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T: Clone + Send + 'static> Default for ActorFuture<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Clone + Send + 'static> ActorFuture<T> {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Inner {
				state: Mutex::new(State::Pending(Vec::new())),
				completed: Condvar::new(),
			}),
		}
	}

	pub fn completed(value: T) -> Self {
		let future = Self::new();
		future.complete(value);
		future
	}

	pub fn failed(error: Error) -> Self {
		let future = Self::new();
		future.complete_exceptionally(error);
		future
	}

	/// Completes the future with a value.
	///
	/// Returns `false` and leaves the future untouched if it was already
	/// completed.
	pub fn complete(&self, value: T) -> bool {
		self.complete_with(Ok(value))
	}

	/// Completes the future with an error.
	///
	/// Returns `false` and leaves the future untouched if it was already
	/// completed.
	pub fn complete_exceptionally(&self, error: Error) -> bool {
		self.complete_with(Err(error))
	}

	/// Completes the future with the given result, see [`complete`](Self::complete).
	pub fn complete_with(&self, result: Result<T>) -> bool {
		let callbacks = {
			let mut state = self.inner.state.lock();
			match &mut *state {
				State::Completed(_) => {
					warn!(
						ok = result.is_ok(),
						"attempted to complete an already completed future, ignoring"
					);
					return false;
				}
				State::Pending(callbacks) => {
					let callbacks = std::mem::take(callbacks);
					*state = State::Completed(result.clone());
					callbacks
				}
			}
		};
		self.inner.completed.notify_all();

		for callback in callbacks {
			callback(result.clone());
		}
		true
	}

	/// Registers a continuation that runs exactly once with the final result.
	///
	/// The continuation runs on the completing thread, or immediately on the
	/// calling thread if the future is already completed. Keep it short; to
	/// run code on an actor use
	/// [`ActorControl::run_on_completion`](crate::actor::ActorControl::run_on_completion).
	pub fn on_complete<F>(&self, callback: F)
	where
		F: FnOnce(Result<T>) + Send + 'static,
	{
		let result = {
			let mut state = self.inner.state.lock();
			match &mut *state {
				State::Pending(callbacks) => {
					callbacks.push(Box::new(callback));
					return;
				}
				State::Completed(result) => result.clone(),
			}
		};
		callback(result);
	}

	pub fn is_done(&self) -> bool {
		matches!(*self.inner.state.lock(), State::Completed(_))
	}

	pub fn is_completed_exceptionally(&self) -> bool {
		matches!(*self.inner.state.lock(), State::Completed(Err(_)))
	}

	/// The result, if the future has completed.
	pub fn result(&self) -> Option<Result<T>> {
		match &*self.inner.state.lock() {
			State::Pending(_) => None,
			State::Completed(result) => Some(result.clone()),
		}
	}

	/// Blocks the calling thread until the future completes.
	///
	/// Fails immediately when called from an actor job: blocking a worker
	/// thread could deadlock the scheduler.
	pub fn join(&self) -> Result<T> {
		if is_actor_thread() {
			return Err(error!(future::blocking_join_on_actor_thread()));
		}

		let mut state = self.inner.state.lock();
		loop {
			if let State::Completed(result) = &*state {
				return result.clone();
			}
			self.inner.completed.wait(&mut state);
		}
	}

	/// Like [`join`](Self::join), failing with `FUTURE_002` after `timeout`.
	pub fn join_timeout(&self, timeout: Duration) -> Result<T> {
		if is_actor_thread() {
			return Err(error!(future::blocking_join_on_actor_thread()));
		}

		let deadline = Instant::now() + timeout;
		let mut state = self.inner.state.lock();
		loop {
			if let State::Completed(result) = &*state {
				return result.clone();
			}
			if self.inner.completed.wait_until(&mut state, deadline).timed_out() {
				if let State::Completed(result) = &*state {
					return result.clone();
				}
				return Err(error!(future::join_timeout(timeout)));
			}
		}
	}

	/// A future completed with `f` applied to this future's value.
	pub fn map<U, F>(&self, f: F) -> ActorFuture<U>
	where
		U: Clone + Send + 'static,
		F: FnOnce(T) -> U + Send + 'static,
	{
		let mapped = ActorFuture::new();
		let target = mapped.clone();
		self.on_complete(move |result| {
			target.complete_with(result.map(f));
		});
		mapped
	}

	/// A future completed by the future `f` returns for this future's value.
	pub fn and_then<U, F>(&self, f: F) -> ActorFuture<U>
	where
		U: Clone + Send + 'static,
		F: FnOnce(T) -> ActorFuture<U> + Send + 'static,
	{
		let chained = ActorFuture::new();
		let target = chained.clone();
		self.on_complete(move |result| match result {
			Ok(value) => f(value).on_complete(move |next| {
				target.complete_with(next);
			}),
			Err(err) => {
				target.complete_exceptionally(err);
			}
		});
		chained
	}

	/// A future completed once all `futures` completed.
	///
	/// Resolves to the values in input order, or to the first error by
	/// completion order.
	pub fn all(futures: Vec<ActorFuture<T>>) -> ActorFuture<Vec<T>> {
		let combined = ActorFuture::new();
		if futures.is_empty() {
			combined.complete(Vec::new());
			return combined;
		}

		let slots: Arc<Mutex<(Vec<Option<T>>, usize)>> =
			Arc::new(Mutex::new((vec![None; futures.len()], futures.len())));

		for (index, future) in futures.into_iter().enumerate() {
			let slots = slots.clone();
			let combined = combined.clone();
			future.on_complete(move |result| match result {
				Err(err) => {
					combined.complete_exceptionally(err);
				}
				Ok(value) => {
					let values = {
						let mut guard = slots.lock();
						guard.0[index] = Some(value);
						guard.1 -= 1;
						if guard.1 > 0 {
							return;
						}
						std::mem::take(&mut guard.0)
					};
					combined.complete(values.into_iter().flatten().collect());
				}
			});
		}
		combined
	}
}

impl<T> Debug for ActorFuture<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let state = match &*self.inner.state.lock() {
			State::Pending(callbacks) => format!("Pending({} callbacks)", callbacks.len()),
			State::Completed(Ok(_)) => "Completed".to_string(),
			State::Completed(Err(err)) => format!("Failed({})", err.code),
		};
		f.debug_struct("ActorFuture").field("state", &state).finish()
	}
}
