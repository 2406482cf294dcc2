// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Core actor trait and associated types.
//!
//! - [`Actor`]: the trait every actor implements
//! - [`ActorPhase`]: lifecycle phase of a running actor
//! - [`FailureAction`]: what the scheduler does after a failed job
//! - [`ActorConfig`]: per-actor overrides of scheduler settings

use std::fmt::{Display, Formatter};

use strata_type::{Error, Result};

use crate::actor::control::ActorControl;

/// Lifecycle phase of an actor.
///
/// An actor moves `Starting -> Started -> Closing -> Closed`. `Failed` is
/// terminal and reached when startup fails or the failure handler asks for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorPhase {
	Starting,
	Started,
	Closing,
	Closed,
	Failed,
}

impl ActorPhase {
	/// Closed and failed actors no longer run jobs.
	pub fn is_terminal(self) -> bool {
		matches!(self, ActorPhase::Closed | ActorPhase::Failed)
	}
}

impl Display for ActorPhase {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			ActorPhase::Starting => "STARTING",
			ActorPhase::Started => "STARTED",
			ActorPhase::Closing => "CLOSING",
			ActorPhase::Closed => "CLOSED",
			ActorPhase::Failed => "FAILED",
		};
		f.write_str(s)
	}
}

/// What the scheduler does after a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
	/// Keep running the remaining jobs.
	Continue,

	/// Move the actor into [`ActorPhase::Failed`] and drop its pending jobs.
	Fail,
}

/// Per-actor overrides.
#[derive(Debug, Clone, Default)]
pub struct ActorConfig {
	/// Overrides [`SchedulerConfig::jobs_per_turn`](crate::config::SchedulerConfig::jobs_per_turn)
	/// for this actor.
	pub jobs_per_turn: Option<usize>,
}

impl ActorConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn jobs_per_turn(mut self, jobs: usize) -> Self {
		self.jobs_per_turn = Some(jobs.max(1));
		self
	}
}

/// The core actor abstraction.
///
/// An actor owns its state exclusively. All code touching that state runs as
/// jobs submitted through its [`ActorControl`], and the scheduler guarantees
/// that no two jobs of the same actor ever run concurrently. Jobs must not
/// block: waiting for another result is expressed by registering a
/// continuation with [`ActorControl::run_on_completion`].
///
/// # Lifecycle
///
/// 1. `on_actor_starting()` - may fail, which moves the actor to `Failed`
/// 2. `on_actor_started()`
/// 3. jobs
/// 4. `on_actor_closing()` - jobs it submits still run before the actor closes
/// 5. `on_actor_closed()`
///
/// A failure during startup, a panicking job whose failure handler returns
/// [`FailureAction::Fail`], or [`ActorControl::fail`] ends the actor with
/// `on_actor_failed()` instead.
///
/// # Example
///
/// ```ignore
/// struct Counter {
///     count: u64,
/// }
///
/// impl Actor for Counter {
///     fn name(&self) -> String {
///         "counter".to_string()
///     }
/// }
///
/// let control = scheduler.submit_actor(Counter { count: 0 })?;
/// control.submit(|counter, _| counter.count += 1);
/// let count = control.call(|counter, _| counter.count).join()?;
/// ```
pub trait Actor: Sized + Send + 'static {
	/// Unique name within the scheduler.
	fn name(&self) -> String;

	fn config(&self) -> ActorConfig {
		ActorConfig::default()
	}

	#[allow(unused_variables)]
	fn on_actor_starting(&mut self, control: &ActorControl<Self>) -> Result<()> {
		Ok(())
	}

	#[allow(unused_variables)]
	fn on_actor_started(&mut self, control: &ActorControl<Self>) {}

	#[allow(unused_variables)]
	fn on_actor_closing(&mut self, control: &ActorControl<Self>) {}

	fn on_actor_closed(&mut self) {}

	/// Called once when the actor enters [`ActorPhase::Failed`].
	#[allow(unused_variables)]
	fn on_actor_failed(&mut self, error: &Error) {}

	/// Called after a job panicked. The worker thread survives the panic.
	///
	/// Default: log and continue with the next job.
	#[allow(unused_variables)]
	fn handle_failure(&mut self, error: &Error, control: &ActorControl<Self>) -> FailureAction {
		FailureAction::Continue
	}
}
