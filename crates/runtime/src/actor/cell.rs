// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Per-actor execution state.
//!
//! An actor is ready when its mailbox holds jobs. The first job pushed into an
//! idle mailbox sends the actor to the shared ready queue; a worker then runs
//! one turn of up to `jobs_per_turn` jobs and requeues the actor behind the
//! other ready actors if jobs remain. The `scheduled` flag guarantees that an
//! actor is in the ready queue or on a worker at most once.

use std::{
	collections::{HashMap, VecDeque},
	panic::{self, AssertUnwindSafe},
	sync::{
		Arc, Weak,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use strata_type::Error;
use tracing::{debug, trace, warn};

use crate::{
	actor::{
		context::{ActorTurnGuard, is_current_actor},
		control::ActorControl,
		error::{ActorError, panic_message},
		scheduler::{SchedulerShared, WorkerMessage},
		timers::{TimerHandle, TimerService},
		traits::{Actor, ActorPhase, FailureAction},
	},
	future::ActorFuture,
};

pub(crate) type Job<A> = Box<dyn FnOnce(&mut A, &ActorControl<A>) + Send>;

/// Something the worker threads can run a turn of.
pub(crate) trait Runnable: Send + Sync {
	fn run_turn(self: Arc<Self>);
}

/// Type-erased view of an actor used by the scheduler registry.
pub(crate) trait ActorCell: Send + Sync {
	fn id(&self) -> u64;

	fn phase(&self) -> ActorPhase;

	fn request_close(self: Arc<Self>) -> ActorFuture<()>;
}

struct Mailbox<A: Actor> {
	/// Jobs submitted with `run` from inside the actor. They run before
	/// anything in `jobs`.
	fast_lane: VecDeque<Job<A>>,
	jobs: VecDeque<Job<A>>,
	scheduled: bool,
	yield_requested: bool,
}

impl<A: Actor> Mailbox<A> {
	fn pop(&mut self) -> Option<Job<A>> {
		self.fast_lane.pop_front().or_else(|| self.jobs.pop_front())
	}

	fn is_empty(&self) -> bool {
		self.fast_lane.is_empty() && self.jobs.is_empty()
	}
}

pub(crate) struct ActorCore<A: Actor> {
	pub(crate) id: u64,
	pub(crate) name: String,
	jobs_per_turn: usize,
	actor: Mutex<Option<A>>,
	mailbox: Mutex<Mailbox<A>>,
	phase: Mutex<ActorPhase>,
	close_requested: AtomicBool,
	pending_failure: Mutex<Option<Error>>,
	timers: Mutex<HashMap<u64, TimerHandle>>,
	started: ActorFuture<()>,
	closed: ActorFuture<()>,
	ready_tx: Sender<WorkerMessage>,
	timer_service: TimerService,
	scheduler: Weak<SchedulerShared>,
}

impl<A: Actor> ActorCore<A> {
	pub(crate) fn new(
		id: u64,
		name: String,
		jobs_per_turn: usize,
		actor: A,
		ready_tx: Sender<WorkerMessage>,
		timer_service: TimerService,
		scheduler: Weak<SchedulerShared>,
	) -> Arc<Self> {
		Arc::new(Self {
			id,
			name,
			jobs_per_turn,
			actor: Mutex::new(Some(actor)),
			mailbox: Mutex::new(Mailbox {
				fast_lane: VecDeque::new(),
				jobs: VecDeque::new(),
				scheduled: false,
				yield_requested: false,
			}),
			phase: Mutex::new(ActorPhase::Starting),
			close_requested: AtomicBool::new(false),
			pending_failure: Mutex::new(None),
			timers: Mutex::new(HashMap::new()),
			started: ActorFuture::new(),
			closed: ActorFuture::new(),
			ready_tx,
			timer_service,
			scheduler,
		})
	}

	pub(crate) fn phase(&self) -> ActorPhase {
		*self.phase.lock()
	}

	pub(crate) fn started(&self) -> ActorFuture<()> {
		self.started.clone()
	}

	pub(crate) fn closed(&self) -> ActorFuture<()> {
		self.closed.clone()
	}

	pub(crate) fn is_close_requested(&self) -> bool {
		self.close_requested.load(Ordering::SeqCst)
	}

	pub(crate) fn is_current(&self) -> bool {
		is_current_actor(self.id)
	}

	/// Jobs from the actor itself, its timers and its continuations are
	/// accepted until the actor closed. Everything else is refused once a
	/// close was requested.
	fn accepts(&self, internal: bool) -> bool {
		if self.phase().is_terminal() {
			return false;
		}
		internal || !self.is_close_requested()
	}

	/// Enqueues a job from `run`/`submit`.
	///
	/// `fast` places it ahead of queued jobs when called from inside the actor.
	pub(crate) fn submit(self: &Arc<Self>, job: Job<A>, fast: bool) -> bool {
		let internal = self.is_current();
		if !self.accepts(internal) {
			debug!(actor = %self.name, "actor does not accept jobs anymore, dropping job");
			return false;
		}
		self.push(job, fast && internal);
		true
	}

	/// Enqueues a job on behalf of a timer or continuation of this actor.
	pub(crate) fn submit_internal(self: &Arc<Self>, job: Job<A>) -> bool {
		if !self.accepts(true) {
			trace!(actor = %self.name, "actor closed, dropping continuation");
			return false;
		}
		self.push(job, false);
		true
	}

	fn push(self: &Arc<Self>, job: Job<A>, fast: bool) {
		let wake = {
			let mut mailbox = self.mailbox.lock();
			if fast {
				mailbox.fast_lane.push_back(job);
			} else {
				mailbox.jobs.push_back(job);
			}
			if mailbox.scheduled {
				false
			} else {
				mailbox.scheduled = true;
				true
			}
		};
		if wake {
			self.wake();
		}
	}

	fn wake(self: &Arc<Self>) {
		let task: Arc<dyn Runnable> = self.clone();
		if self.ready_tx.send(WorkerMessage::Run(task)).is_err() {
			warn!(actor = %self.name, "worker pool is gone, actor cannot run");
		}
	}

	pub(crate) fn request_yield(&self) {
		if self.is_current() {
			self.mailbox.lock().yield_requested = true;
		}
	}

	pub(crate) fn request_failure(self: &Arc<Self>, error: Error) {
		if self.phase().is_terminal() {
			return;
		}
		{
			let mut pending = self.pending_failure.lock();
			if pending.is_none() {
				*pending = Some(error);
			}
		}
		if !self.is_current() {
			// wakes the actor so the failure is applied on its own thread
			self.push(Box::new(|_, _| {}), true);
		}
	}

	pub(crate) fn start(self: &Arc<Self>) {
		self.push(
			Box::new(|actor, control| {
				let core = &control.core;
				let result = panic::catch_unwind(AssertUnwindSafe(|| actor.on_actor_starting(control)));
				match result {
					Ok(Ok(())) => {
						*core.phase.lock() = ActorPhase::Started;
						debug!(actor = %core.name, "actor started");
						core.guard_hook("on_actor_started", || actor.on_actor_started(control));
						core.started.complete(());
					}
					Ok(Err(err)) => core.transition_failed(actor, err),
					Err(payload) => {
						let reason = panic_message(payload.as_ref());
						core.transition_failed(
							actor,
							ActorError::Panicked {
								name: core.name.clone(),
								reason,
							}
							.into(),
						);
					}
				}
			}),
			false,
		);
	}

	pub(crate) fn close(self: &Arc<Self>) -> ActorFuture<()> {
		if self.phase().is_terminal() || self.close_requested.swap(true, Ordering::SeqCst) {
			return self.closed.clone();
		}

		self.push(
			Box::new(|actor, control| {
				let core = control.core.clone();
				if core.phase().is_terminal() {
					return;
				}
				*core.phase.lock() = ActorPhase::Closing;
				debug!(actor = %core.name, "actor closing");
				core.guard_hook("on_actor_closing", || actor.on_actor_closing(control));

				// cleanup jobs submitted by the closing hook run first
				core.push(Box::new(|actor, control| control.core.finish_close(actor)), false);
			}),
			false,
		);
		self.closed.clone()
	}

	fn finish_close(&self, actor: &mut A) {
		if self.phase().is_terminal() {
			return;
		}
		self.cancel_timers();
		*self.phase.lock() = ActorPhase::Closed;
		self.guard_hook("on_actor_closed", || actor.on_actor_closed());
		debug!(actor = %self.name, "actor closed");
		if !self.started.is_done() {
			self.started.complete_exceptionally(ActorError::Closed {
				name: self.name.clone(),
			}
			.into());
		}
		self.closed.complete(());
		self.unregister();
	}

	fn transition_failed(&self, actor: &mut A, error: Error) {
		if self.phase().is_terminal() {
			return;
		}
		tracing::error!(actor = %self.name, code = %error.code, "actor failed: {}", error.message);
		self.cancel_timers();
		*self.phase.lock() = ActorPhase::Failed;
		self.guard_hook("on_actor_failed", || actor.on_actor_failed(&error));

		if !self.started.is_done() {
			let diagnostic = Error::from(ActorError::Failed {
				name: self.name.clone(),
			})
			.diagnostic()
			.with_cause(error.diagnostic());
			self.started.complete_exceptionally(Error::new(diagnostic));
		}
		self.closed.complete(());
		self.unregister();
	}

	fn guard_hook(&self, hook: &str, f: impl FnOnce()) {
		if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
			tracing::error!(actor = %self.name, hook, "lifecycle hook panicked: {}", panic_message(payload.as_ref()));
		}
	}

	pub(crate) fn schedule(self: &Arc<Self>, delay: Duration, job: Job<A>) -> TimerHandle {
		let handle = TimerHandle::new();
		if !self.accepts(self.is_current()) {
			handle.cancel();
			return handle;
		}
		self.track_timer(&handle);

		let core = self.clone();
		let fired = handle.clone();
		self.timer_service.schedule(&handle, delay, move || {
			if fired.is_cancelled() {
				return;
			}
			let timer = fired.clone();
			core.submit_internal(Box::new(move |actor, control| {
				control.core.timers.lock().remove(&timer.id());
				if !timer.is_cancelled() {
					job(actor, control);
				}
			}));
		});
		handle
	}

	pub(crate) fn schedule_at_fixed_rate<F>(self: &Arc<Self>, period: Duration, job: F) -> TimerHandle
	where
		F: FnMut(&mut A, &ActorControl<A>) + Send + 'static,
	{
		let handle = TimerHandle::new();
		if !self.accepts(self.is_current()) {
			handle.cancel();
			return handle;
		}
		self.track_timer(&handle);
		Self::arm_periodic(self.clone(), handle.clone(), period, job);
		handle
	}

	/// Arms the next invocation of a periodic job. The next one is armed
	/// after the current invocation finished.
	fn arm_periodic<F>(core: Arc<Self>, handle: TimerHandle, period: Duration, mut job: F)
	where
		F: FnMut(&mut A, &ActorControl<A>) + Send + 'static,
	{
		let timer_service = core.timer_service.clone();
		let armed = handle.clone();
		timer_service.schedule(&armed, period, move || {
			if handle.is_cancelled() {
				return;
			}
			let target = core.clone();
			core.submit_internal(Box::new(move |actor, control| {
				if handle.is_cancelled() {
					return;
				}
				job(actor, control);
				if !handle.is_cancelled() {
					Self::arm_periodic(target, handle, period, job);
				}
			}));
		});
	}

	fn track_timer(&self, handle: &TimerHandle) {
		let mut timers = self.timers.lock();
		timers.retain(|_, timer| !timer.is_cancelled());
		timers.insert(handle.id(), handle.clone());
	}

	fn cancel_timers(&self) {
		let timers = std::mem::take(&mut *self.timers.lock());
		for timer in timers.values() {
			timer.cancel();
		}
	}

	fn unregister(&self) {
		if let Some(scheduler) = self.scheduler.upgrade() {
			scheduler.actors.remove_if(&self.name, |_, cell| cell.id() == self.id);
		}
	}

	fn apply_pending_failure(&self, actor: &mut A) {
		let pending = self.pending_failure.lock().take();
		if let Some(error) = pending {
			self.transition_failed(actor, error);
		}
	}

	fn execute(&self, actor: &mut A, control: &ActorControl<A>, job: Job<A>) {
		let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job(actor, control))) else {
			return;
		};

		let reason = panic_message(payload.as_ref());
		tracing::error!(actor = %self.name, reason = %reason, "actor job panicked");
		let error: Error = ActorError::Panicked {
			name: self.name.clone(),
			reason,
		}
		.into();

		let action = panic::catch_unwind(AssertUnwindSafe(|| actor.handle_failure(&error, control)))
			.unwrap_or(FailureAction::Fail);
		if action == FailureAction::Fail {
			self.transition_failed(actor, error);
		}
	}
}

impl<A: Actor> Runnable for ActorCore<A> {
	fn run_turn(self: Arc<Self>) {
		let _turn = ActorTurnGuard::enter(self.id);
		let control = ActorControl::from_core(self.clone());

		let mut discarded = None;
		{
			let mut slot = self.actor.lock();
			if let Some(actor) = slot.as_mut() {
				for _ in 0..self.jobs_per_turn {
					self.apply_pending_failure(actor);
					if self.phase().is_terminal() {
						break;
					}

					let job = self.mailbox.lock().pop();
					let Some(job) = job else {
						break;
					};
					self.execute(actor, &control, job);

					self.apply_pending_failure(actor);
					if self.phase().is_terminal() {
						break;
					}
					if std::mem::take(&mut self.mailbox.lock().yield_requested) {
						break;
					}
				}
			}
			if self.phase().is_terminal() {
				discarded = slot.take();
			}
		}

		if self.phase().is_terminal() {
			// the actor stays marked as scheduled so it is never woken again
			let (fast_lane, jobs) = {
				let mut mailbox = self.mailbox.lock();
				mailbox.scheduled = true;
				(std::mem::take(&mut mailbox.fast_lane), std::mem::take(&mut mailbox.jobs))
			};
			let dropped = fast_lane.len() + jobs.len();
			if dropped > 0 {
				debug!(actor = %self.name, dropped, "dropping jobs of terminated actor");
			}
			drop(fast_lane);
			drop(jobs);
			drop(discarded);
			return;
		}

		let requeue = {
			let mut mailbox = self.mailbox.lock();
			mailbox.yield_requested = false;
			if mailbox.is_empty() {
				mailbox.scheduled = false;
				false
			} else {
				true
			}
		};
		if requeue {
			self.wake();
		}
	}
}

impl<A: Actor> ActorCell for ActorCore<A> {
	fn id(&self) -> u64 {
		self.id
	}

	fn phase(&self) -> ActorPhase {
		ActorCore::phase(self)
	}

	fn request_close(self: Arc<Self>) -> ActorFuture<()> {
		self.close()
	}
}
