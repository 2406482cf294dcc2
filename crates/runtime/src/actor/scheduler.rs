// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! The actor scheduler.
//!
//! A fixed number of worker threads pull ready actors from a shared FIFO queue
//! and run one turn of each. Fan-out of actors is independent of the number of
//! threads: a thousand idle actors cost no thread at all.

use std::{
	panic::{self, AssertUnwindSafe},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, Sender, unbounded};
use dashmap::{DashMap, mapref::entry::Entry};
use parking_lot::Mutex;
use strata_type::{Result, error, error::diagnostic::actor};
use tracing::{debug, info, warn};

use crate::{
	actor::{
		context::{is_actor_thread, next_actor_id},
		control::ActorControl,
		cell::{ActorCell, ActorCore, Runnable},
		error::{ActorError, panic_message},
		timers::TimerService,
		traits::Actor,
	},
	config::SchedulerConfig,
	future::ActorFuture,
};

pub(crate) enum WorkerMessage {
	Run(Arc<dyn Runnable>),
	Stop,
}

pub(crate) struct SchedulerShared {
	config: SchedulerConfig,
	ready_tx: Sender<WorkerMessage>,
	timers: TimerService,
	pub(crate) actors: DashMap<String, Arc<dyn ActorCell>>,
	workers: Mutex<Vec<JoinHandle<()>>>,
	stopped: AtomicBool,
}

impl Drop for SchedulerShared {
	fn drop(&mut self) {
		if !self.stopped.swap(true, Ordering::SeqCst) {
			for _ in 0..self.config.worker_threads {
				let _ = self.ready_tx.send(WorkerMessage::Stop);
			}
			// workers are left detached, they exit on the stop message
		}
	}
}

/// Runs actors on a pool of worker threads.
///
/// Cloning the scheduler creates another handle to the same pool.
#[derive(Clone)]
pub struct ActorScheduler {
	shared: Arc<SchedulerShared>,
}

impl ActorScheduler {
	pub fn new(mut config: SchedulerConfig) -> Result<Self> {
		config.worker_threads = config.worker_threads.max(1);
		config.jobs_per_turn = config.jobs_per_turn.max(1);

		let (ready_tx, ready_rx) = unbounded();
		let timers = TimerService::start(format!("{}-timers", config.thread_name_prefix))?;

		let mut workers = Vec::with_capacity(config.worker_threads);
		for index in 0..config.worker_threads {
			let rx = ready_rx.clone();
			let spawned = thread::Builder::new()
				.name(format!("{}-{}", config.thread_name_prefix, index))
				.spawn(move || worker_loop(rx));
			match spawned {
				Ok(handle) => workers.push(handle),
				Err(e) => {
					for _ in 0..workers.len() {
						let _ = ready_tx.send(WorkerMessage::Stop);
					}
					timers.shutdown();
					return Err(ActorError::WorkerSpawn {
						reason: e.to_string(),
					}
					.into());
				}
			}
		}

		info!(
			workers = config.worker_threads,
			jobs_per_turn = config.jobs_per_turn,
			"actor scheduler started"
		);

		Ok(Self {
			shared: Arc::new(SchedulerShared {
				config,
				ready_tx,
				timers,
				actors: DashMap::new(),
				workers: Mutex::new(workers),
				stopped: AtomicBool::new(false),
			}),
		})
	}

	pub fn builder() -> SchedulerBuilder {
		SchedulerBuilder::new()
	}

	pub fn config(&self) -> &SchedulerConfig {
		&self.shared.config
	}

	/// Registers `actor` and schedules its startup.
	///
	/// Fails with `ACTOR_001` if an actor with the same name is registered and
	/// with `ACTOR_005` after [`shutdown`](Self::shutdown).
	pub fn submit_actor<A: Actor>(&self, actor: A) -> Result<ActorControl<A>> {
		if self.shared.stopped.load(Ordering::SeqCst) {
			return Err(ActorError::SchedulerStopped.into());
		}

		let name = actor.name();
		let jobs_per_turn = actor.config().jobs_per_turn.unwrap_or(self.shared.config.jobs_per_turn).max(1);

		let core = match self.shared.actors.entry(name.clone()) {
			Entry::Occupied(_) => {
				return Err(ActorError::AlreadyRegistered {
					name,
				}
				.into());
			}
			Entry::Vacant(entry) => {
				let core = ActorCore::new(
					next_actor_id(),
					name.clone(),
					jobs_per_turn,
					actor,
					self.shared.ready_tx.clone(),
					self.shared.timers.clone(),
					Arc::downgrade(&self.shared),
				);
				entry.insert(core.clone() as Arc<dyn ActorCell>);
				core
			}
		};

		core.start();
		debug!(actor = %name, "actor submitted");
		Ok(ActorControl::from_core(core))
	}

	pub fn is_registered(&self, name: &str) -> bool {
		self.shared.actors.contains_key(name)
	}

	pub fn actor_count(&self) -> usize {
		self.shared.actors.len()
	}

	/// Closes every actor, waits for them to close, then stops the workers
	/// and the timer thread.
	///
	/// Must not be called from an actor job.
	pub fn shutdown(&self) -> Result<()> {
		if is_actor_thread() {
			return Err(error!(actor::shutdown_from_actor()));
		}
		if self.shared.stopped.swap(true, Ordering::SeqCst) {
			return Ok(());
		}

		let cells: Vec<Arc<dyn ActorCell>> = self.shared.actors.iter().map(|entry| entry.value().clone()).collect();
		let closing: Vec<ActorFuture<()>> = cells.into_iter().map(|cell| cell.request_close()).collect();
		let pending = closing.len();
		for future in closing {
			if let Err(err) = future.join() {
				warn!(code = %err.code, "actor did not close cleanly");
			}
		}

		for _ in 0..self.shared.config.worker_threads {
			let _ = self.shared.ready_tx.send(WorkerMessage::Stop);
		}
		let workers = std::mem::take(&mut *self.shared.workers.lock());
		for worker in workers {
			let _ = worker.join();
		}
		self.shared.timers.shutdown();

		info!(closed = pending, "actor scheduler stopped");
		Ok(())
	}
}

fn worker_loop(ready_rx: Receiver<WorkerMessage>) {
	while let Ok(message) = ready_rx.recv() {
		match message {
			WorkerMessage::Run(task) => {
				if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task.run_turn())) {
					tracing::error!("actor turn panicked outside of a job: {}", panic_message(payload.as_ref()));
				}
			}
			WorkerMessage::Stop => break,
		}
	}
	debug!("worker stopped");
}

/// Builder for [`ActorScheduler`].
#[derive(Debug, Default)]
pub struct SchedulerBuilder {
	config: SchedulerConfig,
}

impl SchedulerBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_config(mut self, config: SchedulerConfig) -> Self {
		self.config = config;
		self
	}

	pub fn worker_threads(mut self, threads: usize) -> Self {
		self.config = self.config.worker_threads(threads);
		self
	}

	pub fn jobs_per_turn(mut self, jobs: usize) -> Self {
		self.config = self.config.jobs_per_turn(jobs);
		self
	}

	pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.config = self.config.thread_name_prefix(prefix);
		self
	}

	pub fn build(self) -> Result<ActorScheduler> {
		ActorScheduler::new(self.config)
	}
}
