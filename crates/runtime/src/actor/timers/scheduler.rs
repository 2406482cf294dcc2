// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	cmp::Ordering as CmpOrdering,
	collections::BinaryHeap,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, JoinHandle},
	time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use strata_type::{Result, error, error::diagnostic::actor};
use tracing::debug;

use super::TimerHandle;

type TimerCallback = Box<dyn FnOnce() + Send>;

struct TimerEntry {
	id: u64,
	deadline: Instant,
	callback: TimerCallback,
	cancelled: Arc<AtomicBool>,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
	fn eq(&self, other: &Self) -> bool {
		self.deadline == other.deadline && self.id == other.id
	}
}

impl Ord for TimerEntry {
	// BinaryHeap is a max-heap, reversed to pop the earliest deadline first.
	fn cmp(&self, other: &Self) -> CmpOrdering {
		other.deadline.cmp(&self.deadline).then_with(|| other.id.cmp(&self.id))
	}
}

impl PartialOrd for TimerEntry {
	fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
		Some(self.cmp(other))
	}
}

enum TimerCommand {
	Schedule {
		id: u64,
		deadline: Instant,
		callback: TimerCallback,
		cancelled: Arc<AtomicBool>,
	},
	Shutdown,
}

/// Handle to the timer coordinator thread.
///
/// Cloning shares the same coordinator. The coordinator stops on
/// [`shutdown`](Self::shutdown) or once every clone has been dropped.
#[derive(Clone)]
pub(crate) struct TimerService {
	command_tx: Sender<TimerCommand>,
	join_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl TimerService {
	pub(crate) fn start(thread_name: impl Into<String>) -> Result<Self> {
		let (command_tx, command_rx) = unbounded();

		let join_handle = thread::Builder::new()
			.name(thread_name.into())
			.spawn(move || timer_loop(command_rx))
			.map_err(|e| error!(actor::timer_thread_failed(e.to_string())))?;

		Ok(Self {
			command_tx,
			join_handle: Arc::new(Mutex::new(Some(join_handle))),
		})
	}

	/// Runs `callback` on the coordinator thread once `delay` has elapsed,
	/// unless `handle` is cancelled first.
	///
	/// The callback must only hand work off, it must not block.
	pub(crate) fn schedule<F>(&self, handle: &TimerHandle, delay: Duration, callback: F)
	where
		F: FnOnce() + Send + 'static,
	{
		let _ = self.command_tx.send(TimerCommand::Schedule {
			id: handle.id(),
			deadline: Instant::now() + delay,
			callback: Box::new(callback),
			cancelled: handle.cancelled_flag(),
		});
	}

	/// Stops the coordinator and waits for it. Pending timers are dropped.
	pub(crate) fn shutdown(&self) {
		let _ = self.command_tx.send(TimerCommand::Shutdown);

		if let Some(handle) = self.join_handle.lock().take() {
			let _ = handle.join();
		}
	}
}

fn timer_loop(command_rx: Receiver<TimerCommand>) {
	let mut heap: BinaryHeap<TimerEntry> = BinaryHeap::new();

	loop {
		let timeout = heap.peek().map(|entry| entry.deadline.saturating_duration_since(Instant::now()));

		let command = match timeout {
			Some(Duration::ZERO) => command_rx.try_recv().ok(),
			Some(dur) => match command_rx.recv_timeout(dur) {
				Ok(cmd) => Some(cmd),
				Err(RecvTimeoutError::Timeout) => None,
				Err(RecvTimeoutError::Disconnected) => break,
			},
			None => match command_rx.recv() {
				Ok(cmd) => Some(cmd),
				Err(_) => break,
			},
		};

		match command {
			Some(TimerCommand::Schedule {
				id,
				deadline,
				callback,
				cancelled,
			}) => {
				if !cancelled.load(Ordering::SeqCst) {
					heap.push(TimerEntry {
						id,
						deadline,
						callback,
						cancelled,
					});
				}
			}
			Some(TimerCommand::Shutdown) => break,
			None => {}
		}

		let now = Instant::now();
		while heap.peek().is_some_and(|entry| entry.deadline <= now) {
			let Some(entry) = heap.pop() else {
				break;
			};
			if entry.cancelled.load(Ordering::SeqCst) {
				continue;
			}
			(entry.callback)();
		}
	}

	debug!(pending = heap.len(), "timer coordinator stopped");
}
