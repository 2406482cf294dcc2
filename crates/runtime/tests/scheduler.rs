// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	thread,
	time::{Duration, Instant},
};

use strata_runtime::{
	Actor, ActorControl, ActorPhase, ActorScheduler, FailureAction, SchedulerBuilder,
	actor::is_actor_thread,
};
use strata_testing::{recorder::Recorder, util::wait_for};
use strata_type::{Error, Result, error, error::diagnostic::internal::internal};

struct TestActor {
	name: String,
	log: Recorder<String>,
	fail_start: bool,
	on_failure: FailureAction,
	failures: Recorder<String>,
}

impl TestActor {
	fn new(name: &str) -> Self {
		Self {
			name: name.to_string(),
			log: Recorder::new(),
			fail_start: false,
			on_failure: FailureAction::Continue,
			failures: Recorder::new(),
		}
	}
}

impl Actor for TestActor {
	fn name(&self) -> String {
		self.name.clone()
	}

	fn on_actor_starting(&mut self, _control: &ActorControl<Self>) -> Result<()> {
		self.log.record("starting".to_string());
		if self.fail_start {
			return Err(error!(internal("cannot start")));
		}
		Ok(())
	}

	fn on_actor_started(&mut self, _control: &ActorControl<Self>) {
		self.log.record("started".to_string());
	}

	fn on_actor_closing(&mut self, control: &ActorControl<Self>) {
		self.log.record("closing".to_string());
		control.submit(|actor, _| actor.log.record("cleanup".to_string()));
	}

	fn on_actor_closed(&mut self) {
		self.log.record("closed".to_string());
	}

	fn on_actor_failed(&mut self, error: &Error) {
		self.log.record(format!("failed:{}", error.code));
	}

	fn handle_failure(&mut self, error: &Error, _control: &ActorControl<Self>) -> FailureAction {
		self.failures.record(error.code.clone());
		self.on_failure
	}
}

fn scheduler(workers: usize) -> ActorScheduler {
	SchedulerBuilder::new().worker_threads(workers).thread_name_prefix("test-worker").build().unwrap()
}

#[test]
fn test_lifecycle_hooks_in_order() {
	let scheduler = scheduler(2);
	let actor = TestActor::new("lifecycle");
	let log = actor.log.clone();

	let control = scheduler.submit_actor(actor).unwrap();
	control.started().join().unwrap();
	assert_eq!(control.phase(), ActorPhase::Started);

	control.submit(|actor, _| actor.log.record("job".to_string()));
	control.close().join().unwrap();

	assert_eq!(log.entries(), vec!["starting", "started", "job", "closing", "cleanup", "closed"]);
	assert_eq!(control.phase(), ActorPhase::Closed);
	assert!(!scheduler.is_registered("lifecycle"));
	scheduler.shutdown().unwrap();
}

#[test]
fn test_duplicate_name_is_rejected() {
	let scheduler = scheduler(1);
	let _first = scheduler.submit_actor(TestActor::new("dup")).unwrap();
	let err = scheduler.submit_actor(TestActor::new("dup")).err().unwrap();
	assert_eq!(err.code(), "ACTOR_001");
	scheduler.shutdown().unwrap();
}

#[test]
fn test_failed_start_moves_to_failed() {
	let scheduler = scheduler(1);
	let mut actor = TestActor::new("broken");
	actor.fail_start = true;
	let log = actor.log.clone();

	let control = scheduler.submit_actor(actor).unwrap();
	let err = control.started().join().unwrap_err();
	assert_eq!(err.code(), "ACTOR_004");
	assert_eq!(err.cause.as_ref().unwrap().code, "INTERNAL_ERROR");

	control.closed().join().unwrap();
	assert_eq!(control.phase(), ActorPhase::Failed);
	assert_eq!(log.entries(), vec!["starting", "failed:INTERNAL_ERROR"]);
	assert!(!control.submit(|_, _| {}));
	scheduler.shutdown().unwrap();
}

#[test]
fn test_jobs_after_close_are_refused() {
	let scheduler = scheduler(1);
	let control = scheduler.submit_actor(TestActor::new("closing")).unwrap();
	let closed = control.close();
	assert!(!control.submit(|_, _| {}));
	closed.join().unwrap();
	assert!(!control.run(|_, _| {}));

	let err = control.call(|_, _| 1).join().unwrap_err();
	assert_eq!(err.code(), "ACTOR_002");
	scheduler.shutdown().unwrap();
}

#[test]
fn test_jobs_queued_before_close_still_run() {
	let scheduler = scheduler(1);
	let actor = TestActor::new("drain");
	let log = actor.log.clone();
	let control = scheduler.submit_actor(actor).unwrap();

	for i in 0..10 {
		control.submit(move |actor, _| actor.log.record(format!("job-{}", i)));
	}
	control.close().join().unwrap();

	let jobs: Vec<String> = log.entries().into_iter().filter(|e| e.starts_with("job-")).collect();
	assert_eq!(jobs.len(), 10);
	scheduler.shutdown().unwrap();
}

#[test]
fn test_single_writer_total_order() {
	let scheduler = scheduler(4);
	let active = Arc::new(AtomicUsize::new(0));
	let overlaps = Arc::new(AtomicUsize::new(0));
	let order: Recorder<(usize, usize)> = Recorder::new();

	let control = scheduler.submit_actor(TestActor::new("single-writer")).unwrap();

	let submitters: Vec<_> = (0..4)
		.map(|thread_id| {
			let control = control.clone();
			let active = active.clone();
			let overlaps = overlaps.clone();
			let order = order.clone();
			thread::spawn(move || {
				for seq in 0..250 {
					let active = active.clone();
					let overlaps = overlaps.clone();
					let order = order.clone();
					control.submit(move |_, _| {
						if active.fetch_add(1, Ordering::SeqCst) != 0 {
							overlaps.fetch_add(1, Ordering::SeqCst);
						}
						order.record((thread_id, seq));
						active.fetch_sub(1, Ordering::SeqCst);
					});
				}
			})
		})
		.collect();
	for submitter in submitters {
		submitter.join().unwrap();
	}

	wait_for(|| order.len() == 1000, "all jobs should run");
	assert_eq!(overlaps.load(Ordering::SeqCst), 0);

	for thread_id in 0..4 {
		let seqs: Vec<usize> = order.entries().into_iter().filter(|(t, _)| *t == thread_id).map(|(_, s)| s).collect();
		assert_eq!(seqs, (0..250).collect::<Vec<_>>());
	}
	scheduler.shutdown().unwrap();
}

#[test]
fn test_run_from_inside_jumps_ahead_of_submitted() {
	let scheduler = scheduler(1);
	let actor = TestActor::new("fast-lane");
	let log = actor.log.clone();
	let control = scheduler.submit_actor(actor).unwrap();
	control.started().join().unwrap();

	control.submit(|actor, control| {
		control.submit(|actor, _| actor.log.record("submitted".to_string()));
		control.run(|actor, _| actor.log.record("run".to_string()));
		actor.log.record("first".to_string());
	});
	control.call(|_, _| ()).join().unwrap();
	wait_for(|| log.len() >= 5, "jobs should run");

	let entries = log.entries();
	assert_eq!(&entries[2..5], &["first", "run", "submitted"]);
	scheduler.shutdown().unwrap();
}

#[test]
fn test_call_returns_value() {
	let scheduler = scheduler(2);
	let control = scheduler.submit_actor(TestActor::new("call")).unwrap();
	let name = control.call(|actor, _| actor.name.len()).join().unwrap();
	assert_eq!(name, 4);
	scheduler.shutdown().unwrap();
}

#[test]
fn test_panicking_job_does_not_kill_worker() {
	let scheduler = scheduler(1);
	let actor = TestActor::new("panicky");
	let failures = actor.failures.clone();
	let control = scheduler.submit_actor(actor).unwrap();

	control.submit(|_, _| panic!("job exploded"));
	let after = control.call(|_, _| "still alive").join().unwrap();

	assert_eq!(after, "still alive");
	assert_eq!(failures.entries(), vec!["ACTOR_003"]);
	assert_eq!(control.phase(), ActorPhase::Started);

	// the single worker keeps serving other actors
	let other = scheduler.submit_actor(TestActor::new("other")).unwrap();
	assert_eq!(other.call(|_, _| 7).join().unwrap(), 7);
	scheduler.shutdown().unwrap();
}

#[test]
fn test_failure_handler_can_fail_actor() {
	let scheduler = scheduler(1);
	let mut actor = TestActor::new("fatal");
	actor.on_failure = FailureAction::Fail;
	let log = actor.log.clone();
	let control = scheduler.submit_actor(actor).unwrap();

	control.submit(|_, _| panic!("fatal"));
	control.closed().join().unwrap();

	assert_eq!(control.phase(), ActorPhase::Failed);
	assert!(log.entries().contains(&"failed:ACTOR_003".to_string()));
	assert!(!log.entries().contains(&"closed".to_string()));
	scheduler.shutdown().unwrap();
}

#[test]
fn test_fail_drops_pending_jobs() {
	let scheduler = scheduler(1);
	let ran = Arc::new(AtomicBool::new(false));
	let control = scheduler.submit_actor(TestActor::new("fail-now")).unwrap();

	let flag = ran.clone();
	control.submit(move |_, control| {
		control.submit(move |_, _| flag.store(true, Ordering::SeqCst));
		control.fail(error!(internal("give up")));
	});
	control.closed().join().unwrap();

	assert_eq!(control.phase(), ActorPhase::Failed);
	assert!(!ran.load(Ordering::SeqCst));
	scheduler.shutdown().unwrap();
}

#[test]
fn test_schedule_runs_after_delay() {
	let scheduler = scheduler(2);
	let control = scheduler.submit_actor(TestActor::new("timer")).unwrap();
	control.started().join().unwrap();

	let fired_at: Recorder<Instant> = Recorder::new();
	let recorder = fired_at.clone();
	let start = Instant::now();
	control.schedule(Duration::from_millis(100), move |_, _| recorder.record(Instant::now()));

	thread::sleep(Duration::from_millis(50));
	assert!(fired_at.is_empty(), "job ran before its delay");

	wait_for(|| !fired_at.is_empty(), "scheduled job should run");
	let elapsed = fired_at.entries()[0].duration_since(start);
	assert!(elapsed >= Duration::from_millis(100), "ran after {:?}", elapsed);
	assert!(elapsed < Duration::from_millis(150), "ran after {:?}", elapsed);
	scheduler.shutdown().unwrap();
}

#[test]
fn test_cancelled_timer_does_not_run() {
	let scheduler = scheduler(1);
	let control = scheduler.submit_actor(TestActor::new("cancel")).unwrap();
	let ran = Arc::new(AtomicBool::new(false));

	let flag = ran.clone();
	let handle = control.schedule(Duration::from_millis(30), move |_, _| flag.store(true, Ordering::SeqCst));
	assert!(handle.cancel());

	thread::sleep(Duration::from_millis(80));
	assert!(!ran.load(Ordering::SeqCst));
	scheduler.shutdown().unwrap();
}

#[test]
fn test_fixed_rate_until_cancelled() {
	let scheduler = scheduler(1);
	let control = scheduler.submit_actor(TestActor::new("periodic")).unwrap();
	let ticks = Arc::new(AtomicUsize::new(0));

	let counter = ticks.clone();
	let handle = control.run_at_fixed_rate(Duration::from_millis(5), move |_, _| {
		counter.fetch_add(1, Ordering::SeqCst);
	});

	wait_for(|| ticks.load(Ordering::SeqCst) >= 3, "periodic job should tick");
	handle.cancel();
	let after_cancel = control.call(|_, _| ()).join().map(|_| ticks.load(Ordering::SeqCst)).unwrap();

	thread::sleep(Duration::from_millis(40));
	assert!(ticks.load(Ordering::SeqCst) <= after_cancel + 1);
	scheduler.shutdown().unwrap();
}

#[test]
fn test_close_cancels_timers() {
	let scheduler = scheduler(1);
	let control = scheduler.submit_actor(TestActor::new("close-timers")).unwrap();
	let ran = Arc::new(AtomicBool::new(false));

	let flag = ran.clone();
	let handle = control.schedule(Duration::from_millis(50), move |_, _| flag.store(true, Ordering::SeqCst));
	control.close().join().unwrap();

	assert!(handle.is_cancelled());
	thread::sleep(Duration::from_millis(80));
	assert!(!ran.load(Ordering::SeqCst));
	scheduler.shutdown().unwrap();
}

#[test]
fn test_busy_actor_does_not_starve_others() {
	let scheduler = SchedulerBuilder::new().worker_threads(1).jobs_per_turn(4).build().unwrap();
	let stop = Arc::new(AtomicBool::new(false));

	fn spin(stop: Arc<AtomicBool>, control: &ActorControl<TestActor>) {
		if stop.load(Ordering::SeqCst) {
			return;
		}
		let deadline = Instant::now() + Duration::from_millis(1);
		while Instant::now() < deadline {}
		control.yield_now();
		control.submit(move |_, control| spin(stop, control));
	}

	let busy = scheduler.submit_actor(TestActor::new("busy")).unwrap();
	let flag = stop.clone();
	busy.submit(move |_, control| spin(flag, control));

	let idle = scheduler.submit_actor(TestActor::new("idle")).unwrap();
	let start = Instant::now();
	for i in 0..20 {
		assert_eq!(idle.call(move |_, _| i).join().unwrap(), i);
	}
	assert!(start.elapsed() < Duration::from_secs(2));

	stop.store(true, Ordering::SeqCst);
	scheduler.shutdown().unwrap();
}

#[test]
fn test_run_on_completion_runs_on_actor() {
	let scheduler = scheduler(2);
	let control = scheduler.submit_actor(TestActor::new("continuation")).unwrap();
	let future = strata_runtime::ActorFuture::new();
	let seen: Recorder<(bool, u32)> = Recorder::new();

	let recorder = seen.clone();
	let target = future.clone();
	control.submit(move |_, control| {
		control.run_on_completion(&target, move |_, _, result| {
			recorder.record((is_actor_thread(), result.unwrap()));
		});
	});

	thread::sleep(Duration::from_millis(10));
	future.complete(9u32);
	wait_for(|| seen.len() == 1, "continuation should run");
	assert_eq!(seen.entries(), vec![(true, 9)]);
	scheduler.shutdown().unwrap();
}

#[test]
fn test_completed_future_continuation_runs_after_current_job() {
	let scheduler = scheduler(1);
	let actor = TestActor::new("next-tick");
	let log = actor.log.clone();
	let control = scheduler.submit_actor(actor).unwrap();
	control.started().join().unwrap();

	control.submit(|actor, control| {
		let done = strata_runtime::ActorFuture::completed(());
		control.run_on_completion(&done, |actor, _, _| actor.log.record("continuation".to_string()));
		actor.log.record("job".to_string());
	});
	wait_for(|| log.len() == 4, "continuation should run");
	assert_eq!(&log.entries()[2..], &["job", "continuation"]);
	scheduler.shutdown().unwrap();
}

#[test]
fn test_run_on_completion_all_reports_first_error() {
	let scheduler = scheduler(2);
	let control = scheduler.submit_actor(TestActor::new("all")).unwrap();
	let a = strata_runtime::ActorFuture::new();
	let b = strata_runtime::ActorFuture::new();
	let outcome: Recorder<Option<String>> = Recorder::new();

	let recorder = outcome.clone();
	control.run_on_completion_all(vec![a.clone(), b.clone()], move |_, _, result| {
		recorder.record(result.err().map(|e| e.code.clone()));
	});

	b.complete_exceptionally(error!(internal("b")));
	thread::sleep(Duration::from_millis(10));
	assert!(outcome.is_empty(), "must wait for all futures");
	a.complete(1u8);

	wait_for(|| outcome.len() == 1, "callback should run");
	assert_eq!(outcome.entries(), vec![Some("INTERNAL_ERROR".to_string())]);
	scheduler.shutdown().unwrap();
}

#[test]
fn test_join_on_actor_thread_is_refused() {
	let scheduler = scheduler(1);
	let control = scheduler.submit_actor(TestActor::new("joiner")).unwrap();

	let code = control
		.call(|_, _| {
			let never: strata_runtime::ActorFuture<()> = strata_runtime::ActorFuture::new();
			never.join().unwrap_err().code.clone()
		})
		.join()
		.unwrap();
	assert_eq!(code, "FUTURE_001");
	scheduler.shutdown().unwrap();
}

#[test]
fn test_submit_after_shutdown_fails() {
	let scheduler = scheduler(1);
	let control = scheduler.submit_actor(TestActor::new("before")).unwrap();
	scheduler.shutdown().unwrap();

	assert_eq!(control.phase(), ActorPhase::Closed);
	let err = scheduler.submit_actor(TestActor::new("after")).err().unwrap();
	assert_eq!(err.code(), "ACTOR_005");
}

#[test]
fn test_shutdown_from_actor_job_is_refused() {
	let scheduler = scheduler(1);
	let control = scheduler.submit_actor(TestActor::new("stopper")).unwrap();

	let inner = scheduler.clone();
	let code = control.call(move |_, _| inner.shutdown().unwrap_err().code.clone()).join().unwrap();
	assert_eq!(code, "ACTOR_008");

	assert_eq!(control.phase(), ActorPhase::Started);
	scheduler.shutdown().unwrap();
}

#[test]
fn test_zero_sized_config_is_clamped() {
	let mut config = strata_runtime::config::SchedulerConfig::default();
	config.worker_threads = 0;
	config.jobs_per_turn = 0;

	let scheduler = ActorScheduler::new(config).unwrap();
	assert_eq!(scheduler.config().worker_threads, 1);
	assert_eq!(scheduler.config().jobs_per_turn, 1);

	let control = scheduler.submit_actor(TestActor::new("clamped")).unwrap();
	control.started().join().unwrap();
	let answer = control.call(|_, _| 42).join().unwrap();
	assert_eq!(answer, 42);
	scheduler.shutdown().unwrap();
}
