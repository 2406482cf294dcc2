// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Cooperative actor runtime.
//!
//! Actors are multiplexed over a fixed set of worker threads. Each actor owns a
//! job queue that is drained by at most one worker at a time, so the actor's
//! state is only ever touched by a single thread:
//!
//! - [`actor::ActorScheduler`]: owns the workers and the actor registry
//! - [`actor::ActorControl`]: per-actor handle to submit and schedule jobs
//! - [`future::ActorFuture`]: completion handle composed with continuations
//! - [`retry`]: strategies that resubmit an operation until it succeeds

pub mod actor;
pub mod config;
pub mod future;
pub mod retry;

pub use actor::{Actor, ActorConfig, ActorControl, ActorPhase, ActorScheduler, FailureAction, SchedulerBuilder};
pub use config::SchedulerConfig;
pub use future::{ActorFuture, CompletableActorFuture};
