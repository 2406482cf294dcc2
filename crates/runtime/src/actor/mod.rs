// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Actors multiplexed over a shared pool of worker threads.

pub(crate) mod context;
mod control;
mod cell;
mod error;
mod scheduler;
pub mod timers;
mod traits;

pub use context::is_actor_thread;
pub use control::ActorControl;
pub use error::ActorError;
pub(crate) use error::panic_message;
pub use scheduler::{ActorScheduler, SchedulerBuilder};
pub use timers::TimerHandle;
pub use traits::{Actor, ActorConfig, ActorPhase, FailureAction};
