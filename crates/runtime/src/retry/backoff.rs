// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	sync::{Arc, atomic::AtomicBool},
	time::Duration,
};

use super::{OperationToRetry, RetryPolicy, RetryStrategy, TerminateCondition, start_sequence};
use crate::{
	actor::{Actor, ActorControl},
	future::ActorFuture,
};

/// Delay growth between attempts of a [`BackoffRetryStrategy`].
#[derive(Debug, Clone)]
pub struct BackoffConfig {
	/// Delay before the second attempt.
	///
	/// Default: 10ms
	pub initial: Duration,

	/// Upper bound of the delay.
	///
	/// Default: 10s
	pub max: Duration,

	/// Multiplier applied per attempt.
	///
	/// Default: 2.0
	pub factor: f64,
}

impl Default for BackoffConfig {
	fn default() -> Self {
		Self {
			initial: Duration::from_millis(10),
			max: Duration::from_secs(10),
			factor: 2.0,
		}
	}
}

impl BackoffConfig {
	pub fn new(initial: Duration, max: Duration) -> Self {
		Self {
			initial,
			max,
			..Self::default()
		}
	}

	pub fn factor(mut self, factor: f64) -> Self {
		self.factor = factor.max(1.0);
		self
	}

	/// Delay after the given number of failed attempts, starting at 1.
	pub fn delay_for(&self, attempts: u32) -> Duration {
		let exponent = attempts.saturating_sub(1).min(64) as i32;
		let delay = self.initial.as_secs_f64() * self.factor.powi(exponent);
		if !delay.is_finite() || delay >= self.max.as_secs_f64() {
			self.max
		} else {
			Duration::from_secs_f64(delay)
		}
	}
}

/// Like [`RecoverableRetryStrategy`](super::RecoverableRetryStrategy), but
/// waits between attempts using the actor's timers.
pub struct BackoffRetryStrategy<A: Actor> {
	control: ActorControl<A>,
	config: BackoffConfig,
	in_flight: Arc<AtomicBool>,
}

impl<A: Actor> BackoffRetryStrategy<A> {
	pub fn new(control: ActorControl<A>, config: BackoffConfig) -> Self {
		Self {
			control,
			config,
			in_flight: Arc::new(AtomicBool::new(false)),
		}
	}
}

impl<A: Actor> RetryStrategy<A> for BackoffRetryStrategy<A> {
	fn run_with_retry_until<Op, T>(&self, op: Op, terminate: T) -> ActorFuture<bool>
	where
		Op: OperationToRetry<A>,
		T: TerminateCondition<A>,
	{
		start_sequence(&self.control, &self.in_flight, RetryPolicy::Backoff(self.config.clone()), op, terminate)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_delay_grows_and_caps() {
		let config = BackoffConfig::new(Duration::from_millis(10), Duration::from_millis(50));
		assert_eq!(config.delay_for(1), Duration::from_millis(10));
		assert_eq!(config.delay_for(2), Duration::from_millis(20));
		assert_eq!(config.delay_for(3), Duration::from_millis(40));
		assert_eq!(config.delay_for(4), Duration::from_millis(50));
		assert_eq!(config.delay_for(1000), Duration::from_millis(50));
	}

	#[test]
	fn test_factor_below_one_is_clamped() {
		let config = BackoffConfig::new(Duration::from_millis(10), Duration::from_secs(1)).factor(0.5);
		assert_eq!(config.delay_for(5), Duration::from_millis(10));
	}
}
