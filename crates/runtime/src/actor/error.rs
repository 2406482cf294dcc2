// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_type::{
	Error,
	error::{
		IntoDiagnostic,
		diagnostic::{Diagnostic, actor},
	},
};

/// Failures raised by the actor scheduler.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ActorError {
	#[error("actor '{name}' is already registered")]
	AlreadyRegistered {
		name: String,
	},

	#[error("actor '{name}' is closed")]
	Closed {
		name: String,
	},

	#[error("job on actor '{name}' panicked: {reason}")]
	Panicked {
		name: String,
		reason: String,
	},

	#[error("actor '{name}' failed")]
	Failed {
		name: String,
	},

	#[error("actor scheduler is stopped")]
	SchedulerStopped,

	#[error("failed to spawn worker thread: {reason}")]
	WorkerSpawn {
		reason: String,
	},
}

impl IntoDiagnostic for ActorError {
	fn into_diagnostic(self) -> Diagnostic {
		match self {
			ActorError::AlreadyRegistered {
				name,
			} => actor::actor_already_registered(&name),
			ActorError::Closed {
				name,
			} => actor::actor_closed(&name),
			ActorError::Panicked {
				name,
				reason,
			} => actor::job_panicked(&name, &reason),
			ActorError::Failed {
				name,
			} => actor::actor_failed(&name),
			ActorError::SchedulerStopped => actor::scheduler_stopped(),
			ActorError::WorkerSpawn {
				reason,
			} => actor::worker_pool_failed(reason),
		}
	}
}

impl From<ActorError> for Error {
	fn from(err: ActorError) -> Self {
		Error::new(err.into_diagnostic())
	}
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		s.to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"unknown panic".to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_into_error_keeps_code() {
		let err: Error = ActorError::AlreadyRegistered {
			name: "partition-1".to_string(),
		}
		.into();
		assert_eq!(err.code(), "ACTOR_001");
		assert!(err.message.contains("partition-1"));
	}

	#[test]
	fn test_panic_message() {
		let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
		assert_eq!(panic_message(payload.as_ref()), "boom");
		let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
		assert_eq!(panic_message(payload.as_ref()), "bang");
	}
}
