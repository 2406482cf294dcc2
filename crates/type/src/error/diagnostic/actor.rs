// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Actor scheduler diagnostics.

use crate::error::{ErrorKind, diagnostic::Diagnostic};

/// An actor with the same name is already registered with the scheduler
pub fn actor_already_registered(name: &str) -> Diagnostic {
	Diagnostic {
		code: "ACTOR_001".to_string(),
		message: format!("Actor '{}' is already registered", name),
		label: None,
		help: Some("Close the existing actor or submit the new one under a different name".to_string()),
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}

/// A job was submitted to an actor that is closing or closed
pub fn actor_closed(name: &str) -> Diagnostic {
	Diagnostic {
		code: "ACTOR_002".to_string(),
		message: format!("Actor '{}' is closed and does not accept new jobs", name),
		label: None,
		help: None,
		notes: vec!["Jobs are only accepted until the actor starts closing".to_string()],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}

/// A job panicked while running on a worker thread
pub fn job_panicked(name: &str, reason: &str) -> Diagnostic {
	Diagnostic {
		code: "ACTOR_003".to_string(),
		message: format!("Job on actor '{}' panicked: {}", name, reason),
		label: None,
		help: None,
		notes: vec!["The worker thread survived the panic".to_string()],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}

/// The actor failed while starting or was failed by its failure handler
pub fn actor_failed(name: &str) -> Diagnostic {
	Diagnostic {
		code: "ACTOR_004".to_string(),
		message: format!("Actor '{}' failed", name),
		label: None,
		help: Some("Check the logs for the failure that moved the actor into the failed phase".to_string()),
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}

/// The scheduler was shut down
pub fn scheduler_stopped() -> Diagnostic {
	Diagnostic {
		code: "ACTOR_005".to_string(),
		message: "Actor scheduler is stopped".to_string(),
		label: None,
		help: Some("Create a new scheduler".to_string()),
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}

/// The worker pool could not be created
pub fn worker_pool_failed(reason: impl Into<String>) -> Diagnostic {
	Diagnostic {
		code: "ACTOR_006".to_string(),
		message: format!("Failed to build actor worker pool: {}", reason.into()),
		label: None,
		help: Some("Check the configured number of worker threads".to_string()),
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unrecoverable,
	}
}

/// The timer coordinator thread could not be spawned
pub fn timer_thread_failed(reason: impl Into<String>) -> Diagnostic {
	Diagnostic {
		code: "ACTOR_007".to_string(),
		message: format!("Failed to spawn timer thread: {}", reason.into()),
		label: None,
		help: None,
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unrecoverable,
	}
}

/// Shutdown was requested from inside an actor job
pub fn shutdown_from_actor() -> Diagnostic {
	Diagnostic {
		code: "ACTOR_008".to_string(),
		message: "Actor scheduler cannot be shut down from an actor job".to_string(),
		label: None,
		help: Some("Call shutdown from a thread outside the worker pool".to_string()),
		notes: vec!["Shutdown waits for every actor to close, including the calling one".to_string()],
		cause: None,
		kind: ErrorKind::Unrecoverable,
	}
}
