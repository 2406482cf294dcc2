// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

use crate::error::{ErrorKind, diagnostic::Diagnostic};

/// A blocking join was attempted on an actor worker thread
pub fn blocking_join_on_actor_thread() -> Diagnostic {
	Diagnostic {
		code: "FUTURE_001".to_string(),
		message: "Blocking join on an actor future from an actor worker thread".to_string(),
		label: None,
		help: Some("Register a continuation with run_on_completion instead of joining".to_string()),
		notes: vec!["Blocking a worker thread can deadlock the scheduler".to_string()],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}

/// The future did not complete within the given timeout
pub fn join_timeout(timeout: Duration) -> Diagnostic {
	Diagnostic {
		code: "FUTURE_002".to_string(),
		message: format!("Future did not complete within {:?}", timeout),
		label: None,
		help: None,
		notes: vec![],
		cause: None,
		kind: ErrorKind::Recoverable,
	}
}
