// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Transactional state diagnostics.

use crate::error::{ErrorKind, diagnostic::Diagnostic};

/// Committing the state transaction failed
pub fn commit_failed(reason: impl Into<String>) -> Diagnostic {
	Diagnostic {
		code: "STATE_002".to_string(),
		message: format!("State transaction commit failed: {}", reason.into()),
		label: None,
		help: Some("The commit is retried until it succeeds or processing is aborted".to_string()),
		notes: vec![],
		cause: None,
		kind: ErrorKind::Recoverable,
	}
}

/// The persisted key generator value was corrupt
pub fn corrupt_value(column_family: &str) -> Diagnostic {
	Diagnostic {
		code: "STATE_003".to_string(),
		message: format!("Stored value in column family '{}' could not be decoded", column_family),
		label: None,
		help: Some("This may indicate data corruption".to_string()),
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unrecoverable,
	}
}
