// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Partition log diagnostics.

use crate::error::{ErrorKind, diagnostic::Diagnostic};

/// The log stream was closed
pub fn log_closed(partition: u32) -> Diagnostic {
	Diagnostic {
		code: "LOG_001".to_string(),
		message: format!("Log stream of partition {} is closed", partition),
		label: None,
		help: None,
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unrecoverable,
	}
}

/// A follow-up batch referenced a source position at or after the log head
pub fn source_position_not_written(source: u64, last: u64) -> Diagnostic {
	Diagnostic {
		code: "LOG_002".to_string(),
		message: format!(
			"Source position {} has not been written yet (last written position {})",
			source, last
		),
		label: None,
		help: None,
		notes: vec!["Follow-up records must be written after their source record".to_string()],
		cause: None,
		kind: ErrorKind::Unrecoverable,
	}
}

/// The log temporarily rejected a write
pub fn write_rejected(partition: u32, reason: impl Into<String>) -> Diagnostic {
	Diagnostic {
		code: "LOG_003".to_string(),
		message: format!("Write to log of partition {} was rejected: {}", partition, reason.into()),
		label: None,
		help: None,
		notes: vec![],
		cause: None,
		kind: ErrorKind::Recoverable,
	}
}
