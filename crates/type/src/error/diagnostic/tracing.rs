// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::error::{ErrorKind, diagnostic::Diagnostic};

/// The configured filter directive could not be parsed
pub fn invalid_filter(filter: &str, reason: impl Into<String>) -> Diagnostic {
	Diagnostic {
		code: "TRACING_001".to_string(),
		message: format!("Invalid tracing filter '{}': {}", filter, reason.into()),
		label: None,
		help: Some("Use directives such as 'info' or 'strata_stream=debug,warn'".to_string()),
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unrecoverable,
	}
}

/// A global subscriber was installed before
pub fn already_initialized(reason: impl Into<String>) -> Diagnostic {
	Diagnostic {
		code: "TRACING_002".to_string(),
		message: format!("Tracing subscriber could not be installed: {}", reason.into()),
		label: None,
		help: None,
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}
