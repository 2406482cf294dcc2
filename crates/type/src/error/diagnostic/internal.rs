// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::error::{ErrorKind, diagnostic::Diagnostic};

/// Creates an internal error diagnostic with source location
pub fn internal_with_context(
	reason: impl Into<String>,
	file: &str,
	line: u32,
	column: u32,
	module_path: &str,
) -> Diagnostic {
	let reason = reason.into();

	Diagnostic {
		code: "INTERNAL_ERROR".to_string(),
		message: format!("Internal error: {}", reason),
		label: Some(format!("Internal invariant violated at {}:{}:{}", file, line, column)),
		help: Some("This is an internal error that should never occur in normal operation".to_string()),
		notes: vec![format!("Module: {}", module_path), format!("Version: {}", env!("CARGO_PKG_VERSION"))],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}

/// Simplified internal error without detailed context
pub fn internal(reason: impl Into<String>) -> Diagnostic {
	internal_with_context(reason, "unknown", 0, 0, "unknown")
}
