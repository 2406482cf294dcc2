// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::error::{ErrorKind, diagnostic::Diagnostic};

/// A retry strategy instance was reused while its previous sequence is still running
pub fn sequence_in_flight() -> Diagnostic {
	Diagnostic {
		code: "RETRY_001".to_string(),
		message: "A retry sequence is already in flight on this strategy".to_string(),
		label: None,
		help: Some("Use one strategy instance per concurrent retry sequence".to_string()),
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}
