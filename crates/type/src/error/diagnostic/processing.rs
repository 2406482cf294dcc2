// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Stream processing diagnostics.

use crate::error::{ErrorKind, diagnostic::Diagnostic};

/// No processor is registered for the command's value type and intent
pub fn no_processor(value_type: &str, intent: &str) -> Diagnostic {
	Diagnostic {
		code: "PROCESSING_001".to_string(),
		message: format!("No processor registered for command {}.{}", value_type, intent),
		label: None,
		help: Some("Register a command processor for this value type and intent".to_string()),
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}

/// A processor is already registered for the value type and intent
pub fn processor_already_registered(value_type: &str, intent: &str) -> Diagnostic {
	Diagnostic {
		code: "PROCESSING_003".to_string(),
		message: format!("A processor for command {}.{} is already registered", value_type, intent),
		label: None,
		help: None,
		notes: vec!["Exactly one processor handles each command".to_string()],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}

/// An applier is already registered for the value type and intent
pub fn applier_already_registered(value_type: &str, intent: &str) -> Diagnostic {
	Diagnostic {
		code: "PROCESSING_004".to_string(),
		message: format!("An event applier for event {}.{} is already registered", value_type, intent),
		label: None,
		help: None,
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}

/// The partition's processing was halted after an unrecoverable failure
pub fn processing_halted(partition: u32) -> Diagnostic {
	Diagnostic {
		code: "PROCESSING_005".to_string(),
		message: format!("Stream processing of partition {} halted after an unrecoverable failure", partition),
		label: None,
		help: Some("Restart the partition to recover state from the log".to_string()),
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unrecoverable,
	}
}

/// The stream processor is not in a phase that allows the request
pub fn invalid_phase(partition: u32, phase: &str, operation: &str) -> Diagnostic {
	Diagnostic {
		code: "PROCESSING_006".to_string(),
		message: format!("Cannot {} stream processor of partition {} in phase {}", operation, partition, phase),
		label: None,
		help: None,
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}

/// A processor panicked while handling a command
pub fn processor_panicked(value_type: &str, intent: &str, reason: &str) -> Diagnostic {
	Diagnostic {
		code: "PROCESSING_007".to_string(),
		message: format!("Processor for command {}.{} panicked: {}", value_type, intent, reason),
		label: None,
		help: None,
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}
