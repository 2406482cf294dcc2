// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Engine facade diagnostics.

use crate::error::{ErrorKind, diagnostic::Diagnostic};

pub fn unknown_partition(partition: u32, partitions: u32) -> Diagnostic {
	Diagnostic {
		code: "ENGINE_001".to_string(),
		message: format!("Partition {} does not exist", partition),
		label: None,
		help: Some(format!("Partitions are numbered 1 to {}", partitions)),
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}

pub fn no_partitions() -> Diagnostic {
	Diagnostic {
		code: "ENGINE_002".to_string(),
		message: "An engine needs at least one partition".to_string(),
		label: None,
		help: None,
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}

/// Storage for the same partition was attached twice
pub fn partition_storage_conflict(partition: u32) -> Diagnostic {
	Diagnostic {
		code: "ENGINE_003".to_string(),
		message: format!("Storage for partition {} was attached more than once", partition),
		label: None,
		help: None,
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}
