// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::error::{ErrorKind, diagnostic::Diagnostic};

/// Encoding or decoding with postcard failed
pub fn postcard_error(err: postcard::Error) -> Diagnostic {
	Diagnostic {
		code: "CODEC_001".to_string(),
		message: format!("Codec error: {}", err),
		label: None,
		help: Some("This may indicate data corruption or a record value type mismatch".to_string()),
		notes: vec![],
		cause: None,
		kind: ErrorKind::Unexpected,
	}
}
