// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

pub mod actor;
pub mod codec;
pub mod engine;
pub mod future;
pub mod internal;
pub mod log;
pub mod processing;
pub mod render;
pub mod retry;
pub mod state;
pub mod tracing;

/// Structured description of a failure.
///
/// `code` is stable and meant for matching in tests and by callers, `message`
/// is human readable. `kind` decides whether the failure may be retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
	pub code: String,
	pub message: String,
	pub label: Option<String>,
	pub help: Option<String>,
	pub notes: Vec<String>,
	pub cause: Option<Box<Diagnostic>>,
	#[serde(default)]
	pub kind: ErrorKind,
}

impl Diagnostic {
	pub fn with_cause(mut self, cause: Diagnostic) -> Self {
		self.cause = Some(Box::new(cause));
		self
	}

	/// Walks the cause chain, starting with `self`.
	pub fn chain(&self) -> impl Iterator<Item = &Diagnostic> {
		std::iter::successors(Some(self), |d| d.cause.as_deref())
	}
}
