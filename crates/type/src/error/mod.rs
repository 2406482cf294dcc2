// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	fmt::{Display, Formatter},
	ops::{Deref, DerefMut},
};

use serde::{Deserialize, Serialize};

pub mod diagnostic;
mod r#macro;

use diagnostic::{Diagnostic, render::DefaultRenderer};

/// Classification used by retry strategies and the stream processor to decide
/// whether a failure may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorKind {
	/// A transient condition. Retrying the same operation may succeed.
	Recoverable,
	/// Continuing after this failure would leave state inconsistent.
	Unrecoverable,
	/// Anything not explicitly classified.
	#[default]
	Unexpected,
}

impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorKind::Recoverable => f.write_str("recoverable"),
			ErrorKind::Unrecoverable => f.write_str("unrecoverable"),
			ErrorKind::Unexpected => f.write_str("unexpected"),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Error(pub Box<Diagnostic>);

impl Error {
	/// Wraps the diagnostic, keeping whatever kind it already carries.
	pub fn new(diagnostic: Diagnostic) -> Self {
		Self(Box::new(diagnostic))
	}

	/// Wraps the diagnostic and marks it as transient.
	pub fn recoverable(diagnostic: Diagnostic) -> Self {
		Self::new(diagnostic).with_kind(ErrorKind::Recoverable)
	}

	/// Wraps the diagnostic and marks it as fatal for the caller.
	pub fn unrecoverable(diagnostic: Diagnostic) -> Self {
		Self::new(diagnostic).with_kind(ErrorKind::Unrecoverable)
	}

	pub fn with_kind(mut self, kind: ErrorKind) -> Self {
		self.0.kind = kind;
		self
	}

	pub fn kind(&self) -> ErrorKind {
		self.0.kind
	}

	pub fn is_recoverable(&self) -> bool {
		self.0.kind == ErrorKind::Recoverable
	}

	pub fn is_unrecoverable(&self) -> bool {
		self.0.kind == ErrorKind::Unrecoverable
	}

	pub fn code(&self) -> &str {
		&self.0.code
	}

	pub fn diagnostic(self) -> Diagnostic {
		*self.0
	}
}

impl Deref for Error {
	type Target = Diagnostic;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl DerefMut for Error {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let out = DefaultRenderer::render_string(&self.0);
		f.write_str(out.as_str())
	}
}

impl std::error::Error for Error {}

impl From<Diagnostic> for Error {
	fn from(diagnostic: Diagnostic) -> Self {
		Error::new(diagnostic)
	}
}

impl From<postcard::Error> for Error {
	fn from(err: postcard::Error) -> Self {
		crate::error!(diagnostic::codec::postcard_error(err))
	}
}

/// Conversion of subsystem error enums into a [`Diagnostic`].
pub trait IntoDiagnostic {
	fn into_diagnostic(self) -> Diagnostic;
}

impl IntoDiagnostic for Diagnostic {
	fn into_diagnostic(self) -> Diagnostic {
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::diagnostic::internal::internal;

	#[test]
	fn test_default_kind_is_unexpected() {
		let err = Error::new(internal("boom"));
		assert_eq!(err.kind(), ErrorKind::Unexpected);
		assert!(!err.is_recoverable());
	}

	#[test]
	fn test_kind_constructors() {
		assert!(Error::recoverable(internal("x")).is_recoverable());
		assert!(Error::unrecoverable(internal("x")).is_unrecoverable());
	}

	#[test]
	fn test_display_contains_code_and_message() {
		let err = Error::new(diagnostic::retry::sequence_in_flight());
		let rendered = err.to_string();
		assert!(rendered.contains("RETRY_001"));
		assert!(rendered.contains("retry sequence"));
	}

	#[test]
	fn test_postcard_error_converts() {
		let err: Error = postcard::Error::DeserializeUnexpectedEnd.into();
		assert_eq!(err.code(), "CODEC_001");
	}
}
