// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamProcessorPhase {
	/// Replaying the log to rebuild state.
	Initializing,
	Processing,
	Paused,
	Closing,
	Closed,
	/// Halted after an unrecoverable failure.
	Failed,
}

impl Display for StreamProcessorPhase {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			StreamProcessorPhase::Initializing => "INITIALIZING",
			StreamProcessorPhase::Processing => "PROCESSING",
			StreamProcessorPhase::Paused => "PAUSED",
			StreamProcessorPhase::Closing => "CLOSING",
			StreamProcessorPhase::Closed => "CLOSED",
			StreamProcessorPhase::Failed => "FAILED",
		};
		f.write_str(s)
	}
}

/// How far the processor escalated while failing to process the current
/// command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorHandlingPhase {
	#[default]
	NoError,
	/// Processing a client command failed.
	UserCommandProcessingFailed,
	/// Processing an internal command failed.
	ProcessingFailed,
	/// Handling the processing error of an internal command failed.
	ProcessingErrorFailed,
	/// Handling the processing error of a client command failed.
	UserCommandProcessingErrorFailed,
	/// Rejecting a client command with the error's message failed.
	UserCommandRejectFailed,
	/// Rejecting a client command with a generic message failed.
	UserCommandRejectSimpleRejectFailed,
	/// Every attempt failed. Processing keeps retrying without progress.
	EndlessErrorLoop,
}

impl ErrorHandlingPhase {
	/// The phase after one more failed attempt.
	pub fn escalate(self) -> Self {
		match self {
			ErrorHandlingPhase::NoError => ErrorHandlingPhase::NoError,
			ErrorHandlingPhase::ProcessingFailed => ErrorHandlingPhase::ProcessingErrorFailed,
			ErrorHandlingPhase::UserCommandProcessingFailed => ErrorHandlingPhase::UserCommandProcessingErrorFailed,
			ErrorHandlingPhase::UserCommandProcessingErrorFailed => ErrorHandlingPhase::UserCommandRejectFailed,
			ErrorHandlingPhase::UserCommandRejectFailed => ErrorHandlingPhase::UserCommandRejectSimpleRejectFailed,
			ErrorHandlingPhase::ProcessingErrorFailed
			| ErrorHandlingPhase::UserCommandRejectSimpleRejectFailed
			| ErrorHandlingPhase::EndlessErrorLoop => ErrorHandlingPhase::EndlessErrorLoop,
		}
	}
}
