// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_type::{
	Result,
	error::diagnostic::tracing::{already_initialized, invalid_filter},
	return_error,
};
use tracing::{Level, debug};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LEVEL: Level = Level::INFO;

/// Builder for the global `fmt` subscriber.
///
/// Without an explicit filter the `RUST_LOG` environment variable is used,
/// falling back to the configured level.
#[derive(Debug, Clone)]
pub struct TracingBuilder {
	level: Level,
	filter: Option<String>,
	target: bool,
	thread_names: bool,
	json: bool,
	ansi: bool,
	test_writer: bool,
}

impl Default for TracingBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl TracingBuilder {
	pub fn new() -> Self {
		Self {
			level: DEFAULT_LEVEL,
			filter: None,
			target: true,
			thread_names: true,
			json: false,
			ansi: true,
			test_writer: false,
		}
	}

	pub fn level(mut self, level: Level) -> Self {
		self.level = level;
		self
	}

	/// Filter directives, e.g. `strata_stream=debug,warn`. Overrides `RUST_LOG`.
	pub fn filter(mut self, directives: impl Into<String>) -> Self {
		self.filter = Some(directives.into());
		self
	}

	pub fn with_target(mut self, target: bool) -> Self {
		self.target = target;
		self
	}

	pub fn with_thread_names(mut self, thread_names: bool) -> Self {
		self.thread_names = thread_names;
		self
	}

	pub fn json(mut self, json: bool) -> Self {
		self.json = json;
		self
	}

	pub fn with_ansi(mut self, ansi: bool) -> Self {
		self.ansi = ansi;
		self
	}

	/// Writes through the test harness so output is captured per test.
	pub fn with_test_writer(mut self) -> Self {
		self.test_writer = true;
		self.ansi = false;
		self
	}

	pub fn env_filter(&self) -> Result<EnvFilter> {
		match &self.filter {
			Some(directives) => match EnvFilter::try_new(directives) {
				Ok(filter) => Ok(filter),
				Err(err) => return_error!(invalid_filter(directives, err.to_string())),
			},
			None => Ok(EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_lowercase()))),
		}
	}

	/// Installs the subscriber. Fails if one is already installed.
	pub fn try_init(self) -> Result<()> {
		let filter = self.env_filter()?;

		let builder = tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_target(self.target)
			.with_thread_names(self.thread_names)
			.with_ansi(self.ansi);

		let installed = match (self.json, self.test_writer) {
			(true, true) => builder.json().with_test_writer().try_init(),
			(true, false) => builder.json().try_init(),
			(false, true) => builder.with_test_writer().try_init(),
			(false, false) => builder.try_init(),
		};

		if let Err(err) = installed {
			return_error!(already_initialized(err.to_string()));
		}
		debug!(json = self.json, "tracing subscriber installed");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let builder = TracingBuilder::default();
		assert_eq!(builder.level, Level::INFO);
		assert!(builder.filter.is_none());
		assert!(builder.target);
		assert!(!builder.json);
	}

	#[test]
	fn test_explicit_filter_is_parsed() {
		let filter = TracingBuilder::new().filter("strata_stream=debug,warn").env_filter().unwrap();
		assert!(filter.to_string().contains("strata_stream=debug"));
	}

	#[test]
	fn test_invalid_filter_is_rejected() {
		let err = TracingBuilder::new().filter("strata_stream=loud").env_filter().unwrap_err();
		assert_eq!(err.code(), "TRACING_001");
		assert!(err.message.contains("strata_stream=loud"));
	}

	#[test]
	fn test_invalid_filter_fails_init() {
		let err = TracingBuilder::new().filter("strata_stream=loud").try_init().unwrap_err();
		assert_eq!(err.code(), "TRACING_001");
	}

	#[test]
	fn test_second_init_fails() {
		let _ = TracingBuilder::new().with_test_writer().level(Level::DEBUG).try_init();
		let err = TracingBuilder::new().with_test_writer().try_init().unwrap_err();
		assert_eq!(err.code(), "TRACING_002");
	}
}
