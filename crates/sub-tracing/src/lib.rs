// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Installs the process wide `tracing` subscriber.

mod builder;

pub use builder::{DEFAULT_LEVEL, TracingBuilder};

/// Adjusts a [`TracingBuilder`] before it is installed.
pub type TracingConfigurator = Box<dyn FnOnce(TracingBuilder) -> TracingBuilder + Send>;

/// Applies an optional configurator to a default builder and installs it.
pub fn install(configurator: Option<TracingConfigurator>) -> strata_type::Result<()> {
	let builder = match configurator {
		Some(configurator) => configurator(TracingBuilder::new()),
		None => TracingBuilder::default(),
	};
	builder.try_init()
}
