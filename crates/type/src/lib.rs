// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Shared types for the strata engine.
//!
//! Every fallible operation across the workspace returns [`Result`], whose error
//! carries a [`Diagnostic`](error::diagnostic::Diagnostic) with a stable code and an
//! [`ErrorKind`](error::ErrorKind) classification.

pub mod error;

pub use error::{Error, ErrorKind};

pub type Result<T> = std::result::Result<T, Error>;
