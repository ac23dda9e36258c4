// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk: core types, error definitions and the option value grammar shared
// across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;
pub mod value;

pub use config::RunConfig;
pub use error::{ParseError, ParseErrorKind, ScanwerkError};
pub use types::*;
pub use value::{ParsedValue, VectorBuffer};
