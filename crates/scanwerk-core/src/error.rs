// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanwerk.

use thiserror::Error;

use crate::types::{FrameFormat, Status};

/// What went wrong while reading an option value literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("bad option value")]
    BadValue,
    #[error("illegal unit")]
    IllegalUnit,
    #[error("closing bracket missing")]
    MissingBracket,
    #[error("index {index} out of range [0..{max}]", max = .len.saturating_sub(1))]
    IndexOutOfRange { index: i64, len: usize },
    #[error("illegal separator")]
    IllegalSeparator,
}

/// A malformed option literal. Always fatal, and raised before the device is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("option --{option}: {kind} (rest of option: {rest})")]
pub struct ParseError {
    /// Name of the capability whose value was being parsed.
    pub option: String,
    pub kind: ParseErrorKind,
    /// Unparsed remainder of the literal at the point of failure.
    pub rest: String,
}

impl ParseError {
    pub fn new(option: &str, kind: ParseErrorKind, rest: &str) -> Self {
        Self {
            option: option.to_string(),
            kind,
            rest: rest.to_string(),
        }
    }
}

/// Top-level error type for all Scanwerk operations.
#[derive(Debug, Error)]
pub enum ScanwerkError {
    // -- Option errors --
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("setting of option --{option} failed ({status})")]
    OptionRejected { option: String, status: Status },

    #[error("no capability with index {0}")]
    UnknownCapability(usize),

    // -- Device errors --
    #[error("no scanning devices found")]
    NoDevice,

    #[error("failed to open device {name}: {status}")]
    DeviceOpen { name: String, status: Status },

    #[error("{operation}: {status}")]
    Device {
        operation: &'static str,
        status: Status,
    },

    #[error("scanner still warming up after {attempts} attempts, it must be frozen")]
    FrozenDevice { attempts: u32 },

    // -- Capture errors --
    #[error("unsupported {format} image at {depth} bits per sample")]
    FormatUnsupported { format: FrameFormat, depth: u32 },

    #[error("setting the scanning area is not supported on this scanner")]
    GeometryUnsupported,

    #[error("unknown paper name: {0}")]
    UnknownPaper(String),

    #[error("out of resources: {0}")]
    Resource(String),

    // -- Output errors --
    #[error("container error: {0}")]
    Container(String),

    #[error("invalid output template: {0}")]
    Template(String),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScanwerkError {
    /// Shorthand for a device call that returned a non-good status.
    pub fn device(operation: &'static str, status: Status) -> Self {
        Self::Device { operation, status }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_names_option_and_rest() {
        let err = ParseError::new("resolution", ParseErrorKind::IllegalUnit, "furlongs");
        assert_eq!(
            err.to_string(),
            "option --resolution: illegal unit (rest of option: furlongs)"
        );
    }

    #[test]
    fn out_of_range_reports_last_valid_index() {
        let kind = ParseErrorKind::IndexOutOfRange { index: 300, len: 256 };
        assert_eq!(kind.to_string(), "index 300 out of range [0..255]");
    }

    #[test]
    fn option_rejection_mentions_status() {
        let err = ScanwerkError::OptionRejected {
            option: "mode".into(),
            status: Status::InvalidArgument,
        };
        assert_eq!(err.to_string(), "setting of option --mode failed (Invalid argument)");
    }
}
