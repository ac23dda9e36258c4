// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator-facing error messages.
//
// Every fatal error is mapped to a plain message plus what to try next. The
// severity decides how the command line presents it and which exit code wins.

use crate::error::ScanwerkError;
use crate::types::{Status, StatusClass};

/// Severity of an error from the operator's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Expected stop such as an empty feeder; not a failure.
    Informational,
    /// The operator must change the command line or the hardware setup.
    ActionRequired,
    /// The device or output failed.
    Failure,
}

/// A readable error with an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: Option<String>,
    pub severity: Severity,
}

impl HumanError {
    fn new(message: impl Into<String>, suggestion: Option<&str>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.map(str::to_string),
            severity,
        }
    }
}

/// Convert a `ScanwerkError` into something an operator can act on.
pub fn humanize_error(err: &ScanwerkError) -> HumanError {
    match err {
        ScanwerkError::Parse(parse) => HumanError::new(
            parse.to_string(),
            Some("Run with --help to see the values each option accepts."),
            Severity::ActionRequired,
        ),

        ScanwerkError::OptionRejected { status, .. } => HumanError::new(
            err.to_string(),
            match status {
                Status::InvalidArgument => {
                    Some("The scanner does not accept this value; check --help for its range.")
                }
                _ => None,
            },
            Severity::ActionRequired,
        ),

        ScanwerkError::NoDevice => HumanError::new(
            "No scanners were identified.",
            Some(
                "Check that the scanner is plugged in, turned on and detected by its backend, \
                 then try --list-devices.",
            ),
            Severity::ActionRequired,
        ),

        ScanwerkError::DeviceOpen { name, .. } if name.starts_with('/') => HumanError::new(
            err.to_string(),
            Some(
                "This looks like a UNIX device or file name. Select a scanner by its backend \
                 name instead (for example 'virtual:flatbed'); --list-devices shows them.",
            ),
            Severity::ActionRequired,
        ),

        ScanwerkError::DeviceOpen { .. } => HumanError::new(
            err.to_string(),
            Some("Use --list-devices to see the available scanners."),
            Severity::ActionRequired,
        ),

        ScanwerkError::Device { status, .. } => humanize_status(*status, err),

        ScanwerkError::FrozenDevice { .. } => HumanError::new(
            err.to_string(),
            Some("Power-cycle the scanner and try again."),
            Severity::Failure,
        ),

        ScanwerkError::FormatUnsupported { .. } => HumanError::new(
            err.to_string(),
            Some("Choose another mode or bit depth."),
            Severity::ActionRequired,
        ),

        ScanwerkError::GeometryUnsupported => HumanError::new(
            err.to_string(),
            Some("Set the area with the scanner's own geometry options instead of --paper."),
            Severity::ActionRequired,
        ),

        ScanwerkError::UnknownPaper(_) => HumanError::new(
            err.to_string(),
            Some("Use a standard name such as a4, a5, letter or legal."),
            Severity::ActionRequired,
        ),

        ScanwerkError::Template(_) => HumanError::new(
            err.to_string(),
            Some("Only %d, %Nd and %0Nd page number placeholders are supported; write %% for a literal percent sign."),
            Severity::ActionRequired,
        ),

        ScanwerkError::Config(_) | ScanwerkError::Serialization(_) => HumanError::new(
            err.to_string(),
            Some("Fix the configuration file given with --config."),
            Severity::ActionRequired,
        ),

        ScanwerkError::UnknownCapability(_)
        | ScanwerkError::Resource(_)
        | ScanwerkError::Container(_)
        | ScanwerkError::Io(_) => HumanError::new(err.to_string(), None, Severity::Failure),
    }
}

fn humanize_status(status: Status, err: &ScanwerkError) -> HumanError {
    match (status, status.class()) {
        (_, StatusClass::Informational) => {
            HumanError::new(status.to_string(), None, Severity::Informational)
        }
        (Status::Jammed, _) => HumanError::new(
            err.to_string(),
            Some("Clear the paper jam in the document feeder."),
            Severity::ActionRequired,
        ),
        (Status::CoverOpen, _) => HumanError::new(
            err.to_string(),
            Some("Close the scanner cover."),
            Severity::ActionRequired,
        ),
        (Status::DeviceBusy, _) => HumanError::new(
            err.to_string(),
            Some("Another program is using the scanner."),
            Severity::ActionRequired,
        ),
        _ => HumanError::new(err.to_string(), None, Severity::Failure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_like_device_names_get_a_hint() {
        let err = ScanwerkError::DeviceOpen {
            name: "/dev/sg0".into(),
            status: Status::InvalidArgument,
        };
        let human = humanize_error(&err);
        assert!(human.suggestion.unwrap().contains("UNIX device"));
    }

    #[test]
    fn empty_feeder_is_informational() {
        let err = ScanwerkError::device("start", Status::NoDocuments);
        assert_eq!(humanize_error(&err).severity, Severity::Informational);
    }

    #[test]
    fn io_status_is_a_failure() {
        let err = ScanwerkError::device("read", Status::IoError);
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Failure);
        assert_eq!(human.message, "read: Error during device I/O");
    }
}
