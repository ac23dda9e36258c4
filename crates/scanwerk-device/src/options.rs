// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Option application: turns one command-line value into a device set call.

use tracing::{debug, info, instrument, warn};

use scanwerk_core::config::BatchConfig;
use scanwerk_core::error::{ParseError, ParseErrorKind, Result, ScanwerkError};
use scanwerk_core::value::{format_words, is_auto_literal, parse_bool};
use scanwerk_core::{CapabilityDescriptor, OptionValue, SetInfo, Status, ValueKind, VectorBuffer};

use crate::registry::CapabilityRegistry;
use crate::traits::Device;

/// Source literal that turns batch mode on.
const FEEDER_LITERAL: &str = "Automatic Document Feeder";

/// What happened to an option value. Rejections are returned as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The device accepted the value, possibly after rounding it.
    Applied { inexact: bool },
    /// The capability is inactive; nothing was sent.
    Inactive,
    /// The device now picks the value itself.
    Automatic,
    /// The device refused automatic mode. Not fatal.
    AutomaticFailed(Status),
}

/// Applies option values to a device.
///
/// Holds the scratch buffer for vector values so repeated options reuse it.
#[derive(Debug, Default)]
pub struct OptionEngine {
    buffer: VectorBuffer,
}

impl OptionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `text` to the capability at device `index`.
    ///
    /// `text` is `None` when the flag was given without a value, which means
    /// "yes" for booleans and "press" for buttons. Selecting the document
    /// feeder as scan source switches `batch` on.
    #[instrument(skip(self, device, registry, batch))]
    pub fn apply(
        &mut self,
        device: &mut dyn Device,
        registry: &mut CapabilityRegistry,
        index: usize,
        text: Option<&str>,
        batch: &mut BatchConfig,
    ) -> Result<ApplyOutcome> {
        let desc = registry
            .by_index(index)
            .map(|entry| entry.descriptor.clone())
            .ok_or(ScanwerkError::UnknownCapability(index))?;

        if !desc.active {
            info!("attempted to set inactive option {}, ignoring", desc.name);
            return Ok(ApplyOutcome::Inactive);
        }

        if desc.automatic && text.is_some_and(is_auto_literal) {
            return Ok(match device.set_auto(index) {
                Ok(()) => {
                    debug!(option = %desc.name, "set to automatic");
                    ApplyOutcome::Automatic
                }
                Err(status) => {
                    warn!(
                        "failed to set option --{} to automatic ({})",
                        desc.name, status
                    );
                    ApplyOutcome::AutomaticFailed(status)
                }
            });
        }

        let value = self.value_for(index, &desc, text)?;
        let info = set_with_fallback(device, index, &desc, &value).map_err(|status| {
            ScanwerkError::OptionRejected {
                option: desc.name.clone(),
                status,
            }
        })?;

        if info.inexact {
            report_rounding(&desc, &value, &info.effective);
        }

        if desc.name.starts_with("source")
            && text.is_some_and(|t| t.starts_with(FEEDER_LITERAL))
            && !batch.enabled
        {
            info!("document feeder selected, batch mode enabled");
            batch.enabled = true;
        }

        if info.reload_options {
            registry.refresh(&*device)?;
        }

        Ok(ApplyOutcome::Applied {
            inexact: info.inexact,
        })
    }

    fn value_for(
        &mut self,
        index: usize,
        desc: &CapabilityDescriptor,
        text: Option<&str>,
    ) -> Result<OptionValue> {
        let literal = text.unwrap_or("");
        let bad_value = || ParseError::new(&desc.name, ParseErrorKind::BadValue, literal);

        Ok(match desc.kind {
            ValueKind::Bool => OptionValue::Bool(parse_bool(literal).ok_or_else(bad_value)?),
            ValueKind::Int | ValueKind::Fixed => {
                OptionValue::Words(self.buffer.parse(desc, literal)?.to_words())
            }
            ValueKind::String => {
                let text = text.ok_or_else(bad_value)?;
                OptionValue::Text(truncate_to_size(text, desc.size).to_string())
            }
            ValueKind::Button => OptionValue::Button,
            ValueKind::Group => return Err(ScanwerkError::UnknownCapability(index)),
        })
    }
}

fn set_with_fallback(
    device: &mut dyn Device,
    index: usize,
    desc: &CapabilityDescriptor,
    value: &OptionValue,
) -> std::result::Result<SetInfo, Status> {
    match device.set_value(index, value) {
        Err(status) if desc.name == "mode" && *value == OptionValue::Text("binary".into()) => {
            debug!(%status, "mode binary rejected, retrying as lineart");
            device.set_value(index, &OptionValue::Text("lineart".into()))
        }
        result => result,
    }
}

fn report_rounding(desc: &CapabilityDescriptor, requested: &OptionValue, effective: &OptionValue) {
    match (requested, effective) {
        (OptionValue::Words(from), OptionValue::Words(to)) => warn!(
            "rounded value of {} from {} to {}",
            desc.name,
            format_words(desc, from),
            format_words(desc, to)
        ),
        _ => warn!("device adjusted the value of {}", desc.name),
    }
}

/// Cut `text` so it fits a string capability of `size` bytes including the
/// terminator.
fn truncate_to_size(text: &str, size: usize) -> &str {
    let limit = size.saturating_sub(1);
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_device::VirtualScanner;

    struct Fixture {
        scanner: VirtualScanner,
        registry: CapabilityRegistry,
        engine: OptionEngine,
        batch: BatchConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let scanner = VirtualScanner::flatbed().with_sheets(2);
            let registry = CapabilityRegistry::build(&scanner).unwrap();
            Self {
                scanner,
                registry,
                engine: OptionEngine::new(),
                batch: BatchConfig::default(),
            }
        }

        fn apply(&mut self, name: &str, text: Option<&str>) -> Result<ApplyOutcome> {
            let index = self.registry.by_name(name).unwrap().index;
            self.engine.apply(
                &mut self.scanner,
                &mut self.registry,
                index,
                text,
                &mut self.batch,
            )
        }

        fn value(&self, name: &str) -> OptionValue {
            let index = self.registry.by_name(name).unwrap().index;
            self.scanner.get_value(index).unwrap()
        }
    }

    #[test]
    fn feeder_source_turns_batch_on() {
        let mut fx = Fixture::new();
        assert!(!fx.batch.enabled);
        fx.apply("source", Some("Automatic Document Feeder")).unwrap();
        assert!(fx.batch.enabled);
    }

    /// A scanner whose document feeder is unplugged.
    struct NoFeeder(VirtualScanner);

    impl Device for NoFeeder {
        fn info(&self) -> &scanwerk_core::DeviceInfo {
            self.0.info()
        }
        fn descriptors(&self) -> std::result::Result<Vec<CapabilityDescriptor>, Status> {
            self.0.descriptors()
        }
        fn descriptor(&self, index: usize) -> std::result::Result<CapabilityDescriptor, Status> {
            self.0.descriptor(index)
        }
        fn get_value(&self, index: usize) -> std::result::Result<OptionValue, Status> {
            self.0.get_value(index)
        }
        fn set_value(
            &mut self,
            index: usize,
            value: &OptionValue,
        ) -> std::result::Result<SetInfo, Status> {
            match value {
                OptionValue::Text(text) if text.starts_with(FEEDER_LITERAL) => Err(Status::Jammed),
                _ => self.0.set_value(index, value),
            }
        }
        fn set_auto(&mut self, index: usize) -> std::result::Result<(), Status> {
            self.0.set_auto(index)
        }
        fn start(&mut self) -> std::result::Result<(), Status> {
            self.0.start()
        }
        fn parameters(&self) -> std::result::Result<scanwerk_core::Parameters, Status> {
            self.0.parameters()
        }
        fn read(&mut self, buf: &mut [u8]) -> std::result::Result<usize, Status> {
            self.0.read(buf)
        }
        fn cancel(&mut self) {
            self.0.cancel();
        }
    }

    #[test]
    fn rejected_feeder_source_leaves_batch_off() {
        let mut device = NoFeeder(VirtualScanner::flatbed());
        let mut registry = CapabilityRegistry::build(&device).unwrap();
        let index = registry.by_name("source").unwrap().index;
        let mut batch = BatchConfig::default();

        let err = OptionEngine::new()
            .apply(
                &mut device,
                &mut registry,
                index,
                Some("Automatic Document Feeder"),
                &mut batch,
            )
            .unwrap_err();
        assert!(matches!(err, ScanwerkError::OptionRejected { status: Status::Jammed, .. }));
        assert!(!batch.enabled);
    }

    #[test]
    fn flatbed_source_leaves_batch_alone() {
        let mut fx = Fixture::new();
        fx.apply("source", Some("Flatbed")).unwrap();
        assert!(!fx.batch.enabled);
    }

    #[test]
    fn binary_mode_falls_back_to_lineart() {
        let mut fx = Fixture::new();
        let outcome = fx.apply("mode", Some("binary")).unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied { inexact: false });
        assert_eq!(fx.value("mode"), OptionValue::Text("lineart".into()));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let mut fx = Fixture::new();
        let err = fx.apply("mode", Some("sepia")).unwrap_err();
        assert!(matches!(
            err,
            ScanwerkError::OptionRejected { ref option, status: Status::InvalidArgument }
                if option == "mode"
        ));
    }

    #[test]
    fn inactive_option_is_ignored() {
        let mut fx = Fixture::new();
        assert_eq!(
            fx.apply("gamma-table", Some("[0]0-[255]255")).unwrap(),
            ApplyOutcome::Inactive
        );
    }

    #[test]
    fn enabling_custom_gamma_activates_the_table() {
        let mut fx = Fixture::new();
        fx.apply("custom-gamma", None).unwrap();
        assert_eq!(
            fx.apply("gamma-table", Some("[0]15-[255]15")).unwrap(),
            ApplyOutcome::Applied { inexact: false }
        );
        let OptionValue::Words(table) = fx.value("gamma-table") else {
            panic!("gamma table is numeric");
        };
        assert!(table.iter().all(|&w| w == 15));
    }

    #[test]
    fn rounding_is_reported_but_succeeds() {
        let mut fx = Fixture::new();
        assert_eq!(
            fx.apply("resolution", Some("310dpi")).unwrap(),
            ApplyOutcome::Applied { inexact: true }
        );
        assert_eq!(fx.value("resolution"), OptionValue::Words(vec![300]));
    }

    #[test]
    fn auto_on_capable_option() {
        let mut fx = Fixture::new();
        assert_eq!(fx.apply("brightness", Some("auto")).unwrap(), ApplyOutcome::Automatic);
    }

    #[test]
    fn auto_on_plain_option_is_a_parse_error() {
        let mut fx = Fixture::new();
        let err = fx.apply("resolution", Some("auto")).unwrap_err();
        assert!(matches!(
            err,
            ScanwerkError::Parse(ParseError { kind: ParseErrorKind::BadValue, .. })
        ));
    }

    #[test]
    fn parse_error_leaves_device_untouched() {
        let mut fx = Fixture::new();
        assert!(fx.apply("resolution", Some("300furlongs")).is_err());
        assert_eq!(fx.value("resolution"), OptionValue::Words(vec![150]));
    }

    #[test]
    fn geometry_accepts_units() {
        let mut fx = Fixture::new();
        fx.apply("br-x", Some("10cm")).unwrap();
        assert_eq!(
            fx.value("br-x"),
            OptionValue::Words(vec![scanwerk_core::fix(100.0)])
        );
    }

    #[test]
    fn bool_values() {
        let mut fx = Fixture::new();
        fx.apply("preview", Some("y")).unwrap();
        assert_eq!(fx.value("preview"), OptionValue::Bool(true));
        fx.apply("preview", Some("no")).unwrap();
        assert_eq!(fx.value("preview"), OptionValue::Bool(false));
        assert!(fx.apply("preview", Some("maybe")).is_err());
    }

    #[test]
    fn buttons_need_no_value() {
        let mut fx = Fixture::new();
        assert_eq!(
            fx.apply("calibrate", None).unwrap(),
            ApplyOutcome::Applied { inexact: false }
        );
    }

    #[test]
    fn truncation_respects_terminator_and_char_boundaries() {
        assert_eq!(truncate_to_size("Flatbed", 5), "Flat");
        assert_eq!(truncate_to_size("Flatbed", 32), "Flatbed");
        assert_eq!(truncate_to_size("größe", 4), "gr");
    }
}
