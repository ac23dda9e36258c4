// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan-area geometry from a paper name.

use tracing::{info, instrument, warn};

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{OptionValue, PaperSize, fix, unfix};

use crate::paper;
use crate::registry::CapabilityRegistry;
use crate::traits::Device;

/// Set the bottom-right corner to the size of `paper_name`.
///
/// The top-left corner keeps whatever the device has. Fails when the paper
/// is unknown or the device does not expose all four corners.
#[instrument(skip(device, registry))]
pub fn apply_paper(
    device: &mut dyn Device,
    registry: &CapabilityRegistry,
    paper_name: &str,
) -> Result<PaperSize> {
    let size =
        paper::lookup(paper_name).ok_or_else(|| ScanwerkError::UnknownPaper(paper_name.into()))?;
    let [_, _, br_x, br_y] = registry
        .corners()
        .complete()
        .ok_or(ScanwerkError::GeometryUnsupported)?;

    let (width_mm, height_mm) = size.dimensions_mm();
    info!(paper = size.name, width_mm, height_mm, "setting scanning area");

    for (index, mm) in [(br_x, width_mm), (br_y, height_mm)] {
        set_corner(device, registry, index, mm)?;
    }
    Ok(size)
}

fn set_corner(
    device: &mut dyn Device,
    registry: &CapabilityRegistry,
    index: usize,
    mm: f64,
) -> Result<()> {
    let name = registry
        .by_index(index)
        .map(|e| e.descriptor.name.clone())
        .ok_or(ScanwerkError::UnknownCapability(index))?;

    let requested = fix(mm);
    let info = device
        .set_value(index, &OptionValue::Words(vec![requested]))
        .map_err(|status| ScanwerkError::OptionRejected {
            option: name.clone(),
            status,
        })?;

    let effective = match &info.effective {
        OptionValue::Words(words) => words.first().copied(),
        _ => None,
    };
    if let (true, Some(effective)) = (info.inexact, effective) {
        warn!(
            "rounded value of {} from {} to {}",
            name,
            unfix(requested),
            unfix(effective)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_device::VirtualScanner;
    use scanwerk_core::Status;
    use scanwerk_core::{CapabilityDescriptor, DeviceInfo, Parameters, SetInfo};

    fn corner_mm(scanner: &VirtualScanner, registry: &CapabilityRegistry, name: &str) -> f64 {
        let index = registry.by_name(name).unwrap().index;
        match scanner.get_value(index).unwrap() {
            OptionValue::Words(w) => unfix(w[0]),
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn letter_sets_bottom_right_corner() {
        let mut scanner = VirtualScanner::flatbed();
        let registry = CapabilityRegistry::build(&scanner).unwrap();
        apply_paper(&mut scanner, &registry, "letter").unwrap();

        assert!((corner_mm(&scanner, &registry, "br-x") - 215.9).abs() < 1e-3);
        assert!((corner_mm(&scanner, &registry, "br-y") - 279.4).abs() < 1e-3);
        assert_eq!(corner_mm(&scanner, &registry, "tl-x"), 0.0);
    }

    #[test]
    fn unknown_paper_is_fatal() {
        let mut scanner = VirtualScanner::flatbed();
        let registry = CapabilityRegistry::build(&scanner).unwrap();
        assert!(matches!(
            apply_paper(&mut scanner, &registry, "napkin"),
            Err(ScanwerkError::UnknownPaper(_))
        ));
    }

    /// A device without geometry capabilities.
    struct NoGeometry(DeviceInfo);

    impl Device for NoGeometry {
        fn info(&self) -> &DeviceInfo {
            &self.0
        }
        fn descriptors(&self) -> std::result::Result<Vec<CapabilityDescriptor>, Status> {
            Ok(Vec::new())
        }
        fn descriptor(&self, _: usize) -> std::result::Result<CapabilityDescriptor, Status> {
            Err(Status::InvalidArgument)
        }
        fn get_value(&self, _: usize) -> std::result::Result<OptionValue, Status> {
            Err(Status::InvalidArgument)
        }
        fn set_value(
            &mut self,
            _: usize,
            _: &OptionValue,
        ) -> std::result::Result<SetInfo, Status> {
            Err(Status::InvalidArgument)
        }
        fn set_auto(&mut self, _: usize) -> std::result::Result<(), Status> {
            Err(Status::InvalidArgument)
        }
        fn start(&mut self) -> std::result::Result<(), Status> {
            Err(Status::Unsupported)
        }
        fn parameters(&self) -> std::result::Result<Parameters, Status> {
            Err(Status::Unsupported)
        }
        fn read(&mut self, _: &mut [u8]) -> std::result::Result<usize, Status> {
            Err(Status::Unsupported)
        }
        fn cancel(&mut self) {}
    }

    #[test]
    fn missing_corners_are_fatal() {
        let mut device = NoGeometry(DeviceInfo {
            name: "test".into(),
            vendor: String::new(),
            model: String::new(),
            kind: String::new(),
        });
        let registry = CapabilityRegistry::build(&device).unwrap();
        assert!(matches!(
            apply_paper(&mut device, &registry, "a4"),
            Err(ScanwerkError::GeometryUnsupported)
        ));
    }
}
