// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability registry: the table of device capabilities the command line can
// set, built once after the device is opened.

use tracing::{debug, instrument};

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{CapabilityDescriptor, OptionValue, Unit, ValueKind, unfix};

use crate::traits::Device;

/// Offset added to a capability's enumeration index to form its external id,
/// keeping device options clear of the program's own option ids.
pub const OPTION_ID_BASE: usize = 1000;

/// One settable capability.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    /// Enumeration index on the device.
    pub index: usize,
    /// External id, `OPTION_ID_BASE + index`.
    pub id: usize,
    pub descriptor: CapabilityDescriptor,
}

/// Device indices of the four scan-area corners.
///
/// Only fixed-point millimetre capabilities are tracked; devices exposing
/// integer geometry get no corners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CornerSlots {
    pub tl_x: Option<usize>,
    pub tl_y: Option<usize>,
    pub br_x: Option<usize>,
    pub br_y: Option<usize>,
}

impl CornerSlots {
    /// Indices of all four corners, or `None` if any is missing.
    pub fn complete(&self) -> Option<[usize; 4]> {
        Some([self.tl_x?, self.tl_y?, self.br_x?, self.br_y?])
    }

    fn track(&mut self, index: usize, desc: &CapabilityDescriptor) {
        if desc.kind != ValueKind::Fixed
            || desc.unit != Unit::Millimeter
            || !desc.is_single_word()
        {
            return;
        }
        let slot = match desc.name.as_str() {
            "tl-x" => &mut self.tl_x,
            "tl-y" => &mut self.tl_y,
            "br-x" => &mut self.br_x,
            "br-y" => &mut self.br_y,
            _ => return,
        };
        *slot = Some(index);
    }
}

/// Ordered table of settable capabilities.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    entries: Vec<RegistryEntry>,
    resolution: Option<usize>,
    corners: CornerSlots,
}

impl CapabilityRegistry {
    /// Snapshot the device's capabilities.
    #[instrument(skip(device), fields(device = %device.info().name))]
    pub fn build(device: &dyn Device) -> Result<Self> {
        let descriptors = device
            .descriptors()
            .map_err(|status| ScanwerkError::device("enumerate options", status))?;

        let mut entries = Vec::new();
        let mut resolution = None;
        let mut corners = CornerSlots::default();

        for (index, descriptor) in descriptors.into_iter().enumerate() {
            if descriptor.kind == ValueKind::Group || !descriptor.settable {
                continue;
            }

            if resolution.is_none()
                && descriptor.kind.is_numeric()
                && descriptor.unit == Unit::Dpi
                && descriptor.is_single_word()
            {
                resolution = Some(entries.len());
            }
            corners.track(index, &descriptor);

            entries.push(RegistryEntry {
                index,
                id: OPTION_ID_BASE + index,
                descriptor,
            });
        }

        debug!(
            options = entries.len(),
            resolution = resolution.is_some(),
            corners = corners.complete().is_some(),
            "capability registry built"
        );

        Ok(Self {
            entries,
            resolution,
            corners,
        })
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_name(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.descriptor.name == name)
    }

    pub fn by_id(&self, id: usize) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn by_index(&self, index: usize) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.index == index)
    }

    /// The capability used to report the scan resolution.
    pub fn resolution(&self) -> Option<&RegistryEntry> {
        self.resolution.map(|i| &self.entries[i])
    }

    pub fn corners(&self) -> &CornerSlots {
        &self.corners
    }

    /// Re-read descriptors after the device reported that setting one
    /// capability changed others. Entries keep their indices and ids; only
    /// flags and constraints are updated.
    pub fn refresh(&mut self, device: &dyn Device) -> Result<()> {
        for entry in &mut self.entries {
            entry.descriptor = device
                .descriptor(entry.index)
                .map_err(|status| ScanwerkError::device("reload options", status))?;
        }
        Ok(())
    }

    /// Current resolution in dpi, if the device has a resolution capability.
    pub fn current_resolution(&self, device: &dyn Device) -> Result<Option<i32>> {
        let Some(entry) = self.resolution() else {
            return Ok(None);
        };
        let value = device
            .get_value(entry.index)
            .map_err(|status| ScanwerkError::device("read resolution", status))?;
        Ok(match value {
            OptionValue::Words(words) => words.first().map(|&w| match entry.descriptor.kind {
                ValueKind::Fixed => (unfix(w) + 0.5).floor() as i32,
                _ => w,
            }),
            _ => None,
        })
    }

    /// Current value rendered for help output.
    pub fn describe_current(&self, device: &dyn Device, entry: &RegistryEntry) -> String {
        if !entry.descriptor.active {
            return "inactive".to_string();
        }
        match device.get_value(entry.index) {
            Ok(OptionValue::Bool(on)) => (if on { "yes" } else { "no" }).to_string(),
            Ok(OptionValue::Text(text)) => text,
            Ok(OptionValue::Words(words)) => match (entry.descriptor.kind, words.first()) {
                (_, None) => String::new(),
                (ValueKind::Fixed, Some(&w)) => format!("{:.2}", unfix(w)),
                (_, Some(&w)) => w.to_string(),
            },
            Ok(OptionValue::Button) | Err(_) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_device::VirtualScanner;
    use scanwerk_core::{Constraint, WORD_SIZE};

    #[test]
    fn skips_groups_and_read_only_entries() {
        let scanner = VirtualScanner::flatbed();
        let registry = CapabilityRegistry::build(&scanner).unwrap();
        assert!(
            registry
                .iter()
                .all(|e| e.descriptor.settable && e.descriptor.kind != ValueKind::Group)
        );
        assert!(registry.by_name("mode").is_some());
        // inactive but settable entries are still registered
        assert!(registry.by_name("gamma-table").is_some());
    }

    #[test]
    fn ids_are_offset_enumeration_indices() {
        let scanner = VirtualScanner::flatbed();
        let registry = CapabilityRegistry::build(&scanner).unwrap();
        for entry in registry.iter() {
            assert_eq!(entry.id, OPTION_ID_BASE + entry.index);
            assert_eq!(registry.by_id(entry.id), Some(entry));
        }
    }

    #[test]
    fn finds_resolution_and_all_corners() {
        let scanner = VirtualScanner::flatbed();
        let registry = CapabilityRegistry::build(&scanner).unwrap();
        assert_eq!(registry.resolution().unwrap().descriptor.name, "resolution");
        assert_eq!(registry.current_resolution(&scanner).unwrap(), Some(150));

        let [tl_x, _, br_x, br_y] = registry.corners().complete().unwrap();
        assert_eq!(registry.by_index(tl_x).unwrap().descriptor.name, "tl-x");
        assert_eq!(registry.by_index(br_x).unwrap().descriptor.name, "br-x");
        assert_eq!(registry.by_index(br_y).unwrap().descriptor.name, "br-y");
    }

    #[test]
    fn integer_geometry_is_not_tracked() {
        let mut corners = CornerSlots::default();
        let int_corner = CapabilityDescriptor {
            name: "br-x".into(),
            title: String::new(),
            description: String::new(),
            kind: ValueKind::Int,
            unit: Unit::Millimeter,
            constraint: Constraint::None,
            settable: true,
            active: true,
            automatic: false,
            size: WORD_SIZE,
        };
        corners.track(3, &int_corner);
        assert_eq!(corners.br_x, None);

        let fixed_corner = CapabilityDescriptor {
            kind: ValueKind::Fixed,
            ..int_corner
        };
        corners.track(3, &fixed_corner);
        assert_eq!(corners.br_x, Some(3));
        assert_eq!(corners.complete(), None);
    }

    #[test]
    fn describes_current_values() {
        let scanner = VirtualScanner::flatbed();
        let registry = CapabilityRegistry::build(&scanner).unwrap();
        let describe = |name| registry.describe_current(&scanner, registry.by_name(name).unwrap());
        assert_eq!(describe("mode"), "gray");
        assert_eq!(describe("preview"), "no");
        assert_eq!(describe("resolution"), "150");
        assert_eq!(describe("br-x"), "215.90");
        assert_eq!(describe("gamma-table"), "inactive");
    }
}
