// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk device layer.
//
// The device itself sits behind the `Device` trait. On top of it this crate
// builds the capability registry, applies option values and sets the scanning
// area from a paper name. A simulated scanner is included so the tool and its
// tests run without hardware.

pub mod geometry;
pub mod options;
pub mod paper;
pub mod registry;
pub mod traits;
pub mod virtual_device;

pub use geometry::apply_paper;
pub use options::{ApplyOutcome, OptionEngine};
pub use registry::{CapabilityRegistry, CornerSlots, OPTION_ID_BASE, RegistryEntry};
pub use traits::{Device, DeviceBackend};
pub use virtual_device::{VirtualBackend, VirtualScanner};
