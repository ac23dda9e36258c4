// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device collaborator traits.
//
// A backend lists devices and opens them; an open device exposes its
// capabilities and the transfer of one page at a time. Calls report a bare
// `Status` on failure so callers can classify it.

use scanwerk_core::{CapabilityDescriptor, DeviceInfo, OptionValue, Parameters, SetInfo, Status};

/// A source of scanning devices.
pub trait DeviceBackend {
    type Device: Device;

    /// Devices currently attached.
    fn devices(&self) -> Result<Vec<DeviceInfo>, Status>;

    /// Open a device by its backend name.
    fn open(&self, name: &str) -> Result<Self::Device, Status>;
}

/// An open scanning device.
pub trait Device {
    /// Identity of the device.
    fn info(&self) -> &DeviceInfo;

    /// Every capability in enumeration order, including group markers.
    fn descriptors(&self) -> Result<Vec<CapabilityDescriptor>, Status>;

    /// Current descriptor of one capability.
    fn descriptor(&self, index: usize) -> Result<CapabilityDescriptor, Status>;

    /// Current value of a capability.
    fn get_value(&self, index: usize) -> Result<OptionValue, Status>;

    /// Set a capability. The returned `SetInfo` says whether the device rounded
    /// the value and which value is now in effect.
    fn set_value(&mut self, index: usize, value: &OptionValue) -> Result<SetInfo, Status>;

    /// Let the device choose the value itself.
    fn set_auto(&mut self, index: usize) -> Result<(), Status>;

    /// Begin acquiring the next page.
    fn start(&mut self) -> Result<(), Status>;

    /// Transfer parameters of the page that was started.
    fn parameters(&self) -> Result<Parameters, Status>;

    /// Read up to `buf.len()` bytes of image data.
    ///
    /// `Err(Status::EndOfPage)` marks the clean end of the page.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Status>;

    /// Ask the device to abort the current transfer. The next `read` returns
    /// `Err(Status::Cancelled)`.
    fn cancel(&mut self);
}
