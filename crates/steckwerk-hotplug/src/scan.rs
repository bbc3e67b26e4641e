// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One-shot enumeration of the USB devices that are already attached.

use std::ffi::OsStr;

use steckwerk_core::{error::Result, DeviceDescriptor, SteckwerkError};
use tokio_udev::Enumerator;
use tracing::debug;

use crate::convert;

/// Snapshot of every USB device currently attached, in udev order.
///
/// Synchronous on purpose: the caller takes this snapshot before
/// draining the live monitor, so a device plugged in while the daemon
/// was down is still seen exactly once.
pub fn connected_devices() -> Result<Vec<DeviceDescriptor>> {
    let mut enumerator = Enumerator::new()
        .map_err(|e| SteckwerkError::Monitor(format!("udev enumerator: {e}")))?;
    enumerator
        .match_subsystem("usb")
        .map_err(|e| SteckwerkError::Monitor(format!("udev subsystem filter: {e}")))?;

    let mut devices = Vec::new();
    for device in enumerator
        .scan_devices()
        .map_err(|e| SteckwerkError::Monitor(format!("udev scan: {e}")))?
    {
        // interface nodes share the usb subsystem but carry no ids
        if device.devtype() != Some(OsStr::new("usb_device")) {
            continue;
        }
        match convert::descriptor_from_device(&device) {
            Some(desc) => devices.push(desc),
            None => debug!(
                sysname = %device.sysname().to_string_lossy(),
                "skipping usb device without parseable id attributes"
            ),
        }
    }
    Ok(devices)
}
