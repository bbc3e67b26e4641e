// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// udev device node -> DeviceDescriptor conversion.

use steckwerk_core::{DeviceDescriptor, VendorId};
use tokio_udev::Device;

/// Reads the USB identity attributes off a `usb_device` node.
///
/// Returns `None` when `idVendor` or `idProduct` is missing or not
/// parseable hex; such a node cannot be classified at all. The string
/// descriptors are optional: manufacturer and model fall back to the
/// empty string (`display_name` then shows `vid:pid`), and a missing
/// serial stays `None` until a provisioning step actually needs one.
pub(crate) fn descriptor_from_device(device: &Device) -> Option<DeviceDescriptor> {
    let vendor_id = id_attr(device, "idVendor")?;
    let product_id = id_attr(device, "idProduct")?.0;
    Some(DeviceDescriptor {
        manufacturer: string_attr(device, "manufacturer").unwrap_or_default(),
        model: string_attr(device, "product").unwrap_or_default(),
        vendor_id,
        product_id,
        serial: string_attr(device, "serial"),
    })
}

/// sysfs id attributes carry `VendorId::from_hex`'s bare-hex form.
fn id_attr(device: &Device, name: &str) -> Option<VendorId> {
    VendorId::from_hex(device.attribute_value(name)?.to_str()?).ok()
}

fn string_attr(device: &Device, name: &str) -> Option<String> {
    trimmed(device.attribute_value(name)?.to_str()?)
}

/// sysfs string attributes end in a newline; empty after trimming
/// counts as absent.
fn trimmed(raw: &str) -> Option<String> {
    let value = raw.trim();
    (!value.is_empty()).then(|| value.to_owned())
}
